//! Status command implementation.

use anyhow::Result;
use console::style;

use iqmtk_hal::{Backend, CircuitStatus};

use super::common::{Connection, connect, read_handle};

/// Execute the status command.
pub async fn execute(handle: &str, conn: &Connection) -> Result<()> {
    let handle = read_handle(handle)?;
    let backend = connect(conn).await?;

    let status = backend.circuit_status(&handle).await?;
    let styled = match &status {
        CircuitStatus::Completed => style(status.to_string()).green(),
        CircuitStatus::Error(_) | CircuitStatus::Cancelled => style(status.to_string()).red(),
        CircuitStatus::Submitted | CircuitStatus::Queued => style(status.to_string()).yellow(),
        CircuitStatus::Running => style(status.to_string()).cyan(),
    };
    println!("  {}  {}", style(handle.id).dim(), styled);

    Ok(())
}
