//! Result command implementation.
//!
//! Wait for and display the result of a submitted circuit.

use std::time::Duration;

use anyhow::Result;
use console::style;

use iqmtk_hal::Backend;

use super::common::{Connection, connect, print_results, read_handle, result_json, spinner};

/// Execute the result command.
pub async fn execute(
    handle: &str,
    conn: &Connection,
    timeout: Duration,
    format: &str,
) -> Result<()> {
    let handle = read_handle(handle)?;
    let backend = connect(conn).await?;

    println!(
        "{} Fetching results for job {}",
        style("→").cyan().bold(),
        style(handle.id).dim()
    );

    let spinner = spinner("Waiting for job to complete...")?;
    let result = backend.get_result(&handle, Some(timeout)).await;
    spinner.finish_and_clear();
    let result = result?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result_json(&result))?),
        _ => print_results(&result),
    }

    Ok(())
}
