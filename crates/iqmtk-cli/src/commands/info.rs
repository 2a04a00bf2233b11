//! Info command implementation.

use anyhow::Result;
use console::style;

use iqmtk_hal::Backend;

use super::common::{Connection, connect};

/// Execute the info command.
pub async fn execute(conn: &Connection, format: &str) -> Result<()> {
    let backend = connect(conn).await?;
    let info = backend.backend_info();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(info)?);
        return Ok(());
    }

    println!(
        "{} {} ({} v{})",
        style("→").cyan().bold(),
        style(&info.device_name).yellow().bold(),
        info.name,
        info.version
    );
    println!("  Qubits:     {}", info.num_qubits);
    println!(
        "  Gate set:   {}",
        info.gate_set.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    let couplings: Vec<String> = info
        .architecture
        .edges()
        .iter()
        .map(|(a, b)| format!("QB{}-QB{}", a + 1, b + 1))
        .collect();
    println!("  Couplings:  {}", couplings.join(" "));
    println!(
        "  Contextual optimisation: {}",
        yes_no(info.supports_contextual_optimisation)
    );
    println!("  Persistent handles:      {}", yes_no(info.persistent_handles));

    Ok(())
}

fn yes_no(flag: bool) -> console::StyledObject<&'static str> {
    if flag {
        style("yes").green()
    } else {
        style("no").red()
    }
}
