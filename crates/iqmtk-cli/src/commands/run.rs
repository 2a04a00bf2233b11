//! Run command implementation.

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use console::style;

use iqmtk_hal::{Backend, ProcessOptions};

use super::common::{Connection, connect, load_circuit, print_results, spinner};

/// Options of the run command.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub shots: u32,
    pub optimisation_level: u8,
    pub compile: bool,
    pub postprocess: bool,
    pub wait: bool,
    pub save_handle: Option<String>,
    pub timeout: Duration,
}

/// Execute the run command.
pub async fn execute(input: &str, conn: &Connection, options: &RunOptions) -> Result<()> {
    println!(
        "{} Running {} ({} shots)",
        style("→").cyan().bold(),
        style(input).green(),
        options.shots
    );

    let mut circuit = load_circuit(input)?;
    let backend = connect(conn).await?;

    if options.compile {
        circuit = backend.get_compiled_circuit(&circuit, options.optimisation_level)?;
        println!(
            "  Compiled: depth {}, {} ops",
            circuit.depth(),
            circuit.dag().num_ops()
        );
    }

    let process = ProcessOptions::new().with_postprocess(options.postprocess);
    let handle = backend
        .process_circuit(&circuit, options.shots, process)
        .await?;
    println!("  Job: {}", style(handle.id).dim());

    if let Some(path) = &options.save_handle {
        fs::write(path, format!("{handle}\n"))
            .with_context(|| format!("Failed to write handle to {path}"))?;
        println!("  Handle saved to {}", style(path).green());
    }

    if !options.wait {
        println!("{handle}");
        return Ok(());
    }

    let spinner = spinner(format!("Waiting for job {}...", handle.id))?;
    let result = backend.get_result(&handle, Some(options.timeout)).await;
    spinner.finish_and_clear();

    print_results(&result?);
    Ok(())
}
