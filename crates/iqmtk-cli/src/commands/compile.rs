//! Compile command implementation.

use std::path::Path;

use anyhow::Result;
use console::style;

use iqmtk_compile::{PassManagerBuilder, first_failure, iqm_required_predicates};
use iqmtk_hal::Backend;

use super::common::{Connection, connect, load_circuit, parse_arch, save_circuit};

/// Execute the compile command.
///
/// Compiles for the connected device, or offline for `arch` when given.
pub async fn execute(
    input: &str,
    output: Option<&str>,
    conn: &Connection,
    arch: Option<&str>,
    optimisation_level: u8,
) -> Result<()> {
    println!(
        "{} Compiling {} (level {})",
        style("→").cyan().bold(),
        style(input).green(),
        optimisation_level
    );

    let mut circuit = load_circuit(input)?;
    println!(
        "  Loaded: {} qubits, depth {}",
        circuit.num_qubits(),
        circuit.depth()
    );

    let (pm, architecture) = match arch {
        Some(spec) => {
            let architecture = parse_arch(spec)?;
            let pm = PassManagerBuilder::new()
                .with_optimisation_level(optimisation_level)
                .with_architecture(architecture.clone())
                .build()?;
            (pm, architecture)
        }
        None => {
            let backend = connect(conn).await?;
            let pm = backend.default_compilation_pass(optimisation_level)?;
            (pm, backend.architecture().clone())
        }
    };
    println!("  Running {} compilation passes", pm.len());

    pm.apply(&mut circuit)?;

    if let Some(failed) = first_failure(&iqm_required_predicates(&architecture), &circuit) {
        anyhow::bail!("Compiled circuit does not satisfy {failed}");
    }

    println!("{} Compilation complete", style("✓").green().bold());
    println!(
        "  Result: depth {}, {} ops",
        circuit.depth(),
        circuit.dag().num_ops()
    );

    let output_path = match output {
        Some(path) => path.to_string(),
        None => {
            let stem = Path::new(input)
                .file_stem()
                .unwrap_or_default()
                .to_string_lossy();
            format!("{stem}_compiled.json")
        }
    };
    save_circuit(&circuit, &output_path)?;
    println!("  Output: {}", style(&output_path).green());

    Ok(())
}
