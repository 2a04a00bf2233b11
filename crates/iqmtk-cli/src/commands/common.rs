//! Shared helpers for CLI commands.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use iqmtk_adapter_iqm::{IqmBackend, IqmBackendOptions};
use iqmtk_compile::Architecture;
use iqmtk_hal::{BackendResult, ResultHandle, bitstring};
use iqmtk_ir::Circuit;

/// Options selecting and authenticating against an IQM device.
#[derive(Debug, Clone, Default, Args)]
pub struct Connection {
    /// Device name, e.g. garnet
    #[arg(short, long, env = "IQM_DEVICE")]
    pub device: Option<String>,

    /// Device URL, overriding the Resonance URL for the device
    #[arg(long, env = "IQM_SERVER_URL")]
    pub url: Option<String>,

    /// API token, overriding the stored one
    #[arg(long, env = "IQM_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,
}

/// Connect to the device named by `conn`.
pub async fn connect(conn: &Connection) -> Result<IqmBackend> {
    let device = conn
        .device
        .as_deref()
        .context("No device given; pass --device or set IQM_DEVICE")?;

    let mut options = IqmBackendOptions::new();
    if let Some(token) = &conn.api_token {
        options = options.with_api_token(token);
    }
    if let Some(url) = &conn.url {
        options = options.with_url(url);
    }

    println!(
        "  Connecting to IQM device {}...",
        style(device).yellow()
    );
    IqmBackend::new(device, options)
        .await
        .with_context(|| format!("Failed to connect to IQM device '{device}'"))
}

/// Load a circuit from a JSON file.
pub fn load_circuit(path: &str) -> Result<Circuit> {
    if !Path::new(path).exists() {
        anyhow::bail!("File not found: {path}");
    }
    let source =
        fs::read_to_string(path).with_context(|| format!("Failed to read file: {path}"))?;
    let circuit = Circuit::from_json(&source)
        .map_err(|e| anyhow::anyhow!("Parse error in {path}: {e}"))?;
    debug!(
        "Loaded circuit '{}' from {}: {} ops",
        circuit.name(),
        path,
        circuit.dag().num_ops()
    );
    Ok(circuit)
}

/// Save a circuit as JSON.
pub fn save_circuit(circuit: &Circuit, path: &str) -> Result<()> {
    let json = circuit
        .to_json()
        .map_err(|e| anyhow::anyhow!("Emit error: {e}"))?;
    fs::write(path, json).with_context(|| format!("Failed to write file: {path}"))
}

/// Parse an offline architecture: `star:N`, `linear:N` or `full:N`.
pub fn parse_arch(spec: &str) -> Result<Architecture> {
    let (kind, size) = spec
        .split_once(':')
        .with_context(|| format!("Invalid architecture '{spec}'; expected KIND:N"))?;
    let n: u32 = size
        .parse()
        .with_context(|| format!("Invalid qubit count '{size}'"))?;
    if n == 0 {
        anyhow::bail!("Architecture needs at least one qubit");
    }
    match kind.to_lowercase().as_str() {
        "star" => Ok(Architecture::star(n)),
        "linear" | "line" => Ok(Architecture::linear(n)),
        "full" => Ok(Architecture::full(n)),
        other => anyhow::bail!("Unknown architecture kind: '{other}'. Available: star, linear, full"),
    }
}

/// Read a result handle given inline or as the path of a file holding one.
pub fn read_handle(arg: &str) -> Result<ResultHandle> {
    let text = if Path::new(arg).is_file() {
        fs::read_to_string(arg).with_context(|| format!("Failed to read handle file: {arg}"))?
    } else {
        arg.to_string()
    };
    text.trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid result handle: {e}"))
}

/// Spinner shown while waiting on the device.
pub fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg}")?);
    spinner.set_message(message.into());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(spinner)
}

/// Print a result as a count table.
pub fn print_results(result: &BackendResult) {
    let counts = result.get_counts();
    let bits: Vec<String> = result
        .bits()
        .iter()
        .map(|b| b.to_string())
        .collect();

    println!(
        "\n{} Results ({} shots, bits {}):",
        style("✓").green().bold(),
        result.n_shots(),
        bits.join(" ")
    );

    let mut sorted: Vec<(&[u8], u64)> = counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    let total = counts.total_shots().max(1) as f64;

    for (outcome, count) in sorted.iter().take(16) {
        let prob = *count as f64 / total * 100.0;
        let bar = "█".repeat((prob / 2.0).round() as usize);
        println!(
            "  {}: {:>6} ({:>5.2}%) {}",
            style(bitstring(outcome)).cyan(),
            count,
            prob,
            style(bar).green()
        );
    }

    if sorted.len() > 16 {
        println!("  ... and {} more outcomes", sorted.len() - 16);
    }
}

/// A result as JSON: bits, per-shot outcomes and counts.
pub fn result_json(result: &BackendResult) -> serde_json::Value {
    let counts: serde_json::Map<String, serde_json::Value> = result
        .get_counts()
        .iter()
        .map(|(outcome, n)| (bitstring(outcome), n.into()))
        .collect();
    serde_json::json!({
        "bits": result.bits().iter().map(ToString::to_string).collect::<Vec<_>>(),
        "shots": result.get_shots(),
        "counts": counts,
    })
}
