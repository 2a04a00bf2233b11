//! iqmtk Command-Line Interface
//!
//! Compile circuits for IQM quantum computers, run them and collect their
//! results.
//!
//! ```text
//! iqmtk config set --api-token <TOKEN>
//! iqmtk info --device garnet
//! iqmtk compile -i bell.json --arch star:5
//! iqmtk run -i bell.json --device garnet --shots 1000
//! iqmtk run -i bell.json --device garnet --no-wait --save-handle job.json
//! iqmtk result job.json --device garnet
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::common::Connection;
use commands::run::RunOptions;
use commands::{compile, config, info, result, run, status, version};

/// iqmtk - compile and run quantum circuits on IQM devices
#[derive(Parser)]
#[command(name = "iqmtk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the stored IQM configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Describe a device
    Info {
        #[command(flatten)]
        conn: Connection,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Compile a circuit for a device
    Compile {
        /// Input circuit (JSON)
        #[arg(short, long)]
        input: String,

        /// Output file
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        conn: Connection,

        /// Compile offline for an architecture (star:N, linear:N, full:N)
        #[arg(long)]
        arch: Option<String>,

        /// Optimisation level (0-2)
        #[arg(long, default_value = "2", value_parser = clap::value_parser!(u8).range(0..=2))]
        optimisation_level: u8,
    },

    /// Run a circuit on a device
    Run {
        /// Input circuit (JSON)
        #[arg(short, long)]
        input: String,

        #[command(flatten)]
        conn: Connection,

        /// Number of shots
        #[arg(short, long, default_value = "1024")]
        shots: u32,

        /// Optimisation level (0-2)
        #[arg(long, default_value = "2", value_parser = clap::value_parser!(u8).range(0..=2))]
        optimisation_level: u8,

        /// Submit the circuit as is
        #[arg(long)]
        no_compile: bool,

        /// Strip final gates into classical post-processing
        #[arg(long)]
        postprocess: bool,

        /// Print the result handle and exit without waiting
        #[arg(long)]
        no_wait: bool,

        /// Write the result handle to a file
        #[arg(long)]
        save_handle: Option<String>,

        /// Timeout in seconds
        #[arg(short, long, default_value = "900")]
        timeout: u64,
    },

    /// Query the status of a submitted circuit
    Status {
        /// Result handle, or a file containing one
        handle: String,

        #[command(flatten)]
        conn: Connection,
    },

    /// Wait for and print the result of a submitted circuit
    Result {
        /// Result handle, or a file containing one
        handle: String,

        #[command(flatten)]
        conn: Connection,

        /// Timeout in seconds
        #[arg(short, long, default_value = "900")]
        timeout: u64,

        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Store an API token
    Set {
        /// API token; without it the file is rewritten unchanged
        #[arg(long)]
        api_token: Option<String>,
    },

    /// Show the stored configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();

    // Execute command
    let result = match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Set { api_token } => config::execute_set(api_token.as_deref()),
            ConfigAction::Show => config::execute_show(),
        },

        Commands::Info { conn, format } => info::execute(&conn, &format).await,

        Commands::Compile {
            input,
            output,
            conn,
            arch,
            optimisation_level,
        } => {
            compile::execute(
                &input,
                output.as_deref(),
                &conn,
                arch.as_deref(),
                optimisation_level,
            )
            .await
        }

        Commands::Run {
            input,
            conn,
            shots,
            optimisation_level,
            no_compile,
            postprocess,
            no_wait,
            save_handle,
            timeout,
        } => {
            let options = RunOptions {
                shots,
                optimisation_level,
                compile: !no_compile,
                postprocess,
                wait: !no_wait,
                save_handle,
                timeout: Duration::from_secs(timeout),
            };
            run::execute(&input, &conn, &options).await
        }

        Commands::Status { handle, conn } => status::execute(&handle, &conn).await,

        Commands::Result {
            handle,
            conn,
            timeout,
            format,
        } => result::execute(&handle, &conn, Duration::from_secs(timeout), &format).await,

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["iqmtk", "run", "-i", "bell.json", "-d", "garnet"]).unwrap();
        let Commands::Run {
            input,
            conn,
            shots,
            optimisation_level,
            no_compile,
            postprocess,
            no_wait,
            timeout,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(input, "bell.json");
        assert_eq!(conn.device.as_deref(), Some("garnet"));
        assert_eq!(shots, 1024);
        assert_eq!(optimisation_level, 2);
        assert!(!no_compile && !postprocess && !no_wait);
        assert_eq!(timeout, 900);
    }

    #[test]
    fn test_parse_compile_offline() {
        let cli = Cli::try_parse_from([
            "iqmtk",
            "compile",
            "-i",
            "c.json",
            "--arch",
            "star:5",
            "--optimisation-level",
            "0",
        ])
        .unwrap();
        let Commands::Compile {
            arch,
            optimisation_level,
            ..
        } = cli.command
        else {
            panic!("expected compile");
        };
        assert_eq!(arch.as_deref(), Some("star:5"));
        assert_eq!(optimisation_level, 0);
    }

    #[test]
    fn test_optimisation_level_out_of_range() {
        let result =
            Cli::try_parse_from(["iqmtk", "compile", "-i", "c.json", "--optimisation-level", "3"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_result() {
        let cli = Cli::try_parse_from([
            "iqmtk", "result", "job.json", "-d", "garnet", "--format", "json", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Commands::Result {
            handle,
            timeout,
            format,
            ..
        } = cli.command
        else {
            panic!("expected result");
        };
        assert_eq!(handle, "job.json");
        assert_eq!(timeout, 900);
        assert_eq!(format, "json");
    }

    #[test]
    fn test_parse_config_set() {
        let cli = Cli::try_parse_from(["iqmtk", "config", "set", "--api-token", "tok"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Set { api_token: Some(t) }
            } if t == "tok"
        ));
    }

    #[test]
    fn test_missing_input() {
        assert!(Cli::try_parse_from(["iqmtk", "run", "-d", "garnet"]).is_err());
    }
}
