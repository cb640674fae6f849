//! formflow CLI — run data-driven form flows in the terminal.
//!
//! Loads a flow definition (JSON or YAML) and drives the formflow-core
//! engine against an HTTP step processor, prompting for each step.

use clap::{Parser, Subcommand};

use formflow_cli::commands;
use formflow_core::config::{ENV_API_KEY, ENV_PROCESSOR_TIMEOUT, ENV_PROCESSOR_URL};
use formflow_core::ProcessorConfig;

/// formflow CLI — data-driven multi-step forms
#[derive(Parser)]
#[command(name = "formflow", version, about = "formflow CLI — data-driven multi-step forms")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a flow interactively against a step processor
    Run {
        /// Flow definition file (.json, .yaml or .yml)
        flow: String,
        /// Step processor endpoint
        #[arg(long, env = ENV_PROCESSOR_URL)]
        endpoint: Option<String>,
        /// Processor request timeout in seconds
        #[arg(long, env = ENV_PROCESSOR_TIMEOUT)]
        timeout: Option<u64>,
        /// Bearer token sent to the processor
        #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
        api_key: Option<String>,
        /// Button identifier the flow is attached to
        #[arg(long, default_value = "cli")]
        button_id: String,
        /// User identifier sent with every request
        #[arg(long, env = "USER", default_value = "cli-user")]
        user_id: String,
        /// Answer every step from a JSON file of field values instead of prompting
        #[arg(long)]
        values: Option<String>,
        /// Accept confirmation prompts automatically (with --values)
        #[arg(long)]
        yes: bool,
    },

    /// Check a flow definition without running it
    Validate {
        /// Flow definition file (.json, .yaml or .yml)
        flow: String,
    },

    /// Show the step layout and field widgets of a flow
    Inspect {
        /// Flow definition file (.json, .yaml or .yml)
        flow: String,
        /// Print the first step's render view as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    // .env.local wins over .env; neither overrides the real environment
    for filename in [".env.local", ".env"] {
        let _ = dotenvy::from_filename(filename);
    }

    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formflow_core=warn,formflow_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run {
            flow,
            endpoint,
            timeout,
            api_key,
            button_id,
            user_id,
            values,
            yes,
        } => {
            let mut config = ProcessorConfig::from_env();
            if let Some(endpoint) = endpoint {
                config.endpoint = endpoint;
            }
            if let Some(timeout) = timeout {
                config.timeout_secs = timeout;
            }
            config.api_key = api_key.filter(|k| !k.trim().is_empty());

            let options = commands::run::RunOptions {
                button_id,
                user_id,
                values_file: values,
                auto_confirm: yes,
            };
            commands::run::run(&flow, config, options).await
        }

        Commands::Validate { flow } => commands::validate::run(&flow),

        Commands::Inspect { flow, json } => commands::inspect::run(&flow, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
