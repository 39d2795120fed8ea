//! Podsmith CLI - render the Redpanda StatefulSet from layered values

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod commands;
mod error;
mod exit_codes;
mod logging;

use commands::template::{ExistingSource, TemplateOptions};

#[derive(Parser)]
#[command(name = "podsmith")]
#[command(author = "Podsmith Contributors")]
#[command(version)]
#[command(about = "Render the Redpanda StatefulSet from layered values", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the StatefulSet to stdout
    Template {
        /// Release name
        release: String,

        /// Values file(s) to merge, in order
        #[arg(short = 'f', long = "values")]
        values: Vec<PathBuf>,

        /// Set values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,

        /// Target namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,

        /// Render as an upgrade of a deployed release
        #[arg(long)]
        upgrade: bool,

        /// Release revision (upgrade only)
        #[arg(long, requires = "upgrade")]
        revision: Option<u32>,

        /// Read the deployed StatefulSet from a manifest file
        #[arg(long, requires = "upgrade", conflicts_with = "cluster")]
        existing: Option<PathBuf>,

        /// Read the deployed StatefulSet from the current kube context
        #[arg(long, requires = "upgrade")]
        cluster: bool,

        /// Chart name, the default instance name
        #[arg(long, default_value = "redpanda")]
        chart_name: String,

        /// Chart version
        #[arg(long, default_value = "5.9.0")]
        chart_version: String,

        /// App version, the default image tag
        #[arg(long, default_value = "v24.2.4")]
        app_version: String,

        /// Show merged values before the StatefulSet
        #[arg(long)]
        show_values: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    logging::init(cli.debug);

    let result = match cli.command {
        Commands::Template {
            release,
            values,
            set,
            namespace,
            upgrade,
            revision,
            existing,
            cluster,
            chart_name,
            chart_version,
            app_version,
            show_values,
        } => {
            let existing = match (existing, cluster) {
                (Some(path), _) => ExistingSource::Manifest(path),
                (None, true) => ExistingSource::Cluster,
                (None, false) => ExistingSource::None,
            };
            commands::template::run(TemplateOptions {
                release,
                namespace,
                values_files: values,
                set_values: set,
                upgrade,
                revision,
                existing,
                chart_name,
                chart_version,
                app_version,
                show_values,
            })
            .await
        }
    };

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
