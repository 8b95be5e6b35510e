//! logcascade
//!
//! Classifies application log messages with a regex → embedding → LLM
//! cascade, either locally or behind an HTTP upload endpoint.

use anyhow::Result;
use clap::Parser;
use logcascade_classifiers::{build_cascade_from_config, load_config_or_default};
use logcascade_server::cli::{Cli, Commands};
use logcascade_server::{classify_table, client, run_server, AppState, LogTable, ServerSettings};
use metrics_exporter_prometheus::PrometheusHandle;
use std::io::Write;
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            cascade,
            listen,
            port,
            verbose,
        } => {
            init_tracing(verbose);
            info!("Starting logcascade server");

            let mut settings = ServerSettings::load(config.as_deref())?;
            if let Some(listen) = listen {
                settings.listen = listen;
            }
            if let Some(port) = port {
                settings.port = port;
            }
            if let Some(cascade) = cascade {
                settings.cascade_config = cascade;
            }

            let cascade_config = load_config_or_default(&settings.cascade_config)?;
            let cascade = build_cascade_from_config(&cascade_config);

            let metrics_handle = if settings.metrics {
                Some(init_metrics()?)
            } else {
                None
            };

            run_server(AppState::new(cascade, settings, metrics_handle)).await?;
        }

        Commands::Classify {
            input,
            output,
            config,
            explain,
            verbose,
        } => {
            init_tracing(verbose);

            let cascade = build_cascade_from_config(&load_config_or_default(&config)?);
            let mut table = LogTable::from_path(&input)?;
            info!("Classifying {} rows from {}", table.len(), input.display());

            classify_table(&cascade, &mut table, explain).await?;
            write_output(output.as_deref(), &table.to_csv_bytes()?)?;
        }

        Commands::Submit {
            input,
            output,
            url,
            verbose,
        } => {
            init_tracing(verbose);

            let body = client::submit_file(&url, &input).await?;
            write_output(output.as_deref(), &body)?;
        }
    }

    Ok(())
}

/// Write a result table to a file, or to stdout when no path is given
fn write_output(path: Option<&Path>, body: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, body)?;
            info!("Wrote {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(body)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("logcascade=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("logcascade=info"))
    };

    // Logs go to stderr so CSV output on stdout stays clean
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Initialize metrics exporter and return handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!(
        "logcascade_records_total",
        "Total number of log records classified"
    );
    metrics::describe_counter!(
        "logcascade_uploads_total",
        "Total number of CSV uploads received"
    );
    metrics::describe_counter!(
        "logcascade_decisions_total",
        "Final decisions by the strategy that produced them"
    );
    metrics::describe_counter!(
        "logcascade_strategy_errors_total",
        "Strategy invocation failures by strategy"
    );
    metrics::describe_histogram!(
        "logcascade_strategy_latency_us",
        metrics::Unit::Microseconds,
        "Strategy invocation latency in microseconds by strategy"
    );

    info!("Metrics exporter initialized");
    Ok(handle)
}
