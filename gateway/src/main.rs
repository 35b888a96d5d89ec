mod config;

use build_directory::{Directory, OrchestratorClient, OrchestratorError};
use clap::{Args, Parser};
use config::{Config, ConfigError, LoggingConfig, MetricsConfig};
use download_router::fetcher::FetchError;
use download_router::{GatewayError, HttpArtifactFetcher};
use metrics_exporter_statsd::StatsdBuilder;
use shared::metrics_defs::MetricDef;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const METRICS_PREFIX: &str = "artifact_gateway";

#[derive(Parser)]
#[command(about = "Serves mobile application builds to devices")]
enum CliCommand {
    /// Run the download gateway
    Run(RunArgs),
    /// Print every metric the gateway emits
    ListMetrics,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    config_path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
enum CliError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("could not read service token: {0}")]
    ServiceToken(#[from] build_directory::config::ConfigError),
    #[error("could not set up metrics: {0}")]
    Metrics(String),
    #[error("could not create orchestrator client: {0}")]
    Orchestrator(#[from] OrchestratorError),
    #[error("could not create artifact store client: {0}")]
    ArtifactStore(#[from] FetchError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

fn main() {
    let cli = CliCommand::parse();

    match cli {
        CliCommand::ListMetrics => list_metrics(),
        CliCommand::Run(args) => {
            let config = match Config::from_file(&args.config_path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("{e}");
                    process::exit(1);
                }
            };

            let sentry_guard = init_logging(config.common.logging.as_ref());
            let result = run(config);
            if let Err(e) = &result {
                tracing::error!(error = %e, "gateway stopped");
            }
            // Flush pending events before exiting.
            drop(sentry_guard);
            if result.is_err() {
                process::exit(1);
            }
        }
    }
}

fn run(config: Config) -> Result<(), CliError> {
    init_metrics(config.common.metrics.as_ref())?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<(), CliError> {
    let directory_config = &config.build_directory;
    let credential = directory_config.service_token()?;

    let orchestrator = OrchestratorClient::new(
        &directory_config.url,
        &directory_config.namespace,
        directory_config.label_selector.clone(),
        credential.clone(),
    )?;
    let directory = Directory::new(
        orchestrator,
        Duration::from_secs(directory_config.refresh_interval_secs),
    );
    let fetcher = HttpArtifactFetcher::new(config.download.artifact_store.connect_timeout())?;

    tracing::info!(
        namespace = %directory_config.namespace,
        public_hostname = %config.download.public_hostname,
        "starting gateway"
    );

    let result = tokio::select! {
        result = download_router::run(
            config.download,
            Arc::new(directory.clone()),
            Arc::new(fetcher),
            credential,
        ) => result.map_err(CliError::from),
        signal = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            signal.map_err(CliError::from)
        }
    };

    directory.shutdown().await;
    result
}

fn init_logging(config: Option<&LoggingConfig>) -> Option<sentry::ClientInitGuard> {
    let sentry_guard = config.map(|logging| {
        sentry::init((
            logging.sentry_dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(
            sentry_guard
                .as_ref()
                .map(|_| sentry::integrations::tracing::layer()),
        )
        .init();

    sentry_guard
}

fn init_metrics(config: Option<&MetricsConfig>) -> Result<(), CliError> {
    let Some(config) = config else {
        return Ok(());
    };

    let recorder = StatsdBuilder::from(config.statsd_host.clone(), config.statsd_port)
        .build(Some(METRICS_PREFIX))
        .map_err(|e| CliError::Metrics(e.to_string()))?;
    metrics::set_global_recorder(recorder)
        .map_err(|_| CliError::Metrics("a metrics recorder is already installed".into()))?;

    tracing::info!(
        statsd_host = %config.statsd_host,
        statsd_port = config.statsd_port,
        "metrics enabled"
    );
    Ok(())
}

fn list_metrics() {
    let groups: [&[MetricDef]; 2] = [
        build_directory::metrics_defs::ALL_METRICS,
        download_router::metrics_defs::ALL_METRICS,
    ];
    for metric in groups.into_iter().flatten() {
        println!(
            "{}.{}\t{}\t{}",
            METRICS_PREFIX,
            metric.name,
            metric.metric_type.as_str(),
            metric.description
        );
    }
}
