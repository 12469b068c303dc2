use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use simple_operator::{
    controller::{self, ReconcilerConfig},
    crd::SimpleOperator,
    Error,
};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the operator
    Run(RunArgs),
    /// Show version and build information
    Version,
    /// Show SimpleOperator objects and their states
    Info(InfoArgs),
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// TOML file with reconciler settings; flags below override it
    #[arg(long, env = "SIMPLE_OPERATOR_CONFIG")]
    config: Option<PathBuf>,

    /// Name shared by the managed Deployment, Service and Ingress
    #[arg(long, env = "OBJECT_NAME")]
    object_name: Option<String>,

    /// Finalizer placed on owners and managed resources
    #[arg(long, env = "FINALIZER")]
    finalizer: Option<String>,

    /// Secret holding the Ingress TLS certificate
    #[arg(long, env = "TLS_SECRET_NAME")]
    tls_secret_name: Option<String>,

    /// Container and Service port
    #[arg(long, env = "APP_PORT")]
    port: Option<i32>,

    /// Requeue delay in seconds
    #[arg(long, env = "BACKOFF_SECS")]
    backoff_secs: Option<u64>,

    #[arg(long, env = "INGRESS_CLASS")]
    ingress_class: Option<String>,

    #[arg(long, env = "CLUSTER_ISSUER")]
    cluster_issuer: Option<String>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

impl RunArgs {
    fn reconciler_config(&self) -> Result<ReconcilerConfig, Error> {
        let mut config = match &self.config {
            Some(path) => ReconcilerConfig::from_file(path)?,
            None => ReconcilerConfig::default(),
        };

        if let Some(name) = &self.object_name {
            config.object_name.clone_from(name);
        }
        if let Some(finalizer) = &self.finalizer {
            config.finalizer.clone_from(finalizer);
        }
        if let Some(secret) = &self.tls_secret_name {
            config.tls_secret_name.clone_from(secret);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(secs) = self.backoff_secs {
            config.backoff = std::time::Duration::from_secs(secs);
        }
        if let Some(class) = &self.ingress_class {
            config.ingress_class.clone_from(class);
        }
        if let Some(issuer) = &self.cluster_issuer {
            config.cluster_issuer.clone_from(issuer);
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Parser, Debug)]
struct InfoArgs {
    /// Namespace to list
    #[arg(long, env = "OPERATOR_NAMESPACE", default_value = "default")]
    namespace: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();

    match args.command {
        Commands::Version => {
            println!("Simple Operator v{}", env!("CARGO_PKG_VERSION"));
            println!("Build Date: {}", env!("BUILD_DATE"));
            println!("Git SHA: {}", env!("GIT_SHA"));
            println!("Rust Version: {}", env!("RUST_VERSION"));
            Ok(())
        }
        Commands::Info(info_args) => run_info(info_args).await,
        Commands::Run(run_args) => run_operator(run_args).await,
    }
}

async fn run_info(args: InfoArgs) -> Result<(), Error> {
    let client = kube::Client::try_default()
        .await
        .map_err(Error::KubeError)?;

    let api: kube::Api<SimpleOperator> = kube::Api::namespaced(client, &args.namespace);
    let objects = api
        .list(&Default::default())
        .await
        .map_err(Error::KubeError)?;

    println!("Managed SimpleOperators: {}", objects.items.len());
    for object in &objects.items {
        let status = object.status.clone().unwrap_or_default();
        let state = |s: Option<simple_operator::crd::ResourceState>| {
            s.map_or_else(|| "-".to_string(), |s| s.to_string())
        };
        println!(
            "  {} image={} replicas={}/{} deployment={} service={} ingress={}",
            object.metadata.name.as_deref().unwrap_or_default(),
            object.spec.image,
            status.available_replicas,
            object.spec.replicas,
            state(status.deployment_state),
            state(status.service_state),
            state(status.ingress_state),
        );
    }
    Ok(())
}

fn init_logging(format: LogFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_target(true)).init(),
        LogFormat::Text => registry.with(fmt::layer().with_target(true)).init(),
    }
}

async fn run_operator(args: RunArgs) -> Result<(), Error> {
    init_logging(args.log_format);

    info!(
        "Starting Simple Operator v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = args.reconciler_config()?;
    info!(
        object_name = %config.object_name,
        backoff_secs = config.backoff.as_secs(),
        "Reconciler configured"
    );

    let client = kube::Client::try_default()
        .await
        .map_err(Error::KubeError)?;

    info!("Connected to Kubernetes cluster");

    controller::run_controller(client, config).await
}
