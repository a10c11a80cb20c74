mod config;
mod elastic;
mod error;
mod helpers;
mod responders;
mod routes;
mod state;

#[macro_use]
extern crate tracing;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use aexecutor::ExecutorPool;
use anyhow::Result;
use clap::Parser;
use hyper::Server;
use mimalloc::MiMalloc;
use routerify::RouterService;
use search_pipeline::Backend;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use crate::config::EndpointDeclarations;
use crate::elastic::ElasticBackend;
use crate::state::State;

#[derive(Debug, Parser)]
#[clap(name = "sift", about, version)]
struct Settings {
    /// The log level filter, any logs that are above this level won't
    /// be displayed.
    ///
    /// For more detailed control you can use the `RUST_LOG` env var.
    #[clap(long, default_value = "info", env)]
    log_level: Level,

    /// An optional bool to disable ASNI colours and pretty formatting for logs.
    /// You probably want to disable this if using file-based logging.
    #[clap(long, env)]
    disable_pretty_logs: bool,

    /// The host to bind to (normally: '127.0.0.1' or '0.0.0.0'.)
    #[clap(long, short, default_value = "127.0.0.1", env)]
    host: String,

    /// The port to bind the server to.
    #[clap(long, short, default_value = "8000", env)]
    port: u16,

    /// The number of threads to use for the tokio runtime.
    ///
    /// If this is not set, the number of logical cores on the machine is used.
    #[clap(long, short = 't', env)]
    runtime_threads: Option<usize>,

    /// A optional directory to send persistent logs.
    ///
    /// Logs are split into hourly chunks.
    #[clap(long, env)]
    log_dir: Option<String>,

    /// If enabled each search request wont be logged.
    #[clap(long, env)]
    silent_search: bool,

    /// The base URL of the search engine.
    #[clap(long, default_value = "http://127.0.0.1:9200", env)]
    backend_url: String,

    /// The number of seconds to wait for the search engine before
    /// failing a search.
    #[clap(long, default_value = "30", env)]
    backend_timeout: u64,

    /// The number of searches executed at once.
    ///
    /// If this is not set, the number of logical cores on the machine is used.
    #[clap(long, env)]
    executor_threads: Option<usize>,

    /// The maximum number of searches accepted in one batch request.
    #[clap(long, default_value = "64", env)]
    max_batch_size: usize,

    /// The JSON file declaring the served endpoints and their features.
    #[clap(long, short, default_value = "./endpoints.json", env)]
    endpoints: String,
}

fn main() {
    let settings = match setup() {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error during server config parsing: {:?}", e);
            return;
        },
    };

    let _guard = setup_logger(
        settings.log_level,
        &settings.log_dir,
        !settings.disable_pretty_logs,
    );

    // The blocking engine client must be created and dropped outside of
    // the async runtime, this handle outlives it.
    let backend = match ElasticBackend::connect(
        &settings.backend_url,
        Duration::from_secs(settings.backend_timeout),
    ) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            error!("error during engine client creation: {:?}", e);
            return;
        },
    };

    let state = match create_state(&settings, backend.clone()) {
        Ok(state) => state,
        Err(e) => {
            error!("error during endpoint setup: {:?}", e);
            return;
        },
    };

    let threads = settings.runtime_threads.unwrap_or_else(num_cpus::get);
    info!("starting runtime with {} threads", threads);
    let maybe_runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(threads)
        .enable_all()
        .build();

    let result = match maybe_runtime {
        Ok(runtime) => runtime.block_on(start(settings, state)),
        Err(e) => {
            error!("error during runtime creation: {:?}", e);
            return;
        },
    };

    if let Err(e) = result {
        error!("error during server runtime: {:?}", e);
    }

    drop(backend);
}

fn setup_logger(
    level: Level,
    log_dir: &Option<String>,
    pretty: bool,
) -> Option<WorkerGuard> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", format!("{},hyper=info,reqwest=info", level));
    }

    if let Some(dir) = log_dir {
        let file_appender = tracing_appender::rolling::hourly(dir, "sift_.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        let fmt = tracing_subscriber::fmt()
            .with_target(true)
            .with_writer(std::io::stdout.and(non_blocking))
            .with_thread_names(true)
            .with_thread_ids(true)
            .with_env_filter(EnvFilter::from_default_env());

        if pretty {
            fmt.pretty().with_ansi(true).init();
        } else {
            fmt.json().with_ansi(false).init();
        }

        Some(guard)
    } else {
        let fmt = tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(true)
            .with_env_filter(EnvFilter::from_default_env());

        if pretty {
            fmt.pretty().with_ansi(true).init();
        } else {
            fmt.compact().with_ansi(false).init();
        }

        None
    }
}

/// Parses the config and sets up logging
fn setup() -> Result<Settings> {
    let config: Settings = Settings::parse();
    Ok(config)
}

#[instrument(
    name = "setup-endpoints",
    level = "info",
    skip_all,
    fields(path = %settings.endpoints)
)]
fn create_state(settings: &Settings, backend: Arc<ElasticBackend>) -> Result<State> {
    info!("loading endpoint declarations...");
    let declarations = EndpointDeclarations::load(&settings.endpoints)?;

    let backend: Arc<dyn Backend> = backend;
    let endpoints = declarations.build(backend, settings.max_batch_size)?;
    info!(" {} endpoints declared", endpoints.len());

    let concurrency = settings.executor_threads.unwrap_or_else(num_cpus::get);
    let executor = ExecutorPool::create(concurrency)?;

    Ok(State::new(
        endpoints,
        executor,
        !settings.silent_search,
        settings.max_batch_size,
    ))
}

async fn start(settings: Settings, state: State) -> Result<()> {
    let router = routes::get_router(state)?;
    let service = RouterService::new(router).map_err(|e| anyhow::anyhow!(e))?;

    let address: SocketAddr = format!("{}:{}", &settings.host, settings.port).parse()?;
    let server = Server::bind(&address)
        .serve(service)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        });

    info!("Sift has started!");
    info!(
        "serving requests @ http://{}:{}",
        &settings.host, settings.port
    );
    info!(
        "list the declared endpoints @ http://{}:{}/endpoints",
        &settings.host, settings.port
    );

    if let Err(e) = server.await {
        error!("server error: {:?}", e)
    };

    info!("shutting down...");

    Ok(())
}
