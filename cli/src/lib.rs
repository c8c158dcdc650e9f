mod cli;

pub use cli::Cli;

use anyhow::Context;
use imgsafe_core::CycleError;
use imgsafe_core::config::Config;
use imgsafe_core::scheduler::Engine;
use imgsafe_core::scheduler::EngineSettings;
use imgsafe_core::scheduler::Scheduler;
use imgsafe_core::services::SystemClock;
use imgsafe_core::services::probe_instance;
use imgsafe_core::state::StateStore;
use imgsafe_core::webhook::WebhookNotifier;
use imgsafe_http_client::ReqwestTransport;
use imgsafe_http_client::build_reqwest_client;
use imgsafe_misskey::Instance;
use imgsafe_misskey::MisskeyClient;
use imgsafe_utils_home_dir::config_file_path;
use imgsafe_utils_home_dir::ensure_imgsafe_home;
use imgsafe_utils_home_dir::find_imgsafe_home;
use imgsafe_utils_home_dir::state_file_path;
use imgsafe_vision::VisionClient;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const USER_AGENT: &str = concat!("imgsafe/", env!("CARGO_PKG_VERSION"));

pub async fn run_main(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        debug,
        once,
        config: config_path,
        state: state_path,
    } = cli;

    let config_path = match config_path {
        Some(path) => path,
        None => config_file_path(&imgsafe_home()?),
    };
    let state_path = match state_path {
        Some(path) => path,
        None => state_file_path(&imgsafe_home()?),
    };
    let config = Config::load(&config_path)?;

    let debug = debug || config.debug;
    init_tracing(debug);
    if debug {
        log_system_info();
        debug!(?config, "loaded configuration");
    }

    let client = build_reqwest_client(USER_AGENT).context("failed to build http client")?;
    let transport = ReqwestTransport::new(client);
    let hosting = MisskeyClient::new(
        transport.clone(),
        Instance::new(&config.instance_hostname, config.instance_key.clone()),
    );
    probe_instance(&hosting).await.with_context(|| {
        format!(
            "could not reach the instance at {}",
            hosting.instance().base_url
        )
    })?;

    let classifier = VisionClient::new(transport.clone(), config.google_api_key.clone());
    let notifier = config
        .webhook
        .as_ref()
        .map(|webhook| WebhookNotifier::new(transport, webhook.url.clone(), webhook.template.clone()));
    let engine = Engine::new(
        hosting,
        classifier,
        notifier,
        SystemClock,
        EngineSettings::from(&config),
    );
    let scheduler = Scheduler::new(engine, StateStore::new(state_path));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown requested");
            }
            cancel.cancel();
        }
    });

    if once {
        return match scheduler.run_once(&cancel).await {
            Ok(outcome) => {
                if let Some(resume_at) = outcome.quota_resume_at {
                    warn!(%resume_at, "monthly quota exhausted");
                }
                Ok(())
            }
            Err(CycleError::Cancelled) => Ok(()),
            Err(err) => Err(err.into()),
        };
    }

    info!(
        period_secs = config.poll_period.as_secs(),
        limit_per_month = config.limit_per_month,
        "polling for new uploads"
    );
    scheduler.run(cancel).await;
    Ok(())
}

fn imgsafe_home() -> anyhow::Result<PathBuf> {
    let home = find_imgsafe_home().context("failed to locate the imgsafe home directory")?;
    ensure_imgsafe_home(&home)
        .with_context(|| format!("failed to create {}", home.display()))?;
    Ok(home)
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
}

fn log_system_info() {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
        cpus = std::thread::available_parallelism().map_or(0, usize::from),
        "system info"
    );
}
