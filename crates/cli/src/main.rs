mod config;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use events::{Event, EventBus, EventEnvelope};
use launcher::loader::parse_bundle_location;
use launcher::{
    AppLoader, DevMenuRegistry, DevelopmentBuildLoader, Launcher, LoaderConfig,
    ReactNativeLoader, SimulatedHost,
};
use launcher_core::LaunchRequest;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LauncherConfig, Variant, LAUNCHER_DIR};

#[derive(Parser)]
#[command(name = "dev-launcher")]
#[command(about = "Launch a development bundle against a simulated runtime host", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to .dev-launcher/config.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init,
    /// Run one launch and report the outcome
    Launch {
        /// Packager bundle URL
        #[arg(long)]
        url: Option<String>,

        #[arg(long, value_enum)]
        variant: Option<Variant>,

        /// Manifest JSON for the dev-build variant
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Give up after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        #[arg(long)]
        activity: Option<String>,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },
    /// Show the debug server target derived from a bundle URL
    Inspect { url: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let cwd = std::env::current_dir()?;
    let config_path = cli
        .config
        .unwrap_or_else(|| LauncherConfig::path_in(&cwd));

    match cli.command {
        Some(Commands::Init) => init_config(config_path).await,
        Some(Commands::Launch {
            url,
            variant,
            manifest,
            timeout_ms,
            activity,
            json,
        }) => {
            let mut config = LauncherConfig::load(&config_path).await;
            if let Some(url) = url {
                config.launch.bundle_url = url;
            }
            if let Some(variant) = variant {
                config.launch.variant = variant;
            }
            if manifest.is_some() {
                config.launch.manifest = manifest;
            }
            if timeout_ms.is_some() {
                config.launch.timeout_ms = timeout_ms;
            }
            if let Some(activity) = activity {
                config.launch.activity = activity;
            }
            launch(config, json).await
        }
        Some(Commands::Inspect { url }) => inspect(&url),
        None => launch(LauncherConfig::load(&config_path).await, false).await,
    }
}

async fn init_config(path: PathBuf) -> Result<()> {
    if path.exists() {
        println!("Config already exists at {}", path.display());
        return Ok(());
    }

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(&LauncherConfig::default())?;
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("writing {}", path.display()))?;

    println!("Wrote default config to {}", path.display());
    println!();
    println!("Next steps:");
    println!("  dev-launcher launch");
    println!("  dev-launcher launch --variant dev-build --manifest {LAUNCHER_DIR}/manifest.json");

    Ok(())
}

fn inspect(url: &str) -> Result<()> {
    let location = parse_bundle_location(url)?;

    println!("Bundle URL:   {location}");
    println!("Debug host:   {}", location.debug_server_host());
    println!("Bundle name:  {}", location.bundle_name());

    Ok(())
}

async fn launch(config: LauncherConfig, json: bool) -> Result<()> {
    let host = SimulatedHost::new(config.host_options());
    let events = EventBus::new();
    let printer = tokio::spawn(print_events(events.subscribe(), json));

    let loader_config = LoaderConfig::new(Arc::new(host.clone()), Arc::new(host.clone()))
        .with_dev_menu(Arc::new(DevMenuRegistry::new()))
        .with_events(events.clone())
        .with_policy(config.policy());
    let request = LaunchRequest::new(config.launch.activity.clone());

    let outcome = match config.launch.variant {
        Variant::ReactNative => {
            let loader = ReactNativeLoader::new(config.launch.bundle_url.clone());
            run(loader, loader_config, request).await
        }
        Variant::DevBuild => {
            let Some(manifest) = config.launch.manifest.clone() else {
                bail!("the dev-build variant needs a manifest (--manifest or launch.manifest)");
            };
            run(DevelopmentBuildLoader::from_path(manifest), loader_config, request).await
        }
    };

    // The printer exits once every sender is gone.
    drop(events);
    if tokio::time::timeout(Duration::from_secs(1), printer).await.is_err() {
        warn!("Event printer did not drain in time");
    }

    if outcome? {
        info!(starts = host.start_count(), "Launch finished");
        if let Some(target) = host.debug_server() {
            println!("Launched {} from {}", target.bundle_name, target.host);
        }
        Ok(())
    } else {
        bail!("launch did not start: the debug server target was refused")
    }
}

async fn run<L: AppLoader>(
    loader: L,
    config: LoaderConfig,
    request: LaunchRequest,
) -> Result<bool> {
    let launcher = Launcher::new(loader, config);
    let launched = launcher
        .launch(request)
        .await
        .context("launch failed")?;
    Ok(launched)
}

async fn print_events(mut rx: tokio::sync::broadcast::Receiver<EventEnvelope>, json: bool) {
    loop {
        match rx.recv().await {
            Ok(envelope) if json => match serde_json::to_string(&envelope) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "Could not serialize event"),
            },
            Ok(envelope) => println!(
                "{} {}",
                envelope.timestamp.format("%H:%M:%S%.3f"),
                describe(&envelope.event)
            ),
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn describe(event: &Event) -> String {
    match event {
        Event::LaunchStarted { bundle_url, .. } => format!("started      {bundle_url}"),
        Event::DebugHostRewritten {
            debug_host,
            bundle_name,
            success,
            ..
        } => format!("debug host   {debug_host} / {bundle_name} (applied: {success})"),
        Event::StateChanged {
            from_state,
            to_state,
            ..
        } => format!("state        {from_state} -> {to_state}"),
        Event::ContextReady { context_id, .. } => format!("context      {context_id}"),
        Event::LaunchResolved { success, .. } => format!("resolved     {success}"),
        Event::LaunchFailed { message, .. } => format!("failed       {message}"),
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dev_launcher=info,launcher=info".into()),
        )
        .init();
}
