//! CLI command handlers.
//!
//! Every command runs the loops against a fresh in-memory store and shuts the
//! manager down before returning, whether or not the command succeeded.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use flightdeck_reconciler::{ChainState, Manager, ManagerConfig, wait_for, wait_until_converged};
use flightdeck_store::{
    Airplane, InMemoryStore, Manifest, Object, ObjectKey, Pedals, Position, Pressed, Resource,
    ResourceKind, Section, Store, StoreExt, TracingStore, apply_manifest,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::Commands;

/// Execute a CLI command.
pub async fn execute_command(command: Commands) -> Result<()> {
    match command {
        Commands::Fly {
            tail_number,
            namespace,
            name,
            presses,
            config,
            timeout_secs,
        } => {
            let options = FlyOptions {
                name: name.unwrap_or_else(|| tail_number.to_lowercase()),
                tail_number,
                namespace,
                presses,
                timeout: Duration::from_secs(timeout_secs),
            };
            cmd_fly(options, config.as_deref()).await
        }

        Commands::Run {
            manifest,
            config,
            timeout_secs,
            follow,
        } => cmd_run(manifest, config.as_deref(), timeout_secs, follow).await,

        Commands::CheckConfig { config } => cmd_check_config(&config),
    }
}

/// Load the manager configuration, or use defaults when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<ManagerConfig> {
    let Some(path) = path else {
        return Ok(ManagerConfig::default());
    };
    ManagerConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

/// A fresh in-memory store that traces every call.
fn open_store(config: &ManagerConfig) -> Arc<dyn Store> {
    Arc::new(TracingStore::new(InMemoryStore::with_watch_capacity(
        config.watch_buffer,
    )))
}

/// One settled state of the control chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub press: Pressed,
    pub linkage_position: Position,
    pub rudder_target: Position,
    pub rudder_position: Position,
}

impl StepReport {
    fn from_chain(chain: &ChainState) -> Option<Self> {
        let pedals = chain.pedals.as_ref()?;
        let rudder = chain.rudder.as_ref()?;
        Some(Self {
            press: pedals.spec.pressed,
            linkage_position: pedals.status.linkage_position,
            rudder_target: rudder.spec.position,
            rudder_position: rudder.status.position,
        })
    }
}

/// What to fly.
#[derive(Debug, Clone)]
pub struct FlyOptions {
    pub namespace: String,
    pub name: String,
    pub tail_number: String,
    pub presses: Vec<Pressed>,
    /// Time allowed for each step to settle.
    pub timeout: Duration,
}

/// Create the airplane, wait for its chain, then apply each press in turn.
///
/// Returns one report for the initial settled state and one per press.
pub async fn fly(config: ManagerConfig, options: &FlyOptions) -> Result<Vec<StepReport>> {
    let store = open_store(&config);
    let handle = Manager::with_default_controllers(store.clone(), config)
        .start()
        .await
        .context("Failed to start controllers")?;

    let result = fly_steps(store.as_ref(), options).await;
    handle.shutdown().await.context("Failed to stop controllers")?;
    result
}

async fn fly_steps(store: &dyn Store, options: &FlyOptions) -> Result<Vec<StepReport>> {
    let airplane = store
        .create_object(Airplane::new(
            &options.namespace,
            &options.name,
            &options.tail_number,
        ))
        .await
        .with_context(|| format!("Failed to create airplane {}", options.name))?;
    let key = airplane.key();
    info!(%key, tail_number = %options.tail_number, "Airplane created");

    let mut reports = Vec::with_capacity(options.presses.len().saturating_add(1));
    let chain = wait_until_converged(store, &key, options.timeout)
        .await
        .context("Airplane never settled")?;
    reports.extend(StepReport::from_chain(&chain));

    let parts = airplane.parts_key();
    for &pressed in &options.presses {
        press(store, &parts, pressed).await?;
        let chain = wait_for(store, &key, options.timeout, |chain| {
            chain.is_converged() && chain.pedals.as_ref().map(|p| p.spec.pressed) == Some(pressed)
        })
        .await
        .with_context(|| format!("Pressing {pressed} never settled"))?;
        reports.extend(StepReport::from_chain(&chain));
    }

    Ok(reports)
}

/// Set the pedal input, re-reading if a loop wrote the pedals in between.
async fn press(store: &dyn Store, key: &ObjectKey, pressed: Pressed) -> Result<()> {
    loop {
        let mut pedals = store
            .get_object::<Pedals>(key)
            .await
            .with_context(|| format!("Failed to read pedals {key}"))?;
        pedals.spec.pressed = pressed;

        match store.update_object(pedals, Section::Desired).await {
            Ok(_) => {
                info!(%key, %pressed, "Pedals pressed");
                return Ok(());
            }
            Err(e) if e.is_conflict() => {}
            Err(e) => return Err(e).with_context(|| format!("Failed to press pedals {key}")),
        }
    }
}

/// Apply a manifest and return every resource once all airplanes settled.
pub async fn run_manifest(
    config: ManagerConfig,
    manifest: Manifest,
    timeout: Duration,
) -> Result<Vec<Resource>> {
    let store = open_store(&config);
    let handle = Manager::with_default_controllers(store.clone(), config)
        .start()
        .await
        .context("Failed to start controllers")?;

    let result = settle(store.as_ref(), manifest, timeout).await;
    handle.shutdown().await.context("Failed to stop controllers")?;
    result
}

async fn settle(store: &dyn Store, manifest: Manifest, timeout: Duration) -> Result<Vec<Resource>> {
    let report = apply_manifest(store, manifest)
        .await
        .context("Failed to apply manifest")?;
    info!(
        created = report.created.len(),
        skipped = report.skipped.len(),
        "Manifest applied"
    );

    for airplane in store.list_objects::<Airplane>().await? {
        wait_until_converged(store, &airplane.key(), timeout)
            .await
            .with_context(|| format!("Airplane {} never settled", airplane.key()))?;
    }

    let mut resources = Vec::new();
    for kind in ResourceKind::ALL {
        resources.extend(store.list(kind).await?);
    }
    Ok(resources)
}

async fn cmd_fly(options: FlyOptions, config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    for report in fly(config, &options).await? {
        println!("{}", serde_json::to_string(&report)?);
    }
    Ok(())
}

async fn cmd_run(
    manifest_path: PathBuf,
    config: Option<&Path>,
    timeout_secs: u64,
    follow: bool,
) -> Result<()> {
    let config = load_config(config)?;
    let manifest = Manifest::load(&manifest_path)
        .with_context(|| format!("Failed to load manifest {}", manifest_path.display()))?;

    if follow {
        return follow_manifest(config, manifest).await;
    }

    let resources = run_manifest(config, manifest, Duration::from_secs(timeout_secs)).await?;
    for resource in &resources {
        info!("{}", resource.summary());
    }
    println!("{}", serde_json::to_string_pretty(&resources)?);
    Ok(())
}

/// Run the loops over a manifest until Ctrl+C.
async fn follow_manifest(config: ManagerConfig, manifest: Manifest) -> Result<()> {
    follow_until(config, manifest, async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => warn!(error = %err, "Failed to listen for shutdown signal"),
        }
    })
    .await
}

/// Run the loops over a manifest until `stop` resolves.
async fn follow_until(
    config: ManagerConfig,
    manifest: Manifest,
    stop: impl Future<Output = ()>,
) -> Result<()> {
    let store = open_store(&config);
    let handle = Manager::with_default_controllers(store.clone(), config)
        .start()
        .await
        .context("Failed to start controllers")?;

    let result = serve(store.as_ref(), manifest, stop).await;
    handle.shutdown().await.context("Failed to stop controllers")?;
    result
}

async fn serve(store: &dyn Store, manifest: Manifest, stop: impl Future<Output = ()>) -> Result<()> {
    apply_manifest(store, manifest)
        .await
        .context("Failed to apply manifest")?;

    info!("Controllers running. Press Ctrl+C to stop.");
    stop.await;

    for kind in ResourceKind::ALL {
        for resource in store.list(kind).await? {
            info!("{}", resource.summary());
        }
    }
    Ok(())
}

fn cmd_check_config(path: &Path) -> Result<()> {
    let config = load_config(Some(path))?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
