//! Tests for the `fly` and `run` commands against a live manager.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use flightdeck::commands::{FlyOptions, StepReport, fly, run_manifest};
use flightdeck_reconciler::ManagerConfig;
use flightdeck_store::{Manifest, Position, Pressed, Resource, ResourceKind};

fn fast_config() -> ManagerConfig {
    ManagerConfig {
        base_backoff_ms: 1,
        max_backoff_ms: 50,
        missing_dependency_delay_ms: 20,
        ..ManagerConfig::default()
    }
}

fn settled(press: Pressed, position: Position) -> StepReport {
    StepReport {
        press,
        linkage_position: position,
        rudder_target: position,
        rudder_position: position,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fly_reports_each_settled_step() {
    let options = FlyOptions {
        namespace: "default".to_string(),
        name: "cessna".to_string(),
        tail_number: "N123AB".to_string(),
        presses: vec![Pressed::Left, Pressed::Right, Pressed::None],
        timeout: Duration::from_secs(5),
    };

    let reports = fly(fast_config(), &options).await.unwrap();

    assert_eq!(
        reports,
        vec![
            settled(Pressed::None, Position::Neutral),
            settled(Pressed::Left, Position::Left),
            settled(Pressed::Right, Position::Right),
            settled(Pressed::None, Position::Neutral),
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_fly_rejects_invalid_tail_number() {
    let options = FlyOptions {
        namespace: "default".to_string(),
        name: "glider".to_string(),
        tail_number: "G-ABCD".to_string(),
        presses: Vec::new(),
        timeout: Duration::from_secs(1),
    };

    let err = fly(fast_config(), &options).await.unwrap_err();
    assert!(format!("{err:#}").contains("tailNumber"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_run_converges_every_airplane_in_manifest() {
    let manifest = Manifest::from_yaml(
        r"
resources:
  - kind: Airplane
    metadata: {name: cessna, namespace: default}
    spec: {tailNumber: N123AB}
  - kind: Airplane
    metadata: {name: piper, namespace: hangar}
    spec: {tailNumber: N901NV}
",
    )
    .unwrap();

    let resources = run_manifest(fast_config(), manifest, Duration::from_secs(5))
        .await
        .unwrap();

    let count = |kind: ResourceKind| resources.iter().filter(|r| r.kind() == kind).count();
    assert_eq!(count(ResourceKind::Airplane), 2);
    assert_eq!(count(ResourceKind::Pedals), 2);
    assert_eq!(count(ResourceKind::Rudder), 2);

    for resource in &resources {
        if let Resource::Airplane(airplane) = resource {
            assert!(airplane.status.pedals.is_some());
            assert!(airplane.status.rudder.is_some());
        }
    }
}

#[test]
fn test_demo_files_load() {
    let demos = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos");

    let config = flightdeck::commands::load_config(Some(demos.join("flightdeck.toml").as_path())).unwrap();
    assert_eq!(config, ManagerConfig::default());

    let manifest = Manifest::load(&demos.join("fleet.yaml")).unwrap();
    assert_eq!(manifest.resources.len(), 2);
}
