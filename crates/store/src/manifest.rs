//! Loading resource manifests and applying them to a store.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::StoreResult;
use crate::resources::Resource;
use crate::store::Store;
use crate::types::{ObjectKey, ResourceKind};

/// A list of resources to create.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub resources: Vec<Resource>,
}

impl Manifest {
    /// Load a manifest from a YAML or JSON file.
    pub fn load(path: &Path) -> flightdeck_core::Result<Self> {
        flightdeck_core::load_file(path)
    }

    /// Parse a manifest from YAML text.
    pub fn from_yaml(input: &str) -> flightdeck_core::Result<Self> {
        flightdeck_core::parse_yaml(input)
    }
}

/// What applying a manifest did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub created: Vec<(ResourceKind, ObjectKey)>,
    pub skipped: Vec<(ResourceKind, ObjectKey)>,
}

/// Create every resource in the manifest, in order.
///
/// Resources that already exist are skipped; any other failure aborts.
pub async fn apply_manifest(store: &dyn Store, manifest: Manifest) -> StoreResult<ApplyReport> {
    let mut report = ApplyReport::default();

    for resource in manifest.resources {
        let kind = resource.kind();
        let key = resource.key();
        match store.create(resource).await {
            Ok(_) => {
                info!(%kind, %key, "Created");
                report.created.push((kind, key));
            }
            Err(e) if e.is_already_exists() => {
                warn!(%kind, %key, "Already exists, skipping");
                report.skipped.push((kind, key));
            }
            Err(e) => return Err(e),
        }
    }

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::StoreError;
    use crate::store::InMemoryStore;

    const FLEET: &str = r"
resources:
  - kind: Airplane
    metadata:
      name: cessna
      namespace: default
    spec:
      tailNumber: N123AB
  - kind: Airplane
    metadata:
      name: piper
      namespace: default
    spec:
      tailNumber: N901NV
";

    #[test]
    fn test_parse_yaml_manifest() -> flightdeck_core::Result<()> {
        let manifest = Manifest::from_yaml(FLEET)?;
        assert_eq!(manifest.resources.len(), 2);
        assert!(
            manifest
                .resources
                .iter()
                .all(|r| r.kind() == ResourceKind::Airplane)
        );
        Ok(())
    }

    #[test]
    fn test_load_manifest_from_file() -> flightdeck_core::Result<()> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(FLEET.as_bytes()).unwrap();

        let manifest = Manifest::load(file.path())?;
        assert_eq!(manifest.resources.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_skips_existing() -> StoreResult<()> {
        let store = InMemoryStore::new();
        let manifest = Manifest::from_yaml(FLEET).unwrap();

        let first = apply_manifest(&store, manifest.clone()).await?;
        assert_eq!(first.created.len(), 2);

        let second = apply_manifest(&store, manifest).await?;
        assert!(second.created.is_empty());
        assert_eq!(second.skipped.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_apply_aborts_on_invalid_resource() {
        let store = InMemoryStore::new();
        let manifest = Manifest::from_yaml(
            r"
resources:
  - kind: Airplane
    metadata: {name: bad, namespace: default}
    spec: {tailNumber: X123}
",
        )
        .unwrap();

        let result = apply_manifest(&store, manifest).await;
        assert!(matches!(result, Err(StoreError::Invalid { .. })));
    }
}
