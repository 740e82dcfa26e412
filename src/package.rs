//! Package specifications
//!
//! A package is the unit of caching and invalidation: one compiled
//! library version with its unpacked classes and, optionally, sources.
//! Discovery (build-tool interrogation, JAR unpacking) happens upstream;
//! the engine consumes a manifest of already-materialized trees.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One package to index and analyze.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSpec {
    /// Unique name including version, e.g. `axelor-core-7.2.6`.
    pub name: String,
    /// Root of the unpacked `.class` tree.
    pub classes_dir: PathBuf,
    /// Root of the unpacked `.java` tree, when a sources JAR exists.
    #[serde(default)]
    pub sources_dir: Option<PathBuf>,
    /// Part of the project under analysis (not a cached dependency).
    #[serde(default)]
    pub is_local: bool,
    /// For local packages: source tree that symbol URIs should point at
    /// instead of the cache.
    #[serde(default)]
    pub project_source_root: Option<PathBuf>,
}

impl PackageSpec {
    pub fn new(name: impl Into<String>, classes_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            classes_dir: classes_dir.into(),
            sources_dir: None,
            is_local: false,
            project_source_root: None,
        }
    }

    /// Cache root whose prefix gets rewritten for local packages: the
    /// parent directory holding `classes/` and `sources/`.
    pub fn cache_root(&self) -> Option<&Path> {
        self.classes_dir.parent()
    }
}

/// Load a `PackageSpec[]` manifest, the JSON the dependency-discovery
/// step produces.
pub fn load_manifest(path: &Path) -> Result<Vec<PackageSpec>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read package manifest {}", path.display()))?;
    let specs: Vec<PackageSpec> = serde_json::from_str(&raw)
        .with_context(|| format!("invalid package manifest {}", path.display()))?;
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_round_trips_optional_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let manifest = dir.path().join("packages.json");
        std::fs::write(
            &manifest,
            r#"[
                {"name": "axelor-core-7.2.6", "classesDir": "/cache/axelor-core-7.2.6/classes",
                 "sourcesDir": "/cache/axelor-core-7.2.6/sources"},
                {"name": "open-auction-base-8.2.9", "classesDir": "/cache/open-auction-base-8.2.9/classes",
                 "isLocal": true, "projectSourceRoot": "/project/modules/open-auction-base"}
            ]"#,
        )
        .unwrap();

        let specs = load_manifest(&manifest).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].name, "axelor-core-7.2.6");
        assert!(specs[0].sources_dir.is_some());
        assert!(!specs[0].is_local);
        assert!(specs[1].is_local);
        assert_eq!(
            specs[1].project_source_root.as_deref(),
            Some(Path::new("/project/modules/open-auction-base"))
        );
    }

    #[test]
    fn cache_root_is_the_package_directory() {
        let spec = PackageSpec::new("p-1.0.0", "/cache/p-1.0.0/classes");
        assert_eq!(spec.cache_root(), Some(Path::new("/cache/p-1.0.0")));
    }
}
