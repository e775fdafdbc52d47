//! Shared mechanism fixtures for tests and benches, indexed by `fixtures/manifest.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    mechanisms: BTreeMap<String, MechanismEntry>,
}

#[derive(Debug, Deserialize)]
struct MechanismEntry {
    path: String,
    dimension: String,
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a BTreeMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

pub mod mechanisms {
    use super::*;

    /// Fixture names in sorted order.
    pub fn keys() -> Vec<String> {
        MANIFEST.mechanisms.keys().cloned().collect()
    }

    /// Fixture names authored for one dimension (`"planar"` or `"spatial"`).
    pub fn keys_for(dimension: &str) -> Vec<String> {
        MANIFEST
            .mechanisms
            .iter()
            .filter(|(_, entry)| entry.dimension == dimension)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn dimension(name: &str) -> Result<&'static str> {
        let entry = lookup(&MANIFEST.mechanisms, "mechanism", name)?;
        Ok(entry.dimension.as_str())
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.mechanisms, "mechanism", name)?;
        read_to_string(&entry.path)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.mechanisms, "mechanism", name)?;
        super::load_json(&entry.path)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let entry = lookup(&MANIFEST.mechanisms, "mechanism", name)?;
        Ok(resolve_path(&entry.path))
    }
}
