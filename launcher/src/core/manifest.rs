//! Read-only view of the project manifest (`package.json`).

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;

/// The few manifest fields the launcher looks at. Everything else is ignored.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub scripts: BTreeMap<String, String>,
}

impl Manifest {
    pub fn parse(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("parse manifest json")
    }

    /// The shell command behind `scripts.<name>`, if declared.
    pub fn script(&self, name: &str) -> Option<&str> {
        self.scripts.get(name).map(String::as_str)
    }
}
