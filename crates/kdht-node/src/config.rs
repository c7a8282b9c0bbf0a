//! TOML configuration for a standalone node process.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hex-encoded 20-byte node id. If absent, a random id is generated.
    pub id: Option<String>,

    /// Address to bind the listener on, e.g. `0.0.0.0:4586`.
    pub listen: String,

    /// Nodes per k-bucket.
    pub k: usize,

    /// Lookup parallelism.
    pub alpha: usize,

    /// Addresses of nodes to bootstrap from at startup.
    pub neighbors: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            id: None,
            listen: "0.0.0.0:4586".to_string(),
            k: 20,
            alpha: 3,
            neighbors: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
