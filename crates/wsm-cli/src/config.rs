use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use wsm_state::StateConfig;

/// Configuration of the `wsm` binary.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub state: StateConfig,
    /// JSON ledger fixture. Relative paths resolve against the directory of
    /// the configuration file.
    pub fixture: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            state: StateConfig::default(),
            fixture: PathBuf::from("ledger.json"),
        }
    }
}

impl CliConfig {
    /// Load the configuration at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config: Self =
            toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        if config.fixture.is_relative() {
            if let Some(dir) = path.parent() {
                config.fixture = dir.join(&config.fixture);
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wsm_types::LedgerId;

    #[test]
    fn default_config() {
        let c = CliConfig::default();
        assert_eq!(c.fixture, PathBuf::from("ledger.json"));
        assert_eq!(c.state.genesis_height, 0);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let c = CliConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(c.fixture, PathBuf::from("ledger.json"));
    }

    #[test]
    fn load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wsm.toml");
        std::fs::write(
            &path,
            "fixture = \"fixtures/ledger.json\"\n\n[state]\nledger_id = \"did:v1:ledger\"\ngenesis_height = 1\n",
        )
        .unwrap();

        let c = CliConfig::load(&path).unwrap();
        assert_eq!(c.state.ledger_id, LedgerId::new("did:v1:ledger"));
        assert_eq!(c.state.genesis_height, 1);
        assert_eq!(c.fixture, dir.path().join("fixtures/ledger.json"));
    }

    #[test]
    fn malformed_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wsm.toml");
        std::fs::write(&path, "[state\n").unwrap();
        assert!(CliConfig::load(&path).is_err());
    }
}
