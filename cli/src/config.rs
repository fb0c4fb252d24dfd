//! Configuration management for the deepspeaker CLI.
//!
//! Configuration is stored in ~/.deepspeaker/{app_name}/config.yaml

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".deepspeaker";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Application name (not serialized).
    #[serde(skip)]
    pub app_name: String,

    /// Name of the currently active context.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_context: String,

    /// Map of context name to context configuration.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub contexts: HashMap<String, Context>,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

/// A named model setup.
///
/// Zero values mean "use the built-in default".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    /// Context name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Checkpoint directory holding `config.json` and the weights.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub checkpoint: String,

    /// Same-speaker cosine threshold.
    #[serde(default, skip_serializing_if = "is_zero_f32")]
    pub threshold: f32,

    /// Frames per inference segment.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub segment_frames: usize,

    /// Hop between inference segments.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub hop_frames: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

fn is_zero_f32(n: &f32) -> bool {
    *n == 0.0
}

impl Config {
    /// Gets the default config directory.
    pub fn default_config_dir(app_name: &str) -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(app_name))
    }

    /// Gets the default config file path.
    pub fn default_config_path(app_name: &str) -> Option<PathBuf> {
        Self::default_config_dir(app_name).map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Returns the config file path.
    pub fn path(&self) -> &PathBuf {
        &self.config_path
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Adds or replaces a context.
    pub fn add_context(&mut self, name: &str, mut ctx: Context) -> anyhow::Result<()> {
        if name.is_empty() {
            anyhow::bail!("context name must not be empty");
        }
        ctx.name = name.to_string();
        self.contexts.insert(name.to_string(), ctx);
        self.save()
    }

    /// Deletes a context.
    pub fn delete_context(&mut self, name: &str) -> anyhow::Result<()> {
        if self.contexts.remove(name).is_none() {
            anyhow::bail!("context '{}' not found", name);
        }
        if self.current_context == name {
            self.current_context.clear();
        }
        self.save()
    }

    /// Sets the current context.
    pub fn use_context(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.contexts.contains_key(name) {
            anyhow::bail!("context '{}' not found", name);
        }
        self.current_context = name.to_string();
        self.save()
    }

    /// Gets a specific context.
    pub fn get_context(&self, name: &str) -> Option<&Context> {
        self.contexts.get(name)
    }

    /// Gets the current context.
    pub fn get_current_context(&self) -> Option<&Context> {
        if self.current_context.is_empty() {
            return None;
        }
        self.contexts.get(&self.current_context)
    }

    /// Resolves the context by name, or current context if name is empty.
    pub fn resolve_context(&self, name: Option<&str>) -> Option<&Context> {
        match name {
            Some(n) if !n.is_empty() => self.get_context(n),
            _ => self.get_current_context(),
        }
    }

    /// Lists all context names, sorted.
    pub fn list_contexts(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.contexts.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

impl Context {
    /// Checkpoint directory with a leading `~/` expanded.
    pub fn checkpoint_dir(&self) -> Option<PathBuf> {
        if self.checkpoint.is_empty() {
            return None;
        }
        Some(expand_home(&self.checkpoint))
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Loads configuration for the specified app.
pub fn load_config(app_name: &str, custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = match custom_path {
        Some(p) => PathBuf::from(p),
        None => Config::default_config_path(app_name)
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
    };

    // Ensure config directory exists
    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        serde_yaml::from_str::<Option<Config>>(&content)?.unwrap_or_default()
    } else {
        let cfg = Config::default();
        let content = serde_yaml::to_string(&cfg)?;
        std::fs::write(&config_path, content)?;
        cfg
    };

    cfg.app_name = app_name.to_string();
    cfg.config_path = config_path;

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_temp(dir: &tempfile::TempDir) -> Config {
        let path = dir.path().join("nested").join("config.yaml");
        load_config("deepspeaker", Some(path.to_str().unwrap())).unwrap()
    }

    #[test]
    fn load_creates_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_temp(&dir);
        assert!(cfg.path().exists());
        assert!(cfg.contexts.is_empty());
        assert_eq!(cfg.app_name, "deepspeaker");
        assert_eq!(cfg.path(), &dir.path().join("nested").join("config.yaml"));
    }

    #[test]
    fn contexts_persist() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = load_temp(&dir);
        cfg.add_context(
            "prod",
            Context {
                checkpoint: "/models/rescnn".into(),
                threshold: 0.8,
                ..Default::default()
            },
        )
        .unwrap();
        cfg.add_context("dev", Context::default()).unwrap();
        cfg.use_context("prod").unwrap();

        let reloaded = load_temp(&dir);
        assert_eq!(reloaded.current_context, "prod");
        assert_eq!(reloaded.list_contexts(), vec!["dev", "prod"]);

        let prod = reloaded.get_current_context().unwrap();
        assert_eq!(prod.name, "prod");
        assert_eq!(prod.threshold, 0.8);
        assert_eq!(prod.checkpoint_dir(), Some(PathBuf::from("/models/rescnn")));
        assert_eq!(reloaded.resolve_context(Some("dev")).unwrap().name, "dev");
        assert_eq!(reloaded.resolve_context(Some("")).unwrap().name, "prod");
        assert!(reloaded.resolve_context(Some("missing")).is_none());
    }

    #[test]
    fn zero_fields_are_omitted() {
        let ctx = Context {
            name: "a".into(),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&ctx).unwrap();
        assert_eq!(yaml.trim(), "name: a");
    }

    #[test]
    fn delete_current_context_clears_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = load_temp(&dir);
        cfg.add_context("only", Context::default()).unwrap();
        cfg.use_context("only").unwrap();
        cfg.delete_context("only").unwrap();
        assert!(cfg.current_context.is_empty());
        assert!(cfg.get_current_context().is_none());
        assert!(cfg.delete_context("only").is_err());
    }

    #[test]
    fn unknown_context_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = load_temp(&dir);
        assert!(cfg.use_context("nope").is_err());
        assert!(cfg.add_context("", Context::default()).is_err());
    }

    #[test]
    fn empty_checkpoint_is_unset() {
        assert_eq!(Context::default().checkpoint_dir(), None);
    }

    #[test]
    fn expand_home_prefix() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/models"), home.join("models"));
        }
        assert_eq!(expand_home("rel/models"), PathBuf::from("rel/models"));
    }
}
