use serde::{Deserialize, Serialize};
use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use std::{collections::BTreeMap, fs, path::{Path, PathBuf}};
use thiserror::Error;

use crate::cvar::Cvars;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Persisted configuration. Archived console variables live in `cvars`
/// and are written back on a clean shutdown.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,     // e.g., "info" | "debug"
    /// extra directory searched for renderer modules
    pub driver_path: Option<PathBuf>,
    #[serde(default)]
    pub cvars: BTreeMap<String, String>,
}

/// CLI overrides. Layered over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "vidref", about = "Renderer module loader", version)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, short = 'c', value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Enable debug log level
    #[arg(long, short = 'v', alias = "verbose", action = ArgAction::SetTrue)]
    pub debug: bool,
    /// Renderer module to try first
    #[arg(long)]
    pub vid_ref: Option<String>,
    /// Extra directory searched for renderer modules
    #[arg(long, value_hint = ValueHint::DirPath)]
    pub driver_path: Option<PathBuf>,
    /// Number of frames to run before shutting down
    #[arg(long, default_value_t = 1)]
    pub frames: u32,
    /// Console command to run after startup (repeatable)
    #[arg(long = "exec", value_name = "COMMAND")]
    pub exec: Vec<String>,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Effective configuration plus the file it is saved back to
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: Config,
    pub path: PathBuf,
}

/// Read YAML, merge CLI overrides, validate.
pub fn load(cli: &Cli) -> Result<Settings, ConfigError> {
    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    let path = if let Some(p) = cli.config.as_ref() {
        if !p.exists() {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
        merge(&mut cfg, read_yaml(p)?);
        p.clone()
    } else if let Some(p) = find_config_file() {
        merge(&mut cfg, read_yaml(&p)?);
        p
    } else {
        default_config_path()
    };

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, cli);

    // 4) Validate
    validate(&cfg)?;

    Ok(Settings { config: cfg, path })
}

impl Config {
    /// Pre-load persisted variables into the store
    pub fn seed(&self, cvars: &mut Cvars) {
        for (name, value) in &self.cvars {
            cvars.seed(name, value);
        }
    }

    /// Pick up the current archived variables for saving
    pub fn capture(&mut self, cvars: &Cvars) {
        for (name, value) in cvars.archived() {
            self.cvars.insert(name.to_string(), value.to_string());
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_yaml::to_string(self)?)?;
        Ok(())
    }
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/vidref/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/vidref/config.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["vidref.yaml", "config/vidref.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn default_config_path() -> PathBuf {
    match home_dir() {
        Some(home) => home.join(".config/vidref/config.yaml"),
        None => PathBuf::from("vidref.yaml"),
    }
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some()   { dst.log_level = src.log_level; }
    if src.driver_path.is_some() { dst.driver_path = src.driver_path; }
    dst.cvars.extend(src.cvars);
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.log_level.is_some()   { cfg.log_level = cli.log_level.clone(); }
    if cli.debug                 { cfg.log_level = Some("debug".to_string()); }
    if cli.driver_path.is_some() { cfg.driver_path = cli.driver_path.clone(); }
    if let Some(name) = cli.vid_ref.as_ref() {
        cfg.cvars.insert("vid_ref".to_string(), name.clone());
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(level) = cfg.log_level.as_deref() {
        match level {
            "error" | "warn" | "info" | "debug" | "trace" | "off" => {},
            _ => return Err(ConfigError::Validation(format!("unknown log_level: {level}"))),
        }
    }
    if let Some(name) = cfg.cvars.get("vid_ref") {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation("vid_ref must not be empty".into()));
        }
    }
    for key in ["r_customwidth", "r_customheight"] {
        if let Some(v) = cfg.cvars.get(key) {
            match v.trim().parse::<f32>() {
                Ok(n) if n > 0.0 => {},
                _ => return Err(ConfigError::Validation(format!("{key} must be > 0, got {v:?}"))),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cvar::CvarFlags;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["vidref"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid arguments")
    }

    #[test]
    fn test_yaml_round_trip_through_cvars() {
        let yaml = "log_level: debug\ncvars:\n  vid_ref: gl\n  r_customwidth: \"1920\"\n";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));

        let mut cvars = Cvars::new();
        cfg.seed(&mut cvars);
        cvars.get("vid_ref", "soft", CvarFlags::ARCHIVE);
        cvars.get("r_customwidth", "1600", CvarFlags::ARCHIVE);
        cvars.get("scratch", "1", CvarFlags::NONE);
        assert_eq!(cvars.string("vid_ref"), "gl");
        assert_eq!(cvars.value_i32("r_customwidth"), 1920);

        let mut out = Config::default();
        out.capture(&cvars);
        assert_eq!(out.cvars.get("vid_ref").map(String::as_str), Some("gl"));
        assert!(!out.cvars.contains_key("scratch"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut cfg = Config::default();
        cfg.cvars.insert("vid_ref".into(), "soft".into());
        apply_cli_overrides(&mut cfg, &cli(&["--vid-ref", "gl", "-v"]));
        assert_eq!(cfg.cvars["vid_ref"], "gl");
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_cli_defaults() {
        let parsed = cli(&["--exec", "vid_restart", "--exec", "vid_restart"]);
        assert_eq!(parsed.frames, 1);
        assert_eq!(parsed.exec.len(), 2);
        assert!(!parsed.dump_config);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.cvars.insert("r_customheight".into(), "0".into());
        assert!(validate(&cfg).is_err());

        let mut cfg = Config::default();
        cfg.cvars.insert("vid_ref".into(), "  ".into());
        assert!(validate(&cfg).is_err());

        let cfg = Config { log_level: Some("loud".into()), ..Config::default() };
        assert!(validate(&cfg).is_err());

        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let parsed = cli(&["--config", "/nonexistent/vidref-test.yaml"]);
        assert!(matches!(load(&parsed), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join(format!("vidref-config-{}", std::process::id()));
        let path = dir.join("config.yaml");

        let mut cfg = Config::default();
        cfg.cvars.insert("vid_ref".into(), "softx".into());
        cfg.save(&path).unwrap();

        let loaded = load(&cli(&["--config", path.to_str().unwrap()])).unwrap();
        assert_eq!(loaded.config, cfg);
        assert_eq!(loaded.path, path);

        let _ = fs::remove_dir_all(&dir);
    }
}
