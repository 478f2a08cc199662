/// Application configuration, persisted as TOML in the config directory.
///
/// The replay CLI reads `config.toml` from `--config-dir` (default: the
/// current directory); command-line flags override individual fields.
///
/// NOTE: log_path may point at a specific combat log **or** at the WoW Logs
/// directory, in which case the newest WoWCombatLog*.txt is replayed.
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// AppConfig
// ---------------------------------------------------------------------------

/// How the empowerment window is opened for this character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ActivationMode {
    /// The empowering ability is cast directly.
    #[default]
    Cast,
    /// The empowering buff is procced by eligible casts.
    Proc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Combat log file, or a Logs directory to pick the newest log from.
    #[serde(default)]
    pub log_path: PathBuf,

    /// Name of the player to review (used to discover the GUID from the log).
    #[serde(default)]
    pub player_name: String,

    /// GUID of the player to review. Takes precedence over `player_name`.
    #[serde(default)]
    pub player_guid: String,

    /// "CLASS/Spec" key of an embedded profile.
    #[serde(default = "default_profile")]
    pub profile: String,

    /// External profile TOML; overrides `profile` when set.
    #[serde(default)]
    pub profile_path: Option<PathBuf>,

    #[serde(default)]
    pub activation: ActivationMode,

    /// Haste fraction applied to waste during replay (0.25 = 25%).
    #[serde(default)]
    pub haste: f64,

    /// Directory for rolling log files; stderr when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_profile() -> String { "SHAMAN/Enhancement".to_owned() }

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_path:     PathBuf::new(),
            player_name:  String::new(),
            player_guid:  String::new(),
            profile:      default_profile(),
            profile_path: None,
            activation:   ActivationMode::default(),
            haste:        0.0,
            log_dir:      None,
        }
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

pub fn load_or_default(config_dir: &Path) -> Result<AppConfig> {
    let path = config_dir.join("config.toml");
    if path.exists() {
        let raw = std::fs::read_to_string(&path)?;
        let cfg: AppConfig = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Config parse error: {}", e))?;
        Ok(cfg)
    } else {
        Ok(AppConfig::default())
    }
}

pub fn save(config: &AppConfig, config_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(config_dir)?;
    let raw = toml::to_string_pretty(config)
        .map_err(|e| anyhow::anyhow!("Config serialize error: {}", e))?;
    std::fs::write(config_dir.join("config.toml"), raw)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Log path helpers
// ---------------------------------------------------------------------------

/// Scans `logs_dir` for `WoWCombatLog*.txt` files and returns the path of the
/// one with the most recent `modified` timestamp.  Returns `None` if the
/// directory is empty or contains no matching files.
pub fn find_latest_log(logs_dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(logs_dir).ok()?;

    let mut best: Option<(PathBuf, std::time::SystemTime)> = None;

    for entry in entries.flatten() {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();

        if !name_str.starts_with("WoWCombatLog") || !name_str.ends_with(".txt") {
            continue;
        }

        let path = entry.path();
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(_) => continue,
        };

        match &best {
            None => best = Some((path, modified)),
            Some((_, best_time)) if modified > *best_time => best = Some((path, modified)),
            _ => {}
        }
    }

    if let Some((ref p, _)) = best {
        tracing::debug!("find_latest_log: selected {:?}", p);
    }
    best.map(|(p, _)| p)
}

/// Turn the configured `log_path` into a concrete file to replay.
pub fn resolve_log_file(log_path: &Path) -> Result<PathBuf> {
    if log_path.as_os_str().is_empty() {
        anyhow::bail!("No combat log configured (set log_path or pass --log)");
    }
    if log_path.is_dir() {
        return find_latest_log(log_path)
            .ok_or_else(|| anyhow::anyhow!("No WoWCombatLog*.txt in {}", log_path.display()));
    }
    if !log_path.exists() {
        anyhow::bail!("Combat log not found: {}", log_path.display());
    }
    Ok(log_path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn round_trips_config() {
        let dir = tempdir().unwrap();
        let mut cfg = AppConfig::default();
        cfg.player_name = "Stormcaller".to_owned();
        cfg.activation  = ActivationMode::Proc;
        cfg.haste       = 0.25;

        save(&cfg, dir.path()).unwrap();

        let loaded = load_or_default(dir.path()).unwrap();
        assert_eq!(loaded.player_name, "Stormcaller");
        assert_eq!(loaded.activation,  ActivationMode::Proc);
        assert_eq!(loaded.haste,       0.25);
        assert_eq!(loaded.profile,     "SHAMAN/Enhancement");
    }

    #[test]
    fn returns_default_when_missing() {
        let dir = tempdir().unwrap();
        let cfg = load_or_default(dir.path()).unwrap();
        assert_eq!(cfg.activation, ActivationMode::Cast);
        assert!(cfg.log_path.as_os_str().is_empty());
        assert!(cfg.profile_path.is_none());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "activation = \"proc\"\n").unwrap();
        let cfg = load_or_default(dir.path()).unwrap();
        assert_eq!(cfg.activation, ActivationMode::Proc);
        assert_eq!(cfg.profile, "SHAMAN/Enhancement");
    }

    #[test]
    fn rejects_malformed_config() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "haste = \"fast\"\n").unwrap();
        assert!(load_or_default(dir.path()).is_err());
    }

    #[test]
    fn find_latest_log_picks_newest() {
        let dir = tempdir().unwrap();

        let older_path = dir.path().join("WoWCombatLog_2024_01_01_100000.txt");
        let newer_path = dir.path().join("WoWCombatLog_2024_06_15_183000.txt");

        std::fs::File::create(&older_path).unwrap().write_all(b"old").unwrap();
        let old = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        std::fs::File::options()
            .write(true)
            .open(&older_path)
            .unwrap()
            .set_modified(old)
            .unwrap();
        std::fs::File::create(&newer_path).unwrap().write_all(b"new").unwrap();

        let result = find_latest_log(dir.path()).unwrap();
        assert_eq!(result, newer_path);
    }

    #[test]
    fn find_latest_log_ignores_non_combatlog_files() {
        let dir = tempdir().unwrap();
        std::fs::File::create(dir.path().join("Interface.log")).unwrap();
        std::fs::File::create(dir.path().join("addon_errors.txt")).unwrap();
        assert!(find_latest_log(dir.path()).is_none());
    }

    #[test]
    fn resolves_directory_and_file_paths() {
        let dir = tempdir().unwrap();
        assert!(resolve_log_file(Path::new("")).is_err());
        assert!(resolve_log_file(dir.path()).is_err());
        assert!(resolve_log_file(&dir.path().join("nope.txt")).is_err());

        let log = dir.path().join("WoWCombatLog.txt");
        std::fs::write(&log, "").unwrap();
        assert_eq!(resolve_log_file(dir.path()).unwrap(), log);
        assert_eq!(resolve_log_file(&log).unwrap(), log);
    }
}
