use anyhow::Result;
use mudsim_core::RoomId;
use mudsim_server::{ServerSettings, STARTER_SQUARE, STARTER_TEMPLE};
use mudsim_world::WorldSettings;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/server.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Milliseconds between world ticks.
    pub tick_interval_ms: u64,
    /// Milliseconds between message bus drains.
    pub bus_poll_interval_ms: u64,
    /// Save the world every N ticks; 0 disables periodic saves.
    pub save_every_ticks: u64,
    pub data_dir: PathBuf,
    pub start_room: u64,
    pub respawn_room: u64,
    /// Seeds combat and spawner dice for reproducible runs.
    pub seed: Option<u64>,
    /// Stop after this many ticks (headless runs).
    pub max_ticks: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 3000,
            bus_poll_interval_ms: 10,
            save_every_ticks: 20,
            data_dir: PathBuf::from("data"),
            start_room: STARTER_SQUARE.0,
            respawn_room: STARTER_TEMPLE.0,
            seed: None,
            max_ticks: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<ServerConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    ServerConfig::default()
                }
            },
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                } else {
                    warn!("Server config not found at {}. Using defaults", path.display());
                }
                ServerConfig::default()
            }
        }
    }

    /// Write the configuration, creating parent directories as needed.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    pub fn server_settings(&self) -> ServerSettings {
        ServerSettings {
            // tokio intervals panic on a zero period.
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
            bus_poll_interval: Duration::from_millis(self.bus_poll_interval_ms.max(1)),
            max_ticks: self.max_ticks,
            world: WorldSettings {
                save_every_ticks: self.save_every_ticks,
                start_room: RoomId(self.start_room),
                respawn_room: RoomId(self.respawn_room),
                seed: self.seed,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_keep_the_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("server.toml");
        fs::write(&path, "tick_interval_ms = 500\nseed = 42\n").expect("write");

        let cfg = ServerConfig::load_from_path(&path);
        assert_eq!(cfg.tick_interval_ms, 500);
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.save_every_ticks, 20);
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
    }

    #[test]
    fn broken_or_missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "tick_interval_ms = \"soon\"").expect("write");

        assert_eq!(ServerConfig::load_from_path(&broken), ServerConfig::default());
        assert_eq!(
            ServerConfig::load_from_path(&dir.path().join("absent.toml")),
            ServerConfig::default()
        );
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/server.toml");
        let cfg = ServerConfig {
            max_ticks: Some(10),
            respawn_room: 9,
            ..ServerConfig::default()
        };
        cfg.save_to_path(&path).expect("save");
        assert_eq!(ServerConfig::load_from_path(&path), cfg);
    }

    #[test]
    fn settings_clamp_zero_intervals() {
        let cfg = ServerConfig {
            tick_interval_ms: 0,
            ..ServerConfig::default()
        };
        let settings = cfg.server_settings();
        assert_eq!(settings.tick_interval, Duration::from_millis(1));
        assert_eq!(settings.world.respawn_room, STARTER_TEMPLE);
    }
}
