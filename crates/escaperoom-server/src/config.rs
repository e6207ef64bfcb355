use std::path::{Path, PathBuf};

use escape_core::{ConfigError, RoomConfig};
use escape_engine::ConfigSource;
use serde::{Deserialize, Serialize};

use crate::logging::LogFormat;

/// Represents the server configuration file.
///
/// The room configuration (stations and their sensor rules) lives at the
/// top level of the same document, next to the server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub mqtt_broker: MqttBroker,
    /// Directory the configured sounds are resolved against
    #[serde(default = "default_audio_base_path")]
    pub audio_base_path: PathBuf,
    #[serde(default)]
    pub audio_player: AudioPlayerSettings,
    /// Also written to stdout; `null` logs to stdout only
    #[serde(default = "default_log_file")]
    pub log_file: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(flatten)]
    pub room: RoomConfig,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read_config_file(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn default_audio_base_path() -> PathBuf {
    PathBuf::from("/app/audio/")
}

fn default_log_file() -> Option<PathBuf> {
    Some(PathBuf::from("/app/logs/server.log"))
}

fn default_log_level() -> String {
    "info".into()
}

/// Connection settings of the MQTT broker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MqttBroker {
    pub host: String,
    pub port: u16,
    pub keepalive_secs: u64,
    /// The process id is appended to build the client id
    pub client_id_prefix: String,
    /// Pause between two connection attempts
    pub reconnect_delay_secs: u64,
}

impl Default for MqttBroker {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            keepalive_secs: 60,
            client_id_prefix: "escape-room-server-".into(),
            reconnect_delay_secs: 5,
        }
    }
}

/// External program used to play sounds; the file path is appended to `args`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioPlayerSettings {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for AudioPlayerSettings {
    fn default() -> Self {
        Self {
            program: "aplay".into(),
            args: vec!["-q".into()],
        }
    }
}

/// Read-only status API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    pub enabled: bool,
    pub bind: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: "0.0.0.0:3000".into(),
        }
    }
}

/// Reloads the room configuration from the file the server was started with.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<RoomConfig, ConfigError> {
        RoomConfig::from_json_str(&read_config_file(&self.path)?)
    }
}

fn read_config_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_owned(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const FULL_CONFIG: &str = r#"
    {
      "mqtt_broker": {"host": "broker.local", "port": 1884, "keepalive_secs": 30},
      "audio_base_path": "/srv/sounds",
      "audio_player": {"program": "mpg123", "args": []},
      "log_file": "/var/log/room.log",
      "log_level": "debug",
      "log_format": "json",
      "http": {"enabled": false},
      "session_start_sound": "intro.wav",
      "station_configs": {
        "station_5": {
          "beacon": {
            "event_type": "beacon_proximity",
            "range_threshold": 2.5,
            "sound_on_trigger": "beep.wav"
          }
        },
        "station_door": {
          "door": {
            "event_type": "door_status",
            "trigger_value": "OPEN",
            "sound_on_trigger": "creak.wav"
          }
        }
      }
    }
    "#;

    #[test]
    fn test_settings_deserialization() {
        let settings: Settings = serde_json::from_str(FULL_CONFIG).unwrap();

        assert_eq!(settings.mqtt_broker.host, "broker.local");
        assert_eq!(settings.mqtt_broker.port, 1884);
        assert_eq!(settings.mqtt_broker.keepalive_secs, 30);
        assert_eq!(settings.mqtt_broker.client_id_prefix, "escape-room-server-");
        assert_eq!(settings.audio_base_path, PathBuf::from("/srv/sounds"));
        assert_eq!(settings.audio_player.program, "mpg123");
        assert!(settings.audio_player.args.is_empty());
        assert_eq!(settings.log_file, Some(PathBuf::from("/var/log/room.log")));
        assert_eq!(settings.log_level, "debug");
        assert_eq!(settings.log_format, LogFormat::Json);
        assert!(!settings.http.enabled);
        assert_eq!(settings.http.bind, "0.0.0.0:3000");
        assert_eq!(settings.room.session_start_sound.as_deref(), Some("intro.wav"));
        assert_eq!(settings.room.station_configs.len(), 2);
        assert!(settings.room.station("station_door").is_some());
    }

    #[test]
    fn test_settings_defaults() {
        let settings: Settings = serde_json::from_str("{}").unwrap();

        assert_eq!(settings.mqtt_broker.host, "localhost");
        assert_eq!(settings.mqtt_broker.port, 1883);
        assert_eq!(settings.mqtt_broker.keepalive_secs, 60);
        assert_eq!(settings.audio_base_path, PathBuf::from("/app/audio/"));
        assert_eq!(settings.audio_player.program, "aplay");
        assert_eq!(settings.log_file, Some(PathBuf::from("/app/logs/server.log")));
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.log_format, LogFormat::Text);
        assert!(settings.http.enabled);
        assert!(settings.room.station_configs.is_empty());
    }

    #[test]
    fn test_log_file_survives_a_round_trip() {
        let settings: Settings =
            serde_json::from_str(r#"{"log_file": "/var/log/room.log"}"#).unwrap();
        let json = serde_json::to_value(&settings).unwrap();

        assert_eq!(json["log_file"], "/var/log/room.log");
    }

    #[test]
    fn test_log_file_can_be_disabled() {
        let settings: Settings = serde_json::from_str(r#"{"log_file": null}"#).unwrap();

        assert_eq!(settings.log_file, None);
    }

    #[test]
    fn test_load_settings_and_reload_room_from_file() {
        let file = config_file(FULL_CONFIG);

        let settings = Settings::load(file.path()).unwrap();
        let reloaded = FileConfigSource::new(file.path().to_owned()).load().unwrap();

        assert_eq!(reloaded, settings.room);
    }

    #[test]
    fn test_reload_from_corrupt_file() {
        let file = config_file(r#"{"station_configs": {"#);

        let result = FileConfigSource::new(file.path().to_owned()).load();
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_reload_from_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");

        let result = FileConfigSource::new(path.clone()).load();
        match result {
            Err(ConfigError::Read { path: error_path, .. }) => assert_eq!(error_path, path),
            other => panic!("Expected a read error, got {other:?}"),
        }
        assert!(matches!(Settings::load(&path), Err(ConfigError::Read { .. })));
    }
}
