//! Persistent application configuration model and defaults.

use std::path::{Path, PathBuf};

use log::{info, warn};

const APP_DIR_NAME: &str = "termplay";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Playback engine timing and volume preferences.
    pub playback: PlaybackConfig,
    #[serde(default)]
    /// Media library scanning preferences.
    pub library: LibraryConfig,
    #[serde(default)]
    /// Playlist storage location.
    pub playlists: PlaylistsConfig,
    #[serde(default)]
    /// Serial hardware controller settings.
    pub hardware: HardwareConfig,
    #[serde(default)]
    /// Audio output device preferences.
    pub output: OutputConfig,
}

/// Playback worker timing and volume preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_view_refresh_interval_ms")]
    pub view_refresh_interval_ms: u64,
    #[serde(default = "default_initial_volume")]
    pub initial_volume: i32,
    #[serde(default = "default_volume_step")]
    pub volume_step: i32,
    /// How long a flash message stays on the status line.
    #[serde(default = "default_flash_duration_ms")]
    pub flash_duration_ms: u64,
}

/// Library scanning preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LibraryConfig {
    #[serde(default)]
    pub initial_directory: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub recursive_scan: bool,
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,
    /// Read tags while scanning. When disabled only file names are shown.
    #[serde(default = "default_true")]
    pub read_tags: bool,
}

#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PlaylistsConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
}

/// Serial link to the external transport controller.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct HardwareConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_serial_port")]
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_terminator")]
    pub terminator: char,
}

/// Output device and format preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub output_device_name: String,
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: u32,
    #[serde(default = "default_channel_count")]
    pub channel_count: u16,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_view_refresh_interval_ms() -> u64 {
    500
}

fn default_initial_volume() -> i32 {
    80
}

fn default_volume_step() -> i32 {
    5
}

fn default_flash_duration_ms() -> u64 {
    800
}

fn default_items_per_page() -> usize {
    25
}

fn default_serial_port() -> String {
    "/dev/ttyACM0".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_read_timeout_ms() -> u64 {
    200
}

fn default_terminator() -> char {
    '.'
}

fn default_sample_rate_hz() -> u32 {
    48_000
}

fn default_channel_count() -> u16 {
    2
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            view_refresh_interval_ms: default_view_refresh_interval_ms(),
            initial_volume: default_initial_volume(),
            volume_step: default_volume_step(),
            flash_duration_ms: default_flash_duration_ms(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            initial_directory: None,
            recursive_scan: true,
            items_per_page: default_items_per_page(),
            read_tags: true,
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            terminator: default_terminator(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_device_name: String::new(),
            sample_rate_hz: default_sample_rate_hz(),
            channel_count: default_channel_count(),
        }
    }
}

impl OutputConfig {
    /// Returns the explicitly requested device, or `None` for the system default.
    pub fn requested_device_name(&self) -> Option<String> {
        canonicalize_requested_device_name(&self.output_device_name)
    }
}

impl PlaylistsConfig {
    pub fn resolved_directory(&self) -> PathBuf {
        self.directory.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_DIR_NAME)
                .join("playlists")
        })
    }
}

fn canonicalize_requested_device_name(device_name: &str) -> Option<String> {
    let trimmed = device_name.trim();
    if trimmed.is_empty() {
        return None;
    }
    let normalized = trimmed.to_ascii_lowercase();
    if normalized == "default"
        || normalized == "sysdefault"
        || normalized.starts_with("sysdefault:")
    {
        return None;
    }
    Some(trimmed.to_string())
}

/// Clamps loaded values into their supported ranges.
pub fn sanitize_config(config: Config) -> Config {
    let terminator = if config.hardware.terminator.is_control() {
        default_terminator()
    } else {
        config.hardware.terminator
    };

    Config {
        playback: PlaybackConfig {
            poll_interval_ms: config.playback.poll_interval_ms.clamp(20, 5_000),
            view_refresh_interval_ms: config.playback.view_refresh_interval_ms.clamp(50, 5_000),
            initial_volume: config.playback.initial_volume.clamp(0, 100),
            volume_step: config.playback.volume_step.clamp(1, 50),
            flash_duration_ms: config.playback.flash_duration_ms.min(10_000),
        },
        library: LibraryConfig {
            items_per_page: config.library.items_per_page.clamp(5, 200),
            ..config.library
        },
        playlists: config.playlists,
        hardware: HardwareConfig {
            baud_rate: config.hardware.baud_rate.max(300),
            read_timeout_ms: config.hardware.read_timeout_ms.clamp(10, 2_000),
            terminator,
            ..config.hardware
        },
        output: OutputConfig {
            sample_rate_hz: config.output.sample_rate_hz.clamp(8_000, 192_000),
            channel_count: config.output.channel_count.clamp(1, 8),
            ..config.output
        },
    }
}

/// Default location of `config.toml`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR_NAME)
        .join(CONFIG_FILE_NAME)
}

/// Loads the config file, writing the defaults first when it does not exist.
pub fn load_or_create(config_file: &Path) -> crate::error::Result<Config> {
    if !config_file.exists() {
        let default_config = sanitize_config(Config::default());
        info!(
            "Config file not found. Creating default config. path={}",
            config_file.display()
        );
        if let Some(parent) = config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let serialized = toml::to_string(&default_config)
            .map_err(|error| crate::error::Error::Config(error.to_string()))?;
        std::fs::write(config_file, serialized)?;
        return Ok(default_config);
    }

    let config_content = std::fs::read_to_string(config_file)?;
    let config = match toml::from_str::<Config>(&config_content) {
        Ok(config) => config,
        Err(error) => {
            warn!(
                "Config: failed to parse {}, using defaults: {}",
                config_file.display(),
                error
            );
            Config::default()
        }
    };
    Ok(sanitize_config(config))
}
