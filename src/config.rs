//! Daemon configuration.
//!
//! Priority: CLI flag / env var  >  `{data_dir}/config.toml`  >  built-in
//! default. The TOML file is optional; a file that fails to parse is logged
//! and ignored rather than stopping the daemon.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::error;

const DEFAULT_PORT: u16 = 5002;
// The NFC reader posts from elsewhere on the LAN, so bind wide by default.
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
const DEFAULT_DATA_DIR: &str = "data";

// ─── HardwareConfig ───────────────────────────────────────────────────────────

/// LED wiring (`[hardware]` in config.toml).
///
/// `led_pins` lists one `[r, g, b]` BCM pin triplet per task index: the
/// first triplet shows task 1, the second task 2, and so on. Tasks beyond
/// the wired LEDs are tracked normally, just not lit.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HardwareConfig {
    /// Set false to skip GPIO probing entirely.
    pub enabled: bool,
    pub led_pins: Vec<(u8, u8, u8)>,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig {
            enabled: true,
            led_pins: vec![(17, 27, 22), (23, 24, 25)],
        }
    }
}

// ─── TOML config file ─────────────────────────────────────────────────────────

/// `{data_dir}/config.toml` — all fields are optional overrides.
#[derive(Deserialize, Default)]
struct TomlConfig {
    /// HTTP API port (default: 5002).
    port: Option<u16>,
    /// Bind address (default: "0.0.0.0"; use "127.0.0.1" to go local-only).
    bind_address: Option<String>,
    /// Log level filter string, e.g. "debug", "info,tagboard=trace" (default: "info").
    log: Option<String>,
    /// Log output format: "pretty" (default) | "json".
    log_format: Option<String>,
    /// Bearer token for the API. Omit to disable auth.
    auth_token: Option<String>,
    /// Allow the /api/nfc/* endpoints without a token (default: false).
    nfc_public: Option<bool>,
    /// LED wiring (`[hardware]`).
    hardware: Option<HardwareConfig>,
}

fn load_toml(data_dir: &Path) -> Option<TomlConfig> {
    let path = data_dir.join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    match toml::from_str::<TomlConfig>(&contents) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            error!(path = %path.display(), err = %e, "failed to parse config.toml — using defaults");
            None
        }
    }
}

// ─── DaemonConfig ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub port: u16,
    pub bind_address: String,
    pub data_dir: PathBuf,
    pub log: String,
    pub log_format: String,
    /// `None` disables the bearer check entirely.
    pub auth_token: Option<String>,
    /// NFC endpoints skip auth when set (the reader can't hold a secret).
    pub nfc_public: bool,
    pub hardware: HardwareConfig,
}

impl DaemonConfig {
    pub fn new(
        port: Option<u16>,
        data_dir: Option<PathBuf>,
        log: Option<String>,
        bind_address: Option<String>,
        auth_token: Option<String>,
    ) -> Self {
        let data_dir = data_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let toml_cfg = load_toml(&data_dir).unwrap_or_default();

        let nfc_public_env = std::env::var("TAGBOARD_NFC_PUBLIC")
            .ok()
            .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE" | "True"));
        let log_format_env = std::env::var("TAGBOARD_LOG_FORMAT").ok();

        DaemonConfig {
            port: port.or(toml_cfg.port).unwrap_or(DEFAULT_PORT),
            bind_address: bind_address
                .or(toml_cfg.bind_address)
                .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string()),
            log: log.or(toml_cfg.log).unwrap_or_else(|| "info".to_string()),
            log_format: log_format_env
                .or(toml_cfg.log_format)
                .unwrap_or_else(|| "pretty".to_string()),
            auth_token: auth_token.or(toml_cfg.auth_token).filter(|t| !t.is_empty()),
            nfc_public: nfc_public_env.or(toml_cfg.nfc_public).unwrap_or(false),
            hardware: toml_cfg.hardware.unwrap_or_default(),
            data_dir,
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
