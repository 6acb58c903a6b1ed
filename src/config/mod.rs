//! Emulator configuration.
//!
//! Two distinct things live here and should not be confused:
//!
//! - [`Config`] — how the emulator *process* runs (bind address, session
//!   timeout, simulation knobs). Loaded from a TOML file, everything
//!   defaulted so `plume` starts with no file at all.
//! - the *device document* — the nested JSON configuration the emulated
//!   device exposes over `/api/config`. It starts from board defaults and
//!   is mutated by validated partial updates (deep merge).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

/// Operating mode, fixed at process start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingMode {
    /// First-time setup: no network identity, auth bypassed, captive-portal
    /// style serving.
    Provisioning,
    /// Full API surface, private paths require a session.
    Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub session: SessionConfig,
    pub simulation: SimulationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            session: SessionConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub timeout_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: crate::session::store::DEFAULT_TIMEOUT_SECS,
            sweep_interval_secs: crate::session::store::DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

/// Knobs for the simulated long operations and the canned WiFi world.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub wifi_test_delay_ms: u64,
    pub broker_test_delay_ms: u64,
    pub scan_delay_ms: u64,
    /// Outcome switch for `/api/test-mqtt`.
    pub broker_reachable: bool,
    pub networks: Vec<WifiNetwork>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            wifi_test_delay_ms: 1500,
            broker_test_delay_ms: 800,
            scan_delay_ms: 250,
            broker_reachable: true,
            networks: vec![
                WifiNetwork { ssid: "Hearth".into(), rssi: -48, secured: true },
                WifiNetwork { ssid: "Hearth-Guest".into(), rssi: -61, secured: true },
                WifiNetwork { ssid: "CoffeeShack".into(), rssi: -74, secured: false },
                WifiNetwork { ssid: "PrinterNet".into(), rssi: -86, secured: true },
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WifiNetwork {
    pub ssid: String,
    pub rssi: i32,
    #[serde(default)]
    pub secured: bool,
}

impl Config {
    /// Load from a TOML file, or fall back to defaults when no path is
    /// given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                toml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))
            }
        }
    }
}

/// The device document a freshly provisioned board reports: board defaults
/// for pins and buttons, everything else blank or off.
pub fn default_device_document() -> Value {
    json!({
        "device": {
            "owner": "Developer",
            "timezone": "Europe/London",
            "printerTxPin": 21,
            "printerRxPin": -1,
            "printerDtrPin": -1,
        },
        "wifi": {
            "ssid": "Hearth",
            "password": "",
        },
        "mqtt": {
            "enabled": false,
            "server": "",
            "port": 1883,
            "username": "",
            "password": "",
        },
        "autoInk": {
            "enabled": false,
            "startHour": 9,
            "endHour": 17,
            "frequencyMinutes": 60,
            "prompt": "Print something short and delightful.",
            "apiToken": "",
        },
        "buttons": {
            "button1": { "gpio": 5, "shortAction": "JOKE", "longAction": "", "shortLedEffect": "chase_single", "longLedEffect": "pulse", "shortMqttTopic": "", "longMqttTopic": "" },
            "button2": { "gpio": 6, "shortAction": "RIDDLE", "longAction": "", "shortLedEffect": "chase_single", "longLedEffect": "pulse", "shortMqttTopic": "", "longMqttTopic": "" },
            "button3": { "gpio": 7, "shortAction": "QUOTE", "longAction": "", "shortLedEffect": "chase_single", "longLedEffect": "pulse", "shortMqttTopic": "", "longMqttTopic": "" },
            "button4": { "gpio": 4, "shortAction": "QUIZ", "longAction": "", "shortLedEffect": "chase_single", "longLedEffect": "pulse", "shortMqttTopic": "", "longMqttTopic": "" },
        },
        "leds": {
            "pin": 20,
            "count": 30,
            "brightness": 128,
            "refreshRate": 60,
        },
    })
}

/// Deep-merge `update` into `target`: objects merge recursively, scalars
/// and arrays replace. Keys absent from the update keep their value — the
/// partial-update contract.
pub fn merge_update(target: &mut Value, update: &Value) {
    match (target, update) {
        (Value::Object(target_map), Value::Object(update_map)) => {
            for (key, value) in update_map {
                match target_map.get_mut(key) {
                    Some(existing) => merge_update(existing, value),
                    None => {
                        target_map.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (target, update) => *target = update.clone(),
    }
}
