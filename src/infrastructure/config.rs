use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EngineConfig {
    pub server: ServerSettings,
    pub chart: ChartSettings,
    pub live: LiveSettings,
    pub device: DeviceSettings,
    pub simulator: SimulatorSettings,
    /// Sync ranges offered to the user, in minutes
    pub sync_presets: Vec<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            chart: ChartSettings::default(),
            live: LiveSettings::default(),
            device: DeviceSettings::default(),
            simulator: SimulatorSettings::default(),
            sync_presets: vec![1, 10, 60, 360, 720, 1440],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChartSettings {
    pub max_points: usize,
    pub label_count: usize,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            max_points: 600,
            label_count: 6,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LiveSettings {
    pub window_capacity: usize,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self { window_capacity: 30 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DeviceSettings {
    pub name: String,
    pub auto_connect: bool,
    /// Upper bound on a single command write
    pub command_timeout_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            name: "Rejestrator Aktywnosci".to_string(),
            auto_connect: true,
            command_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Lines the recorder writes to its card per minute (one per 200 ms)
    pub records_per_minute: u32,
    pub live_interval_ms: u64,
    /// Delay between history notifications; 0 sends back to back
    pub history_pacing_ms: u64,
    /// How much card history exists when the device powers on
    pub history_minutes: u32,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            records_per_minute: 300,
            live_interval_ms: 200,
            history_pacing_ms: 30,
            history_minutes: 1440,
        }
    }
}

/// Load `config/engine.*` if present, then `HOLTER__*` environment overrides
pub fn load_engine_config() -> anyhow::Result<EngineConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/engine").required(false))
        .add_source(
            config::Environment::with_prefix("HOLTER")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
