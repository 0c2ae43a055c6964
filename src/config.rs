use serde::Deserialize;

/// Config file used when `CONFIG_FILE` is not set. Optional.
pub const DEFAULT_CONFIG_PATH: &str = "netperf.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub reporter: ReporterConfig,
    pub host: HostConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReporterConfig {
    /// Prefix of the generated trace session name (`{prefix}-{pid}-{n}`).
    pub session_prefix: String,
    /// Reads closer together than this are divided by this interval instead.
    pub min_window_ms: u64,
}

impl Default for ReporterConfig {
    fn default() -> Self {
        Self {
            session_prefix: crate::reporter::DEFAULT_SESSION_PREFIX.into(),
            min_window_ms: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Received bytes/second only, one number per line.
    #[default]
    Plain,
    /// Full snapshot as a JSON line.
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub poll_interval_secs: u64,
    /// Process to monitor. When absent the host reads it from stdin.
    pub target_pid: Option<u32>,
    pub output: OutputFormat,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            target_pid: None,
            output: OutputFormat::Plain,
        }
    }
}

impl AppConfig {
    /// Loads `CONFIG_FILE`, or `netperf.toml` if present, else defaults.
    pub fn load() -> anyhow::Result<Self> {
        match std::env::var("CONFIG_FILE") {
            Ok(path) => {
                let s = std::fs::read_to_string(&path)
                    .map_err(|e| anyhow::anyhow!("reading {}: {}", path, e))?;
                Self::load_from_str(&s)
            }
            Err(_) => match std::fs::read_to_string(DEFAULT_CONFIG_PATH) {
                Ok(s) => Self::load_from_str(&s),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
                Err(e) => Err(anyhow::anyhow!("reading {}: {}", DEFAULT_CONFIG_PATH, e)),
            },
        }
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            !self.reporter.session_prefix.trim().is_empty(),
            "reporter.session_prefix must be non-empty"
        );
        anyhow::ensure!(
            self.reporter.min_window_ms > 0,
            "reporter.min_window_ms must be > 0, got {}",
            self.reporter.min_window_ms
        );
        anyhow::ensure!(
            self.host.poll_interval_secs > 0,
            "host.poll_interval_secs must be > 0, got {}",
            self.host.poll_interval_secs
        );
        Ok(())
    }
}
