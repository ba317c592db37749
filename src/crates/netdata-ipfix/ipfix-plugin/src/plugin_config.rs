use crate::netdata_env::NetdataEnv;
use anyhow::{Context, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "ipfix.yaml";

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|e| {
        format!(
            "invalid duration '{}' (examples: '10s', '1m', '1h'): {}",
            value, e
        )
    })
}

#[derive(Debug, Parser, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub(crate) struct ListenerConfig {
    #[arg(long = "ipfix-listen", default_value = "0.0.0.0:4739")]
    pub(crate) listen: String,

    #[arg(long = "ipfix-max-packet-size", default_value_t = 65535)]
    pub(crate) max_packet_size: usize,

    #[arg(
        long = "ipfix-stats-interval",
        default_value = "60s",
        value_parser = parse_duration
    )]
    #[serde(with = "humantime_serde")]
    pub(crate) stats_interval: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:4739".to_string(),
            max_packet_size: 65535,
            stats_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Parser, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub(crate) struct DecoderConfig {
    /// Data sets kept while waiting for their template (0 keeps all)
    #[arg(long = "ipfix-max-pending-sets", default_value_t = 0)]
    pub(crate) max_pending_sets: usize,
}

#[derive(Debug, Parser, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub(crate) struct OutputConfig {
    /// File receiving one JSON record per line, `-` for stdout
    #[arg(long = "ipfix-output", default_value = "-")]
    pub(crate) path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "-".to_string(),
        }
    }
}

#[derive(Debug, Parser, Clone, Default, Serialize, Deserialize)]
#[command(name = "ipfix-plugin")]
#[command(about = "IPFIX collector emitting decoded flow records as JSON lines")]
#[command(version = "0.1")]
#[serde(deny_unknown_fields)]
pub(crate) struct PluginConfig {
    #[command(flatten)]
    #[serde(default, rename = "listener")]
    pub(crate) listener: ListenerConfig,

    #[command(flatten)]
    #[serde(default, rename = "decoder")]
    pub(crate) decoder: DecoderConfig,

    #[command(flatten)]
    #[serde(default, rename = "output")]
    pub(crate) output: OutputConfig,

    #[arg(hide = true, help = "Collection interval in seconds (ignored)")]
    #[serde(skip)]
    pub(crate) _update_frequency: Option<u32>,
}

impl PluginConfig {
    pub(crate) fn new() -> Result<Self> {
        let netdata_env = NetdataEnv::from_environment();

        let cfg = if netdata_env.running_under_netdata() {
            Self::load_from_netdata_config(&netdata_env)?
        } else {
            Self::parse()
        };

        cfg.validate()?;
        Ok(cfg)
    }

    fn load_from_netdata_config(netdata_env: &NetdataEnv) -> Result<Self> {
        let candidates = [
            netdata_env
                .user_config_dir
                .as_ref()
                .map(|p| p.join(CONFIG_FILE_NAME)),
            netdata_env
                .stock_config_dir
                .as_ref()
                .map(|p| p.join(CONFIG_FILE_NAME)),
        ];

        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                tracing::info!("loading configuration from {}", path.display());
                return Self::from_yaml_file(&path).with_context(|| {
                    format!("failed to load ipfix config from {}", path.display())
                });
            }
        }

        Ok(Self::default())
    }

    fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    fn from_yaml_str(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str::<Self>(content)?)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.listener.max_packet_size == 0 {
            anyhow::bail!("listener.max_packet_size must be greater than 0");
        }
        if self.listener.stats_interval.is_zero() {
            anyhow::bail!("listener.stats_interval must be greater than 0");
        }

        self.listener
            .listen
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid listener address: {}", self.listener.listen))?;

        if self.output.path.trim().is_empty() {
            anyhow::bail!("output.path must not be empty");
        }
        Ok(())
    }
}
