use std::env;
use std::path::PathBuf;

/// Directories and identifiers netdata passes to its external plugins.
#[derive(Debug, Clone, Default)]
pub(crate) struct NetdataEnv {
    pub(crate) user_config_dir: Option<PathBuf>,
    pub(crate) stock_config_dir: Option<PathBuf>,
    pub(crate) plugins_dir: Option<PathBuf>,
    pub(crate) invocation_id: Option<String>,
}

impl NetdataEnv {
    pub(crate) fn from_environment() -> Self {
        Self {
            user_config_dir: env::var("NETDATA_USER_CONFIG_DIR").ok().map(PathBuf::from),
            stock_config_dir: env::var("NETDATA_STOCK_CONFIG_DIR").ok().map(PathBuf::from),
            plugins_dir: env::var("NETDATA_PLUGINS_DIR").ok().map(PathBuf::from),
            invocation_id: env::var("NETDATA_INVOCATION_ID").ok(),
        }
    }

    pub(crate) fn running_under_netdata(&self) -> bool {
        self.user_config_dir.is_some()
            || self.stock_config_dir.is_some()
            || self.plugins_dir.is_some()
            || self.invocation_id.is_some()
    }
}
