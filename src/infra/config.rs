use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid argument: {0}")]
    Argument(#[from] pico_args::Error),

    #[error("base url must start with http:// or https://, got {0:?}")]
    BaseUrl(String),

    #[error("unexpected arguments: {0:?}")]
    Unexpected(Vec<OsString>),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub base_url: String,
    pub manifest_path: String,
    pub asset_root: String,
    pub loading_delay: Duration,
    pub download_dir: PathBuf,
    pub check_only: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            manifest_path: "js/figurinhas.json".to_string(),
            asset_root: "assets".to_string(),
            loading_delay: Duration::from_millis(300),
            download_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from("downloads")),
            check_only: false,
        }
    }
}

impl AppConfig {
    pub fn from_args(mut args: pico_args::Arguments) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let check_only = args.contains("--check");
        let base_url: String = args
            .opt_value_from_str("--base-url")?
            .unwrap_or(defaults.base_url);
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::BaseUrl(base_url));
        }

        let config = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            manifest_path: args
                .opt_value_from_str("--manifest")?
                .unwrap_or(defaults.manifest_path),
            asset_root: args
                .opt_value_from_str::<_, String>("--asset-root")?
                .map(|root| root.trim_matches('/').to_string())
                .unwrap_or(defaults.asset_root),
            loading_delay: args
                .opt_value_from_str("--delay-ms")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.loading_delay),
            download_dir: args
                .opt_value_from_str("--download-dir")?
                .unwrap_or(defaults.download_dir),
            check_only,
        };

        let rest = args.finish();
        if !rest.is_empty() {
            return Err(ConfigError::Unexpected(rest));
        }

        Ok(config)
    }

    pub fn manifest_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url,
            self.manifest_path.trim_start_matches('/')
        )
    }
}
