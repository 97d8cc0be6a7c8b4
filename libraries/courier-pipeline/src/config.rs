/// Pipeline configuration
use crate::error::{PipelineError, Result};
use courier_assets::{MatcherKind, MIN_COVER_PX};
use courier_delivery::{DeliverySettings, FtpSettings};
use courier_ern::DocumentProfile;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Read from the working directory when no file is given
pub const DEFAULT_CONFIG_FILE: &str = "courier.toml";

pub const DEFAULT_SCHEMA_LOCATION: &str = "http://ddex.net/xml/ern/383/release-notification.xsd";

const ENV_PREFIX: &str = "COURIER";

/// Deployment variables from before the `COURIER__` scheme, and their keys
const LEGACY_VARIABLES: &[(&str, &str)] = &[
    ("FTP_SERVER", "delivery.host"),
    ("FTP_USERNAME", "delivery.username"),
    ("FTP_PASSWORD", "delivery.password"),
    ("LOCAL_DIR", "paths.local_dir"),
    ("SCHEMA_FILE", "schema.location"),
];

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CourierConfig {
    #[serde(default = "default_paths")]
    pub paths: PathSettings,

    #[serde(default = "default_assets")]
    pub assets: AssetSettings,

    #[serde(default)]
    pub document: DocumentProfile,

    #[serde(default = "default_schema")]
    pub schema: SchemaSettings,

    #[serde(default = "default_delivery")]
    pub delivery: DeliverySection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathSettings {
    /// Root holding the `AUDIO`, `WAV` and `IMAGES` source folders
    #[serde(default = "default_local_dir")]
    pub local_dir: PathBuf,

    /// Parent of every project's batch folders
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Release spreadsheet; `<local_dir>/choir.xlsx` when unset
    #[serde(default)]
    pub input_file: Option<PathBuf>,

    #[serde(default)]
    pub audio_dir: Option<PathBuf>,

    #[serde(default)]
    pub wav_dir: Option<PathBuf>,

    #[serde(default)]
    pub image_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssetSettings {
    #[serde(default = "default_min_cover_px")]
    pub min_cover_px: u32,

    #[serde(default)]
    pub matcher: MatcherKind,

    /// Similarity percentage for the fuzzy matcher
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: u8,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaSettings {
    /// Local path or `http(s)` URL of the release notification schema
    #[serde(default = "default_schema_location")]
    pub location: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryTarget {
    #[default]
    Ftp,
    Local,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliverySection {
    #[serde(default)]
    pub target: DeliveryTarget,

    #[serde(default)]
    pub host: String,

    #[serde(default = "default_ftp_port")]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    /// Mirror directory for the `local` target; `<output_dir>/outbox` when unset
    #[serde(default)]
    pub local_root: Option<PathBuf>,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,

    #[serde(default)]
    pub verify_content_hash: bool,

    /// Ask the caller before anything is uploaded
    #[serde(default = "default_require_confirmation")]
    pub require_confirmation: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CourierConfig {
    fn default() -> Self {
        Self {
            paths: default_paths(),
            assets: default_assets(),
            document: DocumentProfile::default(),
            schema: default_schema(),
            delivery: default_delivery(),
        }
    }
}

impl CourierConfig {
    /// Load `.env`, then layer defaults, the config file and the environment
    ///
    /// Without `path`, `courier.toml` is read if it exists. Environment
    /// variables use `COURIER__<SECTION>__<KEY>`; the legacy `FTP_SERVER`,
    /// `FTP_USERNAME`, `FTP_PASSWORD`, `LOCAL_DIR` and `SCHEMA_FILE` win over
    /// everything else.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Ok(env_file) = dotenvy::dotenv() {
            tracing::debug!(file = %env_file.display(), "Loaded environment file");
        }
        Self::load_with_env(path, std::env::vars().collect())
    }

    /// Same as [`load`](Self::load) with an explicit environment
    pub fn load_with_env(path: Option<&Path>, env: HashMap<String, String>) -> Result<Self> {
        let mut settings = config::Config::builder();

        match path {
            Some(path) => {
                settings = settings.add_source(config::File::from(path).required(true));
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    settings = settings.add_source(config::File::from(default_path));
                }
            }
        }

        settings = settings.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true)
                .source(Some(env.clone().into_iter().collect())),
        );

        for (variable, key) in LEGACY_VARIABLES {
            if let Some(value) = env.get(*variable).filter(|v| !v.trim().is_empty()) {
                settings = settings.set_override(*key, value.as_str())?;
            }
        }

        Ok(settings.build()?.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.delivery.target == DeliveryTarget::Ftp && self.delivery.host.trim().is_empty() {
            return Err(PipelineError::invalid_config(
                "FTP host is required (set FTP_SERVER or COURIER__DELIVERY__HOST)",
            ));
        }

        if self.delivery.max_retries == 0 {
            return Err(PipelineError::invalid_config(
                "delivery.max_retries must be at least 1",
            ));
        }

        if self.assets.min_cover_px == 0 {
            return Err(PipelineError::invalid_config(
                "assets.min_cover_px must be greater than 0",
            ));
        }

        if self.assets.fuzzy_threshold > 100 {
            return Err(PipelineError::invalid_config(
                "assets.fuzzy_threshold is a percentage (0-100)",
            ));
        }

        let location = self.schema.location.trim();
        if location.is_empty() {
            return Err(PipelineError::invalid_config("schema.location is required"));
        }
        if location.starts_with("http://") || location.starts_with("https://") {
            url::Url::parse(location).map_err(|e| {
                PipelineError::invalid_config(format!("schema.location is not a valid URL: {e}"))
            })?;
        }

        Ok(())
    }
}

impl PathSettings {
    pub fn input_file(&self) -> PathBuf {
        self.input_file
            .clone()
            .unwrap_or_else(|| self.local_dir.join("choir.xlsx"))
    }

    pub fn audio_dir(&self) -> PathBuf {
        self.audio_dir
            .clone()
            .unwrap_or_else(|| self.local_dir.join("AUDIO"))
    }

    pub fn wav_dir(&self) -> PathBuf {
        self.wav_dir
            .clone()
            .unwrap_or_else(|| self.local_dir.join("WAV"))
    }

    pub fn image_dir(&self) -> PathBuf {
        self.image_dir
            .clone()
            .unwrap_or_else(|| self.local_dir.join("IMAGES"))
    }

    /// `<output_dir>/<project>`, or `output_dir` itself for an empty name
    pub fn project_root(&self, project: &str) -> PathBuf {
        let project = project.trim();
        if project.is_empty() {
            self.output_dir.clone()
        } else {
            self.output_dir
                .join(courier_core::naming::sanitize_component(project))
        }
    }
}

impl SchemaSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl DeliverySection {
    pub fn settings(&self) -> DeliverySettings {
        DeliverySettings {
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
            verify_content_hash: self.verify_content_hash,
        }
    }

    pub fn ftp(&self) -> FtpSettings {
        FtpSettings {
            host: self.host.trim().to_string(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }

    pub fn local_root(&self, paths: &PathSettings) -> PathBuf {
        self.local_root
            .clone()
            .unwrap_or_else(|| paths.output_dir.join("outbox"))
    }
}

// Default values
fn default_paths() -> PathSettings {
    PathSettings {
        local_dir: default_local_dir(),
        output_dir: default_output_dir(),
        input_file: None,
        audio_dir: None,
        wav_dir: None,
        image_dir: None,
    }
}

fn default_local_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./DDEX")
}

fn default_assets() -> AssetSettings {
    AssetSettings {
        min_cover_px: default_min_cover_px(),
        matcher: MatcherKind::default(),
        fuzzy_threshold: default_fuzzy_threshold(),
    }
}

fn default_min_cover_px() -> u32 {
    MIN_COVER_PX
}

fn default_fuzzy_threshold() -> u8 {
    85
}

fn default_schema() -> SchemaSettings {
    SchemaSettings {
        location: default_schema_location(),
        timeout_secs: default_timeout_secs(),
    }
}

fn default_schema_location() -> String {
    DEFAULT_SCHEMA_LOCATION.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_delivery() -> DeliverySection {
    DeliverySection {
        target: DeliveryTarget::default(),
        host: String::new(),
        port: default_ftp_port(),
        username: String::new(),
        password: String::new(),
        local_root: None,
        max_retries: default_max_retries(),
        retry_delay_secs: default_retry_delay_secs(),
        verify_content_hash: false,
        require_confirmation: default_require_confirmation(),
        timeout_secs: default_timeout_secs(),
    }
}

fn default_ftp_port() -> u16 {
    21
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_secs() -> u64 {
    5
}

fn default_require_confirmation() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let config = CourierConfig::load_with_env(None, HashMap::new()).unwrap();

        assert_eq!(config.delivery.max_retries, 3);
        assert_eq!(config.delivery.retry_delay_secs, 5);
        assert!(config.delivery.require_confirmation);
        assert!(!config.delivery.verify_content_hash);
        assert_eq!(config.assets.min_cover_px, 800);
        assert_eq!(config.schema.location, DEFAULT_SCHEMA_LOCATION);
        assert_eq!(config.document.recipient_name, "Boomplay");
        assert_eq!(config.paths.input_file(), PathBuf::from("./choir.xlsx"));
    }

    #[test]
    fn test_file_then_env_then_legacy() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("courier.toml");
        std::fs::write(
            &path,
            r#"
[paths]
local_dir = "/srv/media"

[delivery]
host = "ftp.from-file.example"
port = 2121
max_retries = 5

[document]
recipient_name = "Other DSP"
"#,
        )
        .unwrap();

        let config = CourierConfig::load_with_env(
            Some(&path),
            env(&[
                ("COURIER__DELIVERY__MAX_RETRIES", "7"),
                ("COURIER__DELIVERY__HOST", "ftp.from-env.example"),
                ("FTP_SERVER", "ftp.legacy.example"),
                ("FTP_PASSWORD", "secret"),
            ]),
        )
        .unwrap();

        assert_eq!(config.paths.local_dir, PathBuf::from("/srv/media"));
        assert_eq!(config.delivery.port, 2121);
        assert_eq!(config.delivery.max_retries, 7);
        assert_eq!(config.delivery.host, "ftp.legacy.example");
        assert_eq!(config.delivery.password, "secret");
        assert_eq!(config.document.recipient_name, "Other DSP");
        assert_eq!(config.document.sender_name, "Mkononi Limited");
    }

    #[test]
    fn test_blank_legacy_variable_is_ignored() {
        let config = CourierConfig::load_with_env(
            None,
            env(&[("COURIER__DELIVERY__HOST", "ftp.example"), ("FTP_SERVER", " ")]),
        )
        .unwrap();
        assert_eq!(config.delivery.host, "ftp.example");
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let temp = TempDir::new().unwrap();
        let result =
            CourierConfig::load_with_env(Some(&temp.path().join("absent.toml")), HashMap::new());
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_validate() {
        let mut config = CourierConfig::default();
        assert!(config.validate().is_err(), "FTP target without host");

        config.delivery.host = "ftp.example".to_string();
        assert!(config.validate().is_ok());

        config.delivery.max_retries = 0;
        assert!(config.validate().is_err());
        config.delivery.max_retries = 3;

        config.assets.min_cover_px = 0;
        assert!(config.validate().is_err());
        config.assets.min_cover_px = 800;

        config.schema.location = "http://".to_string();
        assert!(config.validate().is_err());

        config.schema.location = "schemas/release-notification.xsd".to_string();
        config.delivery.target = DeliveryTarget::Local;
        config.delivery.host.clear();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_project_root() {
        let mut paths = default_paths();
        paths.output_dir = PathBuf::from("/home/ops/DDEX");

        assert_eq!(paths.project_root("Choir"), PathBuf::from("/home/ops/DDEX/Choir"));
        assert_eq!(paths.project_root("  "), PathBuf::from("/home/ops/DDEX"));
    }

    #[test]
    fn test_delivery_settings() {
        let mut section = default_delivery();
        section.retry_delay_secs = 2;
        section.verify_content_hash = true;

        let settings = section.settings();
        assert_eq!(settings.retry_delay, Duration::from_secs(2));
        assert!(settings.verify_content_hash);
        assert_eq!(section.ftp().port, 21);
    }
}
