use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, warn};
use serde::{Deserialize, Deserializer};

pub const CONFIG_FILE: &str = ".flickr_download";

/// Default values for command line flags, read from `~/.flickr_download`.
///
/// Keys are the long flag names:
///
/// ```yaml
/// api_key: 0123456789abcdef
/// api_secret: fedcba9876
/// user_id: 12345678@N00
/// naming: timestamp_and_title_and_id
/// ```
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigDefaults {
    #[serde(deserialize_with = "scalar_string")]
    pub api_key: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub api_secret: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub user_id: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub set_id: Option<String>,
    #[serde(deserialize_with = "scalar_string")]
    pub naming: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub no_fast_forward: Option<bool>,
}

impl ConfigDefaults {
    pub fn from_yaml(contents: &str) -> Result<ConfigDefaults, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(ConfigDefaults::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Reads the defaults file. A missing, unreadable or broken file yields
    /// empty defaults.
    pub fn load(path: &Path) -> ConfigDefaults {
        debug!("Loading configuration from {}", path.display());

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No config file");
                return ConfigDefaults::default();
            }
            Err(e) => {
                warn!("Could not open configuration file: {e}");
                return ConfigDefaults::default();
            }
        };

        match ConfigDefaults::from_yaml(&contents) {
            Ok(defaults) => defaults,
            Err(e) => {
                warn!("Could not parse configuration file: {e}");
                ConfigDefaults::default()
            }
        }
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE))
}

/// Keys and ids made only of digits come out of YAML as numbers.
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        String(String),
        Integer(i64),
        Float(f64),
        Bool(bool),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|scalar| match scalar {
        Scalar::String(s) => s,
        Scalar::Integer(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
        Scalar::Bool(b) => b.to_string(),
    }))
}
