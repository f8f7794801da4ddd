use std::path::Path;

use chrono_tz::Tz;
use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Override file looked up in the working directory
pub const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_SOURCE_URL: &str = "https://ala.powerschool.com/guardian/myschedule.html";
pub const DEFAULT_TIMEZONE: &str = "Africa/Johannesburg";
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Page opened in the browser
    pub source_url: String,
    /// IANA name of the timezone of the school
    pub timezone: String,
    /// WebDriver server driving the browser
    pub webdriver_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_url: DEFAULT_SOURCE_URL.to_owned(),
            timezone: DEFAULT_TIMEZONE.to_owned(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_owned(),
        }
    }
}

/// What the user wrote, every field is optional
#[derive(Debug, Default, Deserialize)]
struct Overrides {
    source_url: Option<String>,
    timezone: Option<String>,
    webdriver_url: Option<String>,
}

/// Outcome of reading the override file
#[derive(Debug)]
pub struct Loaded {
    pub config: Config,
    /// Expected names absent from the file
    pub missing: Vec<&'static str>,
}

impl Config {
    /// Read the override file if there is one, defaults otherwise
    pub fn load(path: &Path) -> Result<Option<Loaded>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map(Some)
    }

    /// Apply the overrides of a TOML document on top of the defaults
    pub fn from_toml(content: &str) -> Result<Loaded> {
        let overrides: Overrides =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;

        let mut missing = Vec::new();
        if overrides.source_url.is_none() {
            missing.push("source_url");
        }
        if overrides.timezone.is_none() {
            missing.push("timezone");
        }
        if !missing.is_empty() {
            warn!(?missing, "config file is missing values, defaults are kept");
        }

        let defaults = Self::default();
        Ok(Loaded {
            config: Self {
                source_url: overrides.source_url.unwrap_or(defaults.source_url),
                timezone: overrides.timezone.unwrap_or(defaults.timezone),
                webdriver_url: overrides.webdriver_url.unwrap_or(defaults.webdriver_url),
            },
            missing,
        })
    }

    /// Resolve the timezone name
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse().map_err(|e| Error::Timezone {
            name: self.timezone.clone(),
            reason: format!("{e}"),
        })
    }
}
