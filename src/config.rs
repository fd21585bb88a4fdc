use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::ConfigError;

pub const DEFAULT_AREA_URL: &str = "https://www.jma.go.jp/bosai/common/const/area.json";
pub const DEFAULT_FORECAST_URL: &str =
    "https://www.jma.go.jp/bosai/forecast/data/forecast/{region_code}.json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const REGION_PLACEHOLDER: &str = "{region_code}";

/// Where the area catalog and per-region forecasts are served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub area_url: String,
    forecast_template: String,
}

impl Endpoints {
    pub fn new(
        area_url: impl Into<String>,
        forecast_template: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let forecast_template = forecast_template.into();
        if !forecast_template.contains(REGION_PLACEHOLDER) {
            return Err(ConfigError::MissingPlaceholder(forecast_template));
        }
        Ok(Self {
            area_url: area_url.into(),
            forecast_template,
        })
    }

    pub fn forecast_template(&self) -> &str {
        &self.forecast_template
    }

    pub fn forecast_url(&self, region_code: &str) -> String {
        self.forecast_template.replace(REGION_PLACEHOLDER, region_code)
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            area_url: DEFAULT_AREA_URL.to_string(),
            forecast_template: DEFAULT_FORECAST_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub endpoints: Endpoints,
    pub timeout: Duration,
    /// TTF/OTF file installed into egui so Japanese text renders.
    pub font_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            timeout: DEFAULT_TIMEOUT,
            font_path: None,
        }
    }
}

impl Settings {
    /// Reads `JMA_AREA_URL`, `JMA_FORECAST_URL`, `JMA_HTTP_TIMEOUT_SECS` and
    /// `JMA_FONT_PATH`, falling back to the public JMA endpoints.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let area_url = lookup("JMA_AREA_URL").unwrap_or_else(|| DEFAULT_AREA_URL.to_string());
        let forecast_url =
            lookup("JMA_FORECAST_URL").unwrap_or_else(|| DEFAULT_FORECAST_URL.to_string());
        let timeout = match lookup("JMA_HTTP_TIMEOUT_SECS") {
            Some(raw) => parse_timeout("JMA_HTTP_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_TIMEOUT,
        };
        Ok(Self {
            endpoints: Endpoints::new(area_url, forecast_url)?,
            timeout,
            font_path: lookup("JMA_FONT_PATH").map(PathBuf::from),
        })
    }
}

pub fn parse_timeout(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| ConfigError::InvalidTimeout {
            var,
            value: raw.to_string(),
        })
}

/// Outcome of the `.env` search, kept so it can be logged once the tracing
/// subscriber exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFileReport {
    pub searched: Vec<PathBuf>,
    pub loaded: Option<PathBuf>,
    /// Candidates that existed but could not be parsed, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

impl EnvFileReport {
    pub fn log(&self) {
        for (path, error) in &self.failed {
            warn!(path = %path.display(), %error, "failed to load .env");
        }
        match &self.loaded {
            Some(path) => info!(path = %path.display(), "loaded environment file"),
            None => debug!(searched = ?self.searched, "no .env file found"),
        }
    }
}

/// Loads the first `.env` found in the working directory, next to the
/// executable, or at `~/.jma_forecast.env`.
///
/// Runs before logging is configured so a `RUST_LOG` in the file applies;
/// call [`EnvFileReport::log`] afterwards.
pub fn load_env_file() -> EnvFileReport {
    let mut env_paths = vec![PathBuf::from(".env")];

    // next to the binary, for installed copies
    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        env_paths.push(exe_dir.join(".env"));
    }

    if let Ok(home) = std::env::var("HOME") {
        env_paths.push(Path::new(&home).join(".jma_forecast.env"));
    }

    load_first_env_file(env_paths)
}

fn load_first_env_file(env_paths: Vec<PathBuf>) -> EnvFileReport {
    let mut report = EnvFileReport::default();
    for path in env_paths {
        report.searched.push(path.clone());
        if !path.exists() {
            continue;
        }
        // first readable file wins; later ones are not consulted
        match dotenv::from_path(&path) {
            Ok(()) => {
                report.loaded = Some(path);
                break;
            }
            Err(e) => report.failed.push((path, e.to_string())),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn forecast_url_substitutes_code() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.forecast_url("130000"),
            "https://www.jma.go.jp/bosai/forecast/data/forecast/130000.json"
        );
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let err = Endpoints::new("http://a", "http://b/forecast.json").unwrap_err();
        assert!(matches!(err, ConfigError::MissingPlaceholder(_)));
    }

    #[test]
    fn settings_fall_back_to_defaults() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings.endpoints, Endpoints::default());
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT);
        assert!(settings.font_path.is_none());
    }

    #[test]
    fn settings_read_overrides() {
        let vars: HashMap<&str, &str> = [
            ("JMA_AREA_URL", "http://127.0.0.1:9000/area.json"),
            ("JMA_FORECAST_URL", "http://127.0.0.1:9000/f/{region_code}.json"),
            ("JMA_HTTP_TIMEOUT_SECS", " 5 "),
            ("JMA_FONT_PATH", "/usr/share/fonts/noto.ttc"),
        ]
        .into_iter()
        .collect();
        let settings = Settings::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(settings.endpoints.area_url, "http://127.0.0.1:9000/area.json");
        assert_eq!(
            settings.endpoints.forecast_url("O1"),
            "http://127.0.0.1:9000/f/O1.json"
        );
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(
            settings.font_path.as_deref(),
            Some(Path::new("/usr/share/fonts/noto.ttc"))
        );
    }

    #[test]
    fn zero_or_garbage_timeout_is_an_error() {
        assert!(parse_timeout("T", "0").is_err());
        assert!(parse_timeout("T", "soon").is_err());
    }

    #[test]
    fn first_existing_env_file_is_loaded() {
        let dir = std::env::temp_dir().join(format!("jma_forecast_env_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let first = dir.join("first.env");
        let second = dir.join("second.env");
        std::fs::write(&first, "JMA_FORECAST_ENV_FILE_TEST=first\n").unwrap();
        std::fs::write(&second, "JMA_FORECAST_ENV_FILE_TEST=second\n").unwrap();
        let missing = dir.join("missing.env");

        let report = load_first_env_file(vec![missing.clone(), first.clone(), second]);

        assert_eq!(report.loaded.as_deref(), Some(first.as_path()));
        assert_eq!(report.searched, vec![missing, first]);
        assert!(report.failed.is_empty());
        assert_eq!(
            std::env::var("JMA_FORECAST_ENV_FILE_TEST").as_deref(),
            Ok("first")
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn nothing_found_reports_every_candidate() {
        let missing = std::env::temp_dir().join("jma_forecast_definitely_missing.env");
        let report = load_first_env_file(vec![missing.clone()]);
        assert_eq!(report.loaded, None);
        assert_eq!(report.searched, vec![missing]);
    }
}
