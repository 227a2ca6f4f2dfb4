//! Minimal runtime configuration helpers.
//! Defaults align with a backend running locally on port 5050.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:5050/api";
pub const DEFAULT_SESSION_FILE: &str = ".homiease-session.json";
pub const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";
// Thessaloniki
pub const DEFAULT_LATITUDE: f64 = 40.64;
pub const DEFAULT_LONGITUDE: f64 = 22.94;
pub const DEFAULT_CLOCK_REFRESH_MILLIS: u64 = 1000;

#[derive(Debug, Clone)]
pub struct Config {
    /// Backend API root; endpoint paths are appended to it.
    pub api_base_url: String,
    /// Where the session token and username are kept between runs.
    pub session_file: PathBuf,
    /// Whole-request timeout. `None` keeps the HTTP client's defaults.
    pub http_timeout: Option<Duration>,
    pub weather_enabled: bool,
    pub weather_url: String,
    pub weather_latitude: f64,
    pub weather_longitude: f64,
    /// Dashboard clock cadence in follow mode.
    pub clock_refresh: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: DEFAULT_API_URL.to_string(),
            session_file: PathBuf::from(DEFAULT_SESSION_FILE),
            http_timeout: None,
            weather_enabled: true,
            weather_url: DEFAULT_WEATHER_URL.to_string(),
            weather_latitude: DEFAULT_LATITUDE,
            weather_longitude: DEFAULT_LONGITUDE,
            clock_refresh: Duration::from_millis(DEFAULT_CLOCK_REFRESH_MILLIS),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let defaults = Config::default();
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_base_url = non_empty("HOMIEASE_API_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);
        if !(api_base_url.starts_with("http://") || api_base_url.starts_with("https://")) {
            return Err(format!("HOMIEASE_API_URL must be an http(s) URL, got {}", api_base_url));
        }

        let session_file = non_empty("HOMIEASE_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or(defaults.session_file);

        let http_timeout = match non_empty("HTTP_TIMEOUT_SECS") {
            Some(s) => {
                let secs = s
                    .parse::<u64>()
                    .map_err(|_| "HTTP_TIMEOUT_SECS must be a whole number of seconds".to_string())?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let weather_enabled = non_empty("WEATHER_ENABLED")
            .map(|s| matches!(s.as_str(), "1" | "true" | "TRUE"))
            .unwrap_or(true);

        let weather_url = non_empty("WEATHER_URL").unwrap_or(defaults.weather_url);

        let weather_latitude = parse_coordinate(non_empty("WEATHER_LATITUDE"), "WEATHER_LATITUDE", 90.0)?
            .unwrap_or(defaults.weather_latitude);
        let weather_longitude = parse_coordinate(non_empty("WEATHER_LONGITUDE"), "WEATHER_LONGITUDE", 180.0)?
            .unwrap_or(defaults.weather_longitude);

        let clock_refresh = non_empty("CLOCK_REFRESH_MILLIS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
            .unwrap_or(defaults.clock_refresh);

        Ok(Config {
            api_base_url,
            session_file,
            http_timeout,
            weather_enabled,
            weather_url,
            weather_latitude,
            weather_longitude,
            clock_refresh,
        })
    }
}

fn parse_coordinate(raw: Option<String>, key: &str, limit: f64) -> Result<Option<f64>, String> {
    let Some(raw) = raw else { return Ok(None) };
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && v.abs() <= limit => Ok(Some(v)),
        _ => Err(format!("{} must be a number within ±{}", key, limit)),
    }
}
