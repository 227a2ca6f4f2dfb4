//! Current conditions for the dashboard header, from the Open-Meteo forecast API.
//!
//! Best effort: the dashboard renders without a weather line when the lookup fails.

use log::warn;
use serde::Deserialize;
use std::fmt;

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct CurrentWeather {
    temperature: f64,
    weathercode: u16,
    #[serde(default)]
    windspeed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Weather {
    /// Rounded to whole degrees Celsius.
    pub temp_c: i32,
    pub code: u16,
    pub wind_kmh: Option<f64>,
}

impl Weather {
    pub fn description(&self) -> &'static str {
        describe_code(self.code)
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°C, {}", self.temp_c, self.description())?;
        if let Some(wind) = self.wind_kmh {
            write!(f, ", wind {:.0} km/h", wind)?;
        }
        Ok(())
    }
}

/// WMO weather interpretation codes, grouped the way the dashboard shows them.
pub fn describe_code(code: u16) -> &'static str {
    match code {
        0 => "Clear sky",
        1..=3 => "Partly cloudy",
        45 | 48 => "Fog",
        51..=57 => "Drizzle",
        61..=67 => "Rain",
        71..=77 => "Snow",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95..=99 => "Thunderstorm",
        _ => "Unknown",
    }
}

fn parse_forecast(body: &str) -> Result<Weather, String> {
    let de = &mut serde_json::Deserializer::from_str(body);
    let res: ForecastResponse =
        serde_path_to_error::deserialize(de).map_err(|e| format!("weather response at {}: {}", e.path(), e.inner()))?;
    Ok(Weather {
        temp_c: res.current_weather.temperature.round() as i32,
        code: res.current_weather.weathercode,
        wind_kmh: res.current_weather.windspeed,
    })
}

pub fn fetch(cfg: &Config) -> Result<Weather, String> {
    let config = ureq::Agent::config_builder().timeout_global(cfg.http_timeout).build();
    let agent = ureq::Agent::new_with_config(config);
    let mut res = agent
        .get(&cfg.weather_url)
        .query("latitude", cfg.weather_latitude.to_string())
        .query("longitude", cfg.weather_longitude.to_string())
        .query("current_weather", "true")
        .header("Accept", "application/json")
        .call()
        .map_err(|e| format!("weather request failed: {}", e))?;
    let body = res
        .body_mut()
        .read_to_string()
        .map_err(|e| format!("weather response unreadable: {}", e))?;
    parse_forecast(&body)
}

/// `fetch`, logging and swallowing failures.
pub fn current(cfg: &Config) -> Option<Weather> {
    if !cfg.weather_enabled {
        return None;
    }
    match fetch(cfg) {
        Ok(w) => Some(w),
        Err(e) => {
            warn!("Weather fetch failed: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_current_weather() {
        let body = r#"{
            "latitude": 40.625,
            "longitude": 22.9375,
            "current_weather": { "temperature": 18.6, "windspeed": 11.2, "weathercode": 61, "time": "2026-10-16T08:00" }
        }"#;
        let w = parse_forecast(body).unwrap();
        assert_eq!(w.temp_c, 19);
        assert_eq!(w.description(), "Rain");
        assert_eq!(w.to_string(), "19°C, Rain, wind 11 km/h");
    }

    #[test]
    fn reports_missing_fields() {
        let err = parse_forecast(r#"{"current_weather":{"temperature":3.0}}"#).unwrap_err();
        assert!(err.contains("current_weather"), "{}", err);
    }

    #[test]
    fn disabled_weather_skips_request() {
        let cfg = Config {
            weather_enabled: false,
            ..Config::default()
        };
        assert_eq!(current(&cfg), None);
    }
}
