//! Records exchanged with the HomiEase backend.
//!
//! Scope: types only, no transport code.
//!
//! Notes
//! - The backend is loose about scalar types: ids arrive as strings or integers,
//!   device status as a boolean or a word. Decoding normalises both.
//! - Request bodies get their own records so every endpoint has an explicit shape.

use chrono::{NaiveTime, Timelike};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RuleId(pub String);

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_id(deserializer).map(DeviceId)
    }
}

impl<'de> Deserialize<'de> for RuleId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize_id(deserializer).map(RuleId)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        DeviceId(value.to_string())
    }
}

impl From<&str> for RuleId {
    fn from(value: &str) -> Self {
        RuleId(value.to_string())
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct V;
    impl<'de> serde::de::Visitor<'de> for V {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a string or integer identifier")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value.to_string())
        }
    }

    deserializer.deserialize_any(V)
}

// =====================
// Devices
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceCategory {
    Lamps,
    Thermostats,
    Acs,
    Cameras,
    #[serde(other)]
    Other,
}

impl DeviceCategory {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceCategory::Lamps => "Lamps",
            DeviceCategory::Thermostats => "Thermostats",
            DeviceCategory::Acs => "ACs",
            DeviceCategory::Cameras => "Cameras",
            DeviceCategory::Other => "Other",
        }
    }
}

impl FromStr for DeviceCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lamps" | "lamp" => Ok(DeviceCategory::Lamps),
            "thermostats" | "thermostat" => Ok(DeviceCategory::Thermostats),
            "acs" | "ac" => Ok(DeviceCategory::Acs),
            "cameras" | "camera" => Ok(DeviceCategory::Cameras),
            other => Err(format!("unknown device category: {}", other)),
        }
    }
}

/// Light level in percent, always within `0..=100`.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "u8")]
pub struct Brightness(u8);

impl Brightness {
    pub const MAX: Brightness = Brightness(100);

    pub fn new(percent: u8) -> Option<Self> {
        (percent <= 100).then_some(Brightness(percent))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<f64> for Brightness {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(format!("brightness {} outside 0..=100", value));
        }
        Ok(Brightness(value.round() as u8))
    }
}

impl From<Brightness> for u8 {
    fn from(value: Brightness) -> Self {
        value.0
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl FromStr for Brightness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .trim_end_matches('%')
            .parse::<u8>()
            .map_err(|_| format!("brightness must be a whole number, got {:?}", s))?;
        Brightness::new(value).ok_or_else(|| format!("brightness {} outside 0..=100", value))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(alias = "_id")]
    pub id: DeviceId,
    pub name: String,
    pub category: DeviceCategory,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "status_flag")]
    pub status: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub brightness: Brightness,
}

impl Device {
    /// Whether the lamp is visibly emitting light. Brightness of an off device is inert.
    pub fn is_lit(&self) -> bool {
        self.status && self.brightness.get() > 0
    }

    pub fn apply(&mut self, patch: &DevicePatch) {
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(brightness) = patch.brightness {
            self.brightness = brightness;
        }
    }
}

fn status_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    struct V;
    impl<'de> serde::de::Visitor<'de> for V {
        type Value = bool;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            write!(f, "a boolean or a status word")
        }

        fn visit_bool<E>(self, value: bool) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(matches!(value.to_ascii_lowercase().as_str(), "active" | "on" | "true"))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value != 0)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value != 0)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(false)
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(false)
        }
    }

    deserializer.deserialize_any(V)
}

/// `null` reads the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// Partial device update; only the fields that are set end up in the request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DevicePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<Brightness>,
}

impl DevicePatch {
    pub fn status(on: bool) -> Self {
        DevicePatch {
            status: Some(on),
            brightness: None,
        }
    }

    pub fn brightness(level: Brightness) -> Self {
        DevicePatch {
            status: None,
            brightness: Some(level),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDevice {
    pub name: String,
    pub category: DeviceCategory,
    pub location: String,
    pub status: bool,
    pub brightness: Brightness,
}

// =====================
// Automations
// =====================

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    #[default]
    TurnOn,
    TurnOff,
}

impl RuleAction {
    pub fn label(&self) -> &'static str {
        match self {
            RuleAction::TurnOn => "Turn On",
            RuleAction::TurnOff => "Turn Off",
        }
    }
}

impl FromStr for RuleAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "turn_on" | "on" => Ok(RuleAction::TurnOn),
            "turn_off" | "off" => Ok(RuleAction::TurnOff),
            other => Err(format!("unknown rule action: {}", other)),
        }
    }
}

/// Time of day a rule fires, `HH:MM` on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuleTime(NaiveTime);

impl RuleTime {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(RuleTime)
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl Default for RuleTime {
    fn default() -> Self {
        RuleTime(NaiveTime::from_hms_opt(7, 0, 0).unwrap_or_default())
    }
}

impl FromStr for RuleTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .map(|t| RuleTime(t.with_second(0).unwrap_or(t)))
            .map_err(|_| format!("time must be HH:MM, got {:?}", s))
    }
}

impl TryFrom<String> for RuleTime {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RuleTime> for String {
    fn from(value: RuleTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for RuleTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationRule {
    #[serde(alias = "_id")]
    pub id: RuleId,
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: RuleTime,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action: RuleAction,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub selected_devices: BTreeSet<DeviceId>,
}

/// Body of both the create and the edit request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationPayload {
    pub name: String,
    pub time: RuleTime,
    pub selected_devices: BTreeSet<DeviceId>,
    pub action: RuleAction,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationActivePatch {
    pub is_active: bool,
}

// =====================
// Shortcuts
// =====================

/// Dashboard reference to a device or a rule. Does not own its target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shortcut {
    Device { id: DeviceId },
    Automation { id: RuleId },
}

impl Shortcut {
    pub fn device(id: impl Into<String>) -> Self {
        Shortcut::Device { id: DeviceId(id.into()) }
    }

    pub fn automation(id: impl Into<String>) -> Self {
        Shortcut::Automation { id: RuleId(id.into()) }
    }
}

/// Shortcut list as the backend returns it. Entries of an unknown kind or without a
/// usable id are dropped; the rest of the list still loads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShortcutList(pub Vec<Shortcut>);

impl<'de> Deserialize<'de> for ShortcutList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = Option::<Vec<serde_json::Value>>::deserialize(deserializer)?.unwrap_or_default();
        let shortcuts = entries
            .into_iter()
            .filter_map(|entry| match Shortcut::deserialize(&entry) {
                Ok(shortcut) => Some(shortcut),
                Err(e) => {
                    debug!("Skipping shortcut {}: {}", entry, e);
                    None
                }
            })
            .collect();
        Ok(ShortcutList(shortcuts))
    }
}

// =====================
// Auth
// =====================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LoginResponse {
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
}
