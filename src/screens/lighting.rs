//! Lighting screen: the lamp list with switches, brightness sliders and deletion.
//!
//! The light operations are free functions over a device list so the dashboard can
//! drive its own copy of the list the same way.

use log::{info, warn};
use std::fmt::Write as _;

use crate::backend::Backend;
use crate::client::ClientError;
use crate::models::homiease::{Brightness, Device, DeviceCategory, DeviceId, DevicePatch};
use crate::mutation::{mutate, patch_item, remove_item, Feedback, Reconcile};
use crate::notify::Notices;
use crate::screens::device_form::DeviceForm;
use crate::screens::form::{Confirm, SubmitError};

pub const ALL_ROOMS: &str = "All Rooms";

pub const UPDATE_FAILED: &str = "Failed to update device";

/// Switch a light or change its level, optimistically.
pub fn update_light<B: Backend>(
    lights: &mut Vec<Device>,
    backend: &B,
    id: &DeviceId,
    patch: DevicePatch,
    failure: &str,
    notices: &mut Notices,
) -> Result<(), ClientError> {
    let fetch = || backend.list_devices();
    mutate(
        lights,
        |lights| patch_item(lights, id, |d| d.apply(&patch)),
        || backend.update_device(id, &patch),
        Reconcile::Refetch(&fetch),
        &Feedback::on_failure(failure),
        notices,
    )
}

/// Slider movement. Only the local copy changes; nothing is sent until release.
/// Returns `false` when the device is unknown or switched off (no slider is shown).
pub fn drag_brightness(lights: &mut [Device], id: &DeviceId, level: Brightness) -> bool {
    match lights.iter_mut().find(|d| d.id == *id) {
        Some(device) if device.status => {
            device.brightness = level;
            true
        }
        _ => false,
    }
}

/// Slider release: commit whatever level the slider was left at, in a single request.
pub fn release_brightness<B: Backend>(
    lights: &mut Vec<Device>,
    backend: &B,
    id: &DeviceId,
    failure: &str,
    notices: &mut Notices,
) -> Result<(), ClientError> {
    let Some(level) = lights.iter().find(|d| d.id == *id && d.status).map(|d| d.brightness) else {
        return Ok(());
    };
    update_light(lights, backend, id, DevicePatch::brightness(level), failure, notices)
}

/// Delete after confirmation. Returns whether the user went ahead.
pub fn delete_light<B: Backend>(
    lights: &mut Vec<Device>,
    backend: &B,
    id: &DeviceId,
    confirm: &dyn Confirm,
    notices: &mut Notices,
) -> Result<bool, ClientError> {
    if !confirm.confirm("Are you sure you want to delete this device?") {
        return Ok(false);
    }
    let fetch = || backend.list_devices();
    mutate(
        lights,
        |lights| remove_item(lights, id),
        || backend.delete_device(id),
        Reconcile::Refetch(&fetch),
        &Feedback::on_failure("Failed to delete device").with_success("Device deleted successfully"),
        notices,
    )?;
    Ok(true)
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoomFilter {
    #[default]
    All,
    Room(String),
}

impl RoomFilter {
    pub fn label(&self) -> &str {
        match self {
            RoomFilter::All => ALL_ROOMS,
            RoomFilter::Room(name) => name,
        }
    }

    fn admits(&self, device: &Device) -> bool {
        match self {
            RoomFilter::All => true,
            RoomFilter::Room(name) => device.location == *name,
        }
    }
}

#[derive(Debug, Default)]
pub struct LightingScreen {
    pub lights: Vec<Device>,
    pub rooms: Vec<String>,
    pub room: RoomFilter,
    pub search: String,
}

impl LightingScreen {
    /// Load rooms and lights. `target_room` comes from the All-Devices screen and is
    /// honoured only when the backend knows that room.
    pub fn open<B: Backend>(backend: &B, target_room: Option<&str>, notices: &mut Notices) -> Self {
        let mut screen = LightingScreen::default();
        match backend.list_rooms() {
            Ok(rooms) => screen.rooms = rooms,
            Err(e) => warn!("Error loading rooms: {}", e),
        }
        if let Some(room) = target_room {
            screen.select_room(room);
        }
        screen.refresh(backend, notices);
        screen
    }

    pub fn refresh<B: Backend>(&mut self, backend: &B, notices: &mut Notices) {
        match backend.list_devices() {
            Ok(lights) => self.lights = lights,
            Err(e) => {
                warn!("Error loading lights: {}", e);
                notices.error("Failed to load lights");
            }
        }
    }

    /// Switch the room filter. Unknown rooms fall back to all rooms.
    pub fn select_room(&mut self, room: &str) -> bool {
        if room == ALL_ROOMS {
            self.room = RoomFilter::All;
            return true;
        }
        if self.rooms.iter().any(|r| r == room) {
            self.room = RoomFilter::Room(room.to_string());
            true
        } else {
            self.room = RoomFilter::All;
            false
        }
    }

    /// Lamps in the selected room whose name contains the search text, case-insensitively.
    pub fn visible(&self) -> Vec<&Device> {
        let needle = self.search.to_lowercase();
        self.lights
            .iter()
            .filter(|d| d.category == DeviceCategory::Lamps)
            .filter(|d| self.room.admits(d))
            .filter(|d| d.name.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn empty_message(&self) -> Option<String> {
        let any_lamp = self
            .lights
            .iter()
            .any(|d| d.category == DeviceCategory::Lamps && self.room.admits(d));
        if any_lamp {
            return None;
        }
        Some(match &self.room {
            RoomFilter::All => "No lamps found.".to_string(),
            RoomFilter::Room(name) => format!("No lamps found in {}.", name),
        })
    }

    pub fn toggle<B: Backend>(&mut self, backend: &B, id: &DeviceId, on: bool, notices: &mut Notices) -> Result<(), ClientError> {
        update_light(&mut self.lights, backend, id, DevicePatch::status(on), UPDATE_FAILED, notices)
    }

    pub fn drag_brightness(&mut self, id: &DeviceId, level: Brightness) -> bool {
        drag_brightness(&mut self.lights, id, level)
    }

    pub fn release_brightness<B: Backend>(&mut self, backend: &B, id: &DeviceId, notices: &mut Notices) -> Result<(), ClientError> {
        release_brightness(&mut self.lights, backend, id, UPDATE_FAILED, notices)
    }

    pub fn delete<B: Backend>(
        &mut self,
        backend: &B,
        id: &DeviceId,
        confirm: &dyn Confirm,
        notices: &mut Notices,
    ) -> Result<bool, ClientError> {
        delete_light(&mut self.lights, backend, id, confirm, notices)
    }

    /// Form for the "Add Lamp" button, placed in the room being viewed.
    pub fn add_form(&self) -> DeviceForm {
        let room = match &self.room {
            RoomFilter::All => None,
            RoomFilter::Room(name) => Some(name.as_str()),
        };
        DeviceForm::new(Some(DeviceCategory::Lamps), room, &self.rooms)
    }

    pub fn add<B: Backend>(&mut self, backend: &B, form: &DeviceForm, notices: &mut Notices) -> Result<(), SubmitError> {
        form.submit(backend, notices)?;
        info!("Added lamp {:?} in {:?}", form.name, form.location);
        self.refresh(backend, notices);
        notices.success("New light added successfully");
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "lighting - {}", self.room.label());
        if !self.search.is_empty() {
            let _ = writeln!(out, "search: {:?}", self.search);
        }
        for light in self.visible() {
            let _ = writeln!(out, "{}", render_light(light, self.room == RoomFilter::All));
        }
        if let Some(msg) = self.empty_message() {
            let _ = writeln!(out, "{}", msg);
        }
        out
    }
}

/// One light card: `[on ] Ceiling Lamp (id 1) Living Room - Brightness: 80%`.
pub fn render_light(light: &Device, with_room: bool) -> String {
    let switch = if light.status { "on " } else { "off" };
    let icon = if light.is_lit() { "*" } else { " " };
    let room = if with_room && !light.location.is_empty() {
        format!(" {} -", light.location)
    } else {
        String::from(" -")
    };
    let state = if light.status {
        format!("Brightness: {}", light.brightness)
    } else {
        "Off".to_string()
    };
    format!("{}[{}] {} (id {}){} {}", icon, switch, light.name, light.id, room, state)
}
