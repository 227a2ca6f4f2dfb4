//! All-Devices screen: one tile per device category, each leading to its control screen.

use log::warn;
use std::fmt::Write as _;

use crate::backend::Backend;
use crate::models::homiease::{Device, DeviceCategory};
use crate::nav::Route;
use crate::notify::Notices;
use crate::screens::device_form::DeviceForm;
use crate::screens::form::SubmitError;

const TILES: [(DeviceCategory, Route); 4] = [
    (DeviceCategory::Lamps, Route::Lighting),
    (DeviceCategory::Thermostats, Route::Temperature),
    (DeviceCategory::Acs, Route::Temperature),
    (DeviceCategory::Cameras, Route::Security),
];

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTile {
    pub category: DeviceCategory,
    pub route: Route,
    pub count: usize,
}

#[derive(Debug, Default)]
pub struct AllDevicesScreen {
    pub devices: Vec<Device>,
    pub rooms: Vec<String>,
    /// Room picked in the selector, handed to the Lighting screen on navigation.
    pub room: Option<String>,
    pub search: String,
}

impl AllDevicesScreen {
    pub fn open<B: Backend>(backend: &B, notices: &mut Notices) -> Self {
        let mut screen = AllDevicesScreen::default();
        match backend.list_rooms() {
            Ok(rooms) => screen.rooms = rooms,
            Err(e) => warn!("Error loading rooms: {}", e),
        }
        screen.refresh(backend, notices);
        screen
    }

    pub fn refresh<B: Backend>(&mut self, backend: &B, notices: &mut Notices) {
        match backend.list_devices() {
            Ok(devices) => self.devices = devices,
            Err(e) => {
                warn!("Error loading devices: {}", e);
                notices.error("Failed to load devices");
            }
        }
    }

    /// Tiles whose label matches the search text, with the number of devices in each.
    pub fn tiles(&self) -> Vec<CategoryTile> {
        let needle = self.search.trim().to_lowercase();
        TILES
            .iter()
            .filter(|(category, _)| category.label().to_lowercase().contains(&needle))
            .map(|&(category, route)| CategoryTile {
                category,
                route,
                count: self
                    .devices
                    .iter()
                    .filter(|d| d.category == category)
                    .filter(|d| self.room.as_ref().is_none_or(|room| d.location == *room))
                    .count(),
            })
            .collect()
    }

    /// Where tapping a tile leads, together with the room to open it on.
    pub fn open_tile(&self, category: DeviceCategory) -> Option<(Route, Option<&str>)> {
        TILES
            .iter()
            .find(|(c, _)| *c == category)
            .map(|&(_, route)| (route, self.room.as_deref()))
    }

    pub fn select_room(&mut self, room: Option<&str>) {
        self.room = room.filter(|r| self.rooms.iter().any(|known| known == r)).map(str::to_string);
    }

    pub fn add_form(&self) -> DeviceForm {
        DeviceForm::new(None, self.room.as_deref(), &self.rooms)
    }

    pub fn add<B: Backend>(&mut self, backend: &B, form: &DeviceForm, notices: &mut Notices) -> Result<(), SubmitError> {
        form.submit(backend, notices)?;
        self.refresh(backend, notices);
        notices.success("Device added successfully");
        Ok(())
    }

    pub fn render(&self) -> String {
        let mut out = String::from("all devices");
        if let Some(room) = &self.room {
            let _ = write!(out, " - {}", room);
        }
        out.push('\n');
        let tiles = self.tiles();
        if tiles.is_empty() {
            let _ = writeln!(out, "No categories match {:?}.", self.search);
        }
        for tile in tiles {
            let _ = writeln!(out, "{:<12} {:>3}  {}", tile.category.label(), tile.count, tile.route);
        }
        out
    }
}
