//! Dashboard: greeting, clock, weather, counters, master off and shortcuts.

use chrono::{DateTime, TimeZone};
use log::{info, warn};
use std::fmt::{self, Display, Formatter, Write as _};

use crate::backend::Backend;
use crate::client::ClientError;
use crate::models::homiease::{AutomationRule, Brightness, Device, DeviceCategory, DeviceId, DevicePatch, RuleId, Shortcut};
use crate::mutation::{mutate_each, FanOut, Feedback, Reconcile};
use crate::notify::Notices;
use crate::screens::automation_form::AutomationForm;
use crate::screens::automations::{render_rule, toggle_rule};
use crate::screens::form::SubmitError;
use crate::screens::lighting::{drag_brightness, release_brightness, render_light, update_light};
use crate::weather::Weather;
use crate::{clock, session};
use crate::session::SharedSession;

const LIGHT_FAILED: &str = "Failed to update light";

const SHORTCUTS_UNAVAILABLE: &str = "Shortcuts could not be loaded; not changing them";

#[derive(Debug)]
pub enum ShortcutError {
    /// The saved list never arrived, so a save would overwrite it blindly.
    NotLoaded,
    Backend(ClientError),
}

impl Display for ShortcutError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ShortcutError::NotLoaded => f.write_str("saved shortcuts were not loaded"),
            ShortcutError::Backend(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ShortcutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ShortcutError::NotLoaded => None,
            ShortcutError::Backend(e) => Some(e),
        }
    }
}

impl From<ClientError> for ShortcutError {
    fn from(value: ClientError) -> Self {
        ShortcutError::Backend(value)
    }
}

/// What a shortcut points at, once resolved against the loaded lists.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShortcutTarget<'a> {
    Light(&'a Device),
    Rule(&'a AutomationRule),
}

#[derive(Debug, Default)]
pub struct HomeScreen {
    pub username: Option<String>,
    pub lights: Vec<Device>,
    pub automations: Vec<AutomationRule>,
    pub shortcuts: Vec<Shortcut>,
    /// False until the saved list has been read; edits are refused until then.
    pub shortcuts_loaded: bool,
    /// Set while the "Manage Shortcuts" sheet is open.
    pub editing: bool,
    pub weather: Option<Weather>,
}

impl HomeScreen {
    /// Load everything the dashboard shows. Each list loads independently; a failure
    /// leaves that list empty and logs it.
    pub fn open<B: Backend>(backend: &B, session: &SharedSession) -> Self {
        let mut screen = HomeScreen {
            username: session::lock(session).username().map(str::to_string),
            ..HomeScreen::default()
        };
        screen.refresh(backend);
        screen
    }

    pub fn refresh<B: Backend>(&mut self, backend: &B) {
        match backend.list_devices() {
            Ok(lights) => self.lights = lights,
            Err(e) => warn!("Error loading lights: {}", e),
        }
        match backend.list_automations() {
            Ok(rules) => self.automations = rules,
            Err(e) => warn!("Error loading automations: {}", e),
        }
        match backend.get_shortcuts() {
            Ok(shortcuts) => {
                self.shortcuts = shortcuts;
                self.shortcuts_loaded = true;
            }
            Err(e) => warn!("Error loading shortcuts: {}", e),
        }
    }

    /// Capitalised username, `User` when nobody is known.
    pub fn display_name(&self) -> String {
        let name = self.username.as_deref().map(str::trim).unwrap_or_default();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => "User".to_string(),
        }
    }

    pub fn active_lights(&self) -> usize {
        self.lights.iter().filter(|d| d.status).count()
    }

    pub fn active_rules(&self) -> usize {
        self.automations.iter().filter(|r| r.is_active).count()
    }

    pub fn toggle_light<B: Backend>(&mut self, backend: &B, id: &DeviceId, on: bool, notices: &mut Notices) -> Result<(), ClientError> {
        update_light(&mut self.lights, backend, id, DevicePatch::status(on), LIGHT_FAILED, notices)
    }

    pub fn drag_brightness(&mut self, id: &DeviceId, level: Brightness) -> bool {
        drag_brightness(&mut self.lights, id, level)
    }

    pub fn release_brightness<B: Backend>(&mut self, backend: &B, id: &DeviceId, notices: &mut Notices) -> Result<(), ClientError> {
        release_brightness(&mut self.lights, backend, id, LIGHT_FAILED, notices)
    }

    /// Turn every switched-on light off, one request per light.
    ///
    /// Returns `None` when nothing was on. Otherwise the per-light outcome; any failure
    /// is reported and the list is reloaded from the backend.
    pub fn master_off<B: Backend>(&mut self, backend: &B, notices: &mut Notices) -> Option<FanOut<DeviceId, ClientError>> {
        let targets: Vec<DeviceId> = self.lights.iter().filter(|d| d.status).map(|d| d.id.clone()).collect();
        if targets.is_empty() {
            notices.info("All lights are already off!");
            return None;
        }
        notices.success(format!("Turning off {} lights...", targets.len()));

        let off = DevicePatch::status(false);
        let fetch = || backend.list_devices();
        let report = mutate_each(
            &mut self.lights,
            &targets,
            |lights| {
                for light in lights.iter_mut().filter(|d| targets.contains(&d.id)) {
                    light.apply(&off);
                }
            },
            |id| backend.update_device(id, &off),
            Reconcile::Refetch(&fetch),
            &Feedback::on_failure("Some lights might not have turned off"),
            notices,
        );
        info!("Master off: {} of {} lights switched off", report.succeeded.len(), report.total());
        Some(report)
    }

    pub fn toggle_automation<B: Backend>(
        &mut self,
        backend: &B,
        id: &RuleId,
        active: bool,
        notices: &mut Notices,
    ) -> Result<(), ClientError> {
        toggle_rule(&mut self.automations, backend, id, active, notices)
    }

    pub fn edit_form(&self, id: &RuleId) -> Option<AutomationForm> {
        self.automations.iter().find(|r| r.id == *id).map(AutomationForm::edit)
    }

    /// Save a rule edited from the dashboard and reload the rules.
    pub fn submit_rule_form<B: Backend>(
        &mut self,
        backend: &B,
        form: &AutomationForm,
        notices: &mut Notices,
    ) -> Result<(), SubmitError> {
        form.submit(backend, notices)?;
        match backend.list_automations() {
            Ok(rules) => self.automations = rules,
            Err(e) => warn!("Error reloading automations: {}", e),
        }
        Ok(())
    }

    pub fn start_editing(&mut self) {
        self.editing = true;
    }

    pub fn is_pinned(&self, shortcut: &Shortcut) -> bool {
        self.shortcuts.contains(shortcut)
    }

    /// Add or remove a shortcut locally. Nothing is sent until `save_shortcuts`.
    /// Returns whether it is now pinned, or `None` when the saved list is unknown.
    pub fn toggle_shortcut(&mut self, shortcut: Shortcut, notices: &mut Notices) -> Option<bool> {
        if !self.shortcuts_loaded {
            notices.error(SHORTCUTS_UNAVAILABLE);
            return None;
        }
        if let Some(idx) = self.shortcuts.iter().position(|s| *s == shortcut) {
            self.shortcuts.remove(idx);
            Some(false)
        } else {
            self.shortcuts.push(shortcut);
            Some(true)
        }
    }

    /// Persist the whole list. The editor stays open when saving fails.
    pub fn save_shortcuts<B: Backend>(&mut self, backend: &B, notices: &mut Notices) -> Result<(), ShortcutError> {
        if !self.shortcuts_loaded {
            warn!("Refusing to save shortcuts: the saved list was never loaded");
            notices.error(SHORTCUTS_UNAVAILABLE);
            return Err(ShortcutError::NotLoaded);
        }
        match backend.save_shortcuts(&self.shortcuts) {
            Ok(()) => {
                self.editing = false;
                notices.success("Homepage updated");
                Ok(())
            }
            Err(e) => {
                warn!("Saving shortcuts failed: {}", e);
                notices.error("Failed to save shortcuts");
                Err(e.into())
            }
        }
    }

    /// Shortcuts whose target still exists, in saved order.
    pub fn resolved_shortcuts(&self) -> Vec<ShortcutTarget<'_>> {
        self.shortcuts
            .iter()
            .filter_map(|s| match s {
                Shortcut::Device { id } => self.lights.iter().find(|d| d.id == *id).map(ShortcutTarget::Light),
                Shortcut::Automation { id } => self.automations.iter().find(|r| r.id == *id).map(ShortcutTarget::Rule),
            })
            .collect()
    }

    /// Candidates offered in the shortcut editor: lamps and every rule, each with its pinned state.
    pub fn shortcut_candidates(&self) -> Vec<(Shortcut, String, bool)> {
        let lamps = self
            .lights
            .iter()
            .filter(|d| d.category == DeviceCategory::Lamps)
            .map(|d| (Shortcut::Device { id: d.id.clone() }, d.name.clone()));
        let rules = self
            .automations
            .iter()
            .map(|r| (Shortcut::Automation { id: r.id.clone() }, r.name.clone()));
        lamps
            .chain(rules)
            .map(|(s, name)| {
                let pinned = self.is_pinned(&s);
                (s, name, pinned)
            })
            .collect()
    }

    pub fn render<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> String
    where
        Tz::Offset: std::fmt::Display,
    {
        let mut out = String::new();
        let _ = writeln!(out, "{}, {}", clock::greeting_at(now), self.display_name());
        let _ = writeln!(out, "{}  {}", clock::format_date(now), clock::format_time(now));
        if let Some(weather) = &self.weather {
            let _ = writeln!(out, "{}", weather);
        }
        let _ = writeln!(
            out,
            "{} lights on, {} active rules",
            self.active_lights(),
            self.active_rules()
        );

        out.push_str("\nYour Shortcuts\n");
        let resolved = self.resolved_shortcuts();
        if !self.shortcuts_loaded {
            out.push_str("Shortcuts are unavailable right now.\n");
        } else if self.shortcuts.is_empty() {
            out.push_str("No shortcuts yet. Use `shortcut toggle` to add some!\n");
        }
        for target in resolved {
            let line = match target {
                ShortcutTarget::Light(light) => render_light(light, true),
                ShortcutTarget::Rule(rule) => render_rule(rule, &self.lights),
            };
            let _ = writeln!(out, "  {}", line);
        }

        if self.editing {
            out.push_str("\nManage Shortcuts\n");
            for (_, name, pinned) in self.shortcut_candidates() {
                let _ = writeln!(out, "  [{}] {}", if pinned { "x" } else { " " }, name);
            }
        }
        out
    }
}
