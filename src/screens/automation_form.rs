use log::{info, warn};
use std::collections::BTreeSet;

use crate::backend::Backend;
use crate::models::homiease::{AutomationPayload, AutomationRule, DeviceId, RuleAction, RuleId, RuleTime};
use crate::notify::Notices;
use crate::screens::form::{required, FormError, SubmitError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Add,
    Edit(RuleId),
}

/// Shared add/edit form. `time` stays as typed until validation.
#[derive(Debug, Clone, PartialEq)]
pub struct AutomationForm {
    pub mode: FormMode,
    pub name: String,
    pub time: String,
    pub action: RuleAction,
    pub selected_devices: BTreeSet<DeviceId>,
}

impl AutomationForm {
    pub fn new_rule() -> Self {
        AutomationForm {
            mode: FormMode::Add,
            name: String::new(),
            time: RuleTime::default().to_string(),
            action: RuleAction::TurnOn,
            selected_devices: BTreeSet::new(),
        }
    }

    pub fn edit(rule: &AutomationRule) -> Self {
        AutomationForm {
            mode: FormMode::Edit(rule.id.clone()),
            name: rule.name.clone(),
            time: rule.time.to_string(),
            action: rule.action,
            selected_devices: rule.selected_devices.clone(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.mode {
            FormMode::Add => "Add New Automation",
            FormMode::Edit(_) => "Edit Automation",
        }
    }

    /// Flip membership of one device. Returns whether it is now selected.
    pub fn toggle_device(&mut self, id: &DeviceId) -> bool {
        if self.selected_devices.remove(id) {
            false
        } else {
            self.selected_devices.insert(id.clone());
            true
        }
    }

    pub fn validate(&self) -> Result<AutomationPayload, FormError> {
        required("name", &self.name)?;
        let time = self
            .time
            .parse::<RuleTime>()
            .map_err(|reason| FormError::Invalid { field: "time", reason })?;
        Ok(AutomationPayload {
            name: self.name.trim().to_string(),
            time,
            selected_devices: self.selected_devices.clone(),
            action: self.action,
        })
    }

    /// Create or update the rule. The caller refetches the list afterwards.
    pub fn submit<B: Backend>(&self, backend: &B, notices: &mut Notices) -> Result<(), SubmitError> {
        let payload = self.validate()?;
        let (result, success) = match &self.mode {
            FormMode::Add => (backend.create_automation(&payload), "New rule created"),
            FormMode::Edit(id) => (backend.update_automation(id, &payload), "Rule updated successfully"),
        };
        match result {
            Ok(()) => {
                info!("Saved rule {:?} at {}", payload.name, payload.time);
                notices.success(success);
                Ok(())
            }
            Err(e) => {
                warn!("Saving rule {:?} failed: {}", payload.name, e);
                notices.error("Failed to save automation");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{rule, Call, FakeBackend};

    #[test]
    fn add_mode_defaults() {
        let form = AutomationForm::new_rule();
        assert_eq!(form.title(), "Add New Automation");
        assert_eq!(form.time, "07:00");
        assert_eq!(form.action, RuleAction::TurnOn);
        assert!(form.name.is_empty());
        assert!(form.selected_devices.is_empty());
    }

    #[test]
    fn edit_mode_prefills_from_rule() {
        let mut existing = rule("r1", "Morning Lights", true);
        existing.time = RuleTime::new(6, 45).unwrap();
        existing.selected_devices.insert(DeviceId::from("1"));

        let form = AutomationForm::edit(&existing);
        assert_eq!(form.title(), "Edit Automation");
        assert_eq!(form.mode, FormMode::Edit(RuleId::from("r1")));
        assert_eq!(form.time, "06:45");
        assert!(form.selected_devices.contains(&DeviceId::from("1")));
    }

    #[test]
    fn toggling_device_twice_restores_selection() {
        let mut form = AutomationForm::new_rule();
        let id = DeviceId::from("6571c0ffee");
        assert!(form.toggle_device(&id));
        assert!(!form.toggle_device(&id));
        assert!(form.selected_devices.is_empty());
    }

    #[test]
    fn empty_name_sends_nothing() {
        let backend = FakeBackend::new();
        let mut notices = Notices::new();
        let mut form = AutomationForm::new_rule();
        form.name = "   ".into();

        assert!(matches!(
            form.submit(&backend, &mut notices),
            Err(SubmitError::Invalid(FormError::Required("name")))
        ));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn bad_time_is_rejected() {
        let mut form = AutomationForm::new_rule();
        form.name = "Night".into();
        form.time = "25:61".into();
        assert!(matches!(form.validate(), Err(FormError::Invalid { field: "time", .. })));
    }

    #[test]
    fn add_posts_and_edit_puts_by_id() {
        let backend = FakeBackend::new().with_automations(vec![rule("r1", "Morning", true)]);
        let mut notices = Notices::new();

        let mut form = AutomationForm::new_rule();
        form.name = "Evening".into();
        form.time = "19:30".into();
        form.submit(&backend, &mut notices).unwrap();
        assert!(notices.contains("New rule created"));

        let mut edit = AutomationForm::edit(&backend.automations()[0]);
        edit.action = RuleAction::TurnOff;
        edit.submit(&backend, &mut notices).unwrap();
        assert!(notices.contains("Rule updated successfully"));

        let calls = backend.calls();
        assert!(matches!(&calls[0], Call::CreateAutomation(p) if p.name == "Evening"));
        assert!(matches!(&calls[1], Call::UpdateAutomation(id, p) if id.0 == "r1" && p.action == RuleAction::TurnOff));
        assert_eq!(backend.automations().len(), 2);
    }

    #[test]
    fn failed_save_raises_notice() {
        let backend = FakeBackend::new();
        backend.fail_op("create_automation");
        let mut notices = Notices::new();
        let mut form = AutomationForm::new_rule();
        form.name = "Evening".into();

        assert!(matches!(form.submit(&backend, &mut notices), Err(SubmitError::Backend(_))));
        assert!(notices.contains("Failed to save automation"));
    }
}
