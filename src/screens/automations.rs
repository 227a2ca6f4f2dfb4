//! Automations screen: scheduled rules with an active switch, edit and delete.

use log::warn;
use std::fmt::Write as _;

use crate::backend::Backend;
use crate::client::ClientError;
use crate::models::homiease::{AutomationRule, Device, RuleId};
use crate::mutation::{mutate, patch_item, remove_item, Feedback, Reconcile};
use crate::notify::Notices;
use crate::screens::automation_form::AutomationForm;
use crate::screens::form::{Confirm, SubmitError};

/// Flip a rule's active flag optimistically. Shared with the dashboard.
pub fn toggle_rule<B: Backend>(
    rules: &mut Vec<AutomationRule>,
    backend: &B,
    id: &RuleId,
    active: bool,
    notices: &mut Notices,
) -> Result<(), ClientError> {
    let fetch = || backend.list_automations();
    mutate(
        rules,
        |rules| patch_item(rules, id, |r| r.is_active = active),
        || backend.set_automation_active(id, active),
        Reconcile::Refetch(&fetch),
        &Feedback::on_failure("Failed to toggle automation"),
        notices,
    )
}

#[derive(Debug, Default)]
pub struct AutomationsScreen {
    pub rules: Vec<AutomationRule>,
}

impl AutomationsScreen {
    pub fn open<B: Backend>(backend: &B, notices: &mut Notices) -> Self {
        let mut screen = AutomationsScreen::default();
        screen.refresh(backend, notices);
        screen
    }

    pub fn refresh<B: Backend>(&mut self, backend: &B, notices: &mut Notices) {
        match backend.list_automations() {
            Ok(rules) => self.rules = rules,
            Err(e) => {
                warn!("Error loading automations: {}", e);
                notices.error("Failed to load automations");
            }
        }
    }

    pub fn find(&self, id: &RuleId) -> Option<&AutomationRule> {
        self.rules.iter().find(|r| r.id == *id)
    }

    pub fn toggle<B: Backend>(&mut self, backend: &B, id: &RuleId, active: bool, notices: &mut Notices) -> Result<(), ClientError> {
        toggle_rule(&mut self.rules, backend, id, active, notices)
    }

    pub fn delete<B: Backend>(
        &mut self,
        backend: &B,
        id: &RuleId,
        confirm: &dyn Confirm,
        notices: &mut Notices,
    ) -> Result<bool, ClientError> {
        if !confirm.confirm("Delete this rule?") {
            return Ok(false);
        }
        let fetch = || backend.list_automations();
        mutate(
            &mut self.rules,
            |rules| remove_item(rules, id),
            || backend.delete_automation(id),
            Reconcile::Refetch(&fetch),
            &Feedback::on_failure("Failed to delete automation").with_success("Automation rule deleted"),
            notices,
        )?;
        Ok(true)
    }

    pub fn edit_form(&self, id: &RuleId) -> Option<AutomationForm> {
        self.find(id).map(AutomationForm::edit)
    }

    /// Save the form, then reload the list from the backend either way.
    pub fn submit_form<B: Backend>(
        &mut self,
        backend: &B,
        form: &AutomationForm,
        notices: &mut Notices,
    ) -> Result<(), SubmitError> {
        let result = form.submit(backend, notices);
        if !matches!(result, Err(SubmitError::Invalid(_))) {
            self.refresh(backend, notices);
        }
        result
    }

    /// `devices` is used to name the targets; unknown ids are shown as-is.
    pub fn render(&self, devices: &[Device]) -> String {
        let mut out = String::from("automations\n");
        if self.rules.is_empty() {
            out.push_str("No automation rules yet.\n");
        }
        for rule in &self.rules {
            let _ = writeln!(out, "{}", render_rule(rule, devices));
        }
        out
    }
}

/// `[x] Morning Lights (id r1) 07:00 Turn On: Ceiling Lamp, 6571c0ffee`
pub fn render_rule(rule: &AutomationRule, devices: &[Device]) -> String {
    let targets = rule
        .selected_devices
        .iter()
        .map(|id| {
            devices
                .iter()
                .find(|d| d.id == *id)
                .map(|d| d.name.clone())
                .unwrap_or_else(|| id.to_string())
        })
        .collect::<Vec<_>>();
    let mark = if rule.is_active { "x" } else { " " };
    let mut line = format!("[{}] {} (id {}) {} {}", mark, rule.name, rule.id, rule.time, rule.action.label());
    if !targets.is_empty() {
        let _ = write!(line, ": {}", targets.join(", "));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{lamp, rule, Call, FakeBackend};
    use crate::models::homiease::DeviceId;

    fn backend() -> FakeBackend {
        FakeBackend::new().with_automations(vec![rule("r1", "Morning Lights", true), rule("r2", "Night", false)])
    }

    #[test]
    fn toggle_is_applied_and_sent() {
        let backend = backend();
        let mut notices = Notices::new();
        let mut screen = AutomationsScreen::open(&backend, &mut notices);

        screen.toggle(&backend, &RuleId::from("r2"), true, &mut notices).unwrap();

        assert!(screen.find(&RuleId::from("r2")).unwrap().is_active);
        assert!(backend.calls().contains(&Call::SetAutomationActive(RuleId::from("r2"), true)));
    }

    #[test]
    fn failed_toggle_refetches() {
        let backend = backend();
        let mut notices = Notices::new();
        let mut screen = AutomationsScreen::open(&backend, &mut notices);
        backend.fail_op("set_automation_active");

        assert!(screen.toggle(&backend, &RuleId::from("r1"), false, &mut notices).is_err());
        assert!(screen.find(&RuleId::from("r1")).unwrap().is_active);
        assert!(notices.contains("Failed to toggle automation"));
    }

    #[test]
    fn delete_needs_confirmation() {
        let backend = backend();
        let mut notices = Notices::new();
        let mut screen = AutomationsScreen::open(&backend, &mut notices);
        let id = RuleId::from("r1");

        assert!(!screen.delete(&backend, &id, &|_: &str| false, &mut notices).unwrap());
        assert_eq!(screen.rules.len(), 2);

        assert!(screen.delete(&backend, &id, &|p: &str| p == "Delete this rule?", &mut notices).unwrap());
        assert!(screen.find(&id).is_none());
        assert!(notices.contains("Automation rule deleted"));
        assert_eq!(backend.automations().len(), 1);
    }

    #[test]
    fn submitted_form_shows_up_after_refresh() {
        let backend = backend();
        let mut notices = Notices::new();
        let mut screen = AutomationsScreen::open(&backend, &mut notices);

        let mut form = AutomationForm::new_rule();
        form.name = "Evening".into();
        screen.submit_form(&backend, &form, &mut notices).unwrap();

        assert!(screen.rules.iter().any(|r| r.name == "Evening"));
    }

    #[test]
    fn renders_target_names() {
        let mut r = rule("r1", "Morning Lights", true);
        r.selected_devices.insert(DeviceId::from("1"));
        r.selected_devices.insert(DeviceId::from("gone"));
        let devices = vec![lamp("1", "Ceiling Lamp", "Living Room", false, 0)];
        assert_eq!(
            render_rule(&r, &devices),
            "[x] Morning Lights (id r1) 07:00 Turn On: Ceiling Lamp, gone"
        );
    }
}
