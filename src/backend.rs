//! The seam between screens and the REST backend.
//!
//! `HomieClient` is the production implementation. Screens only see this trait so the
//! optimistic flows can be exercised against an in-memory backend in unit tests.

use crate::client::ClientError;
use crate::models::homiease::*;

pub trait Backend: Sync {
    fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ClientError>;
    fn register(&self, user: &NewUser) -> Result<(), ClientError>;

    fn list_devices(&self) -> Result<Vec<Device>, ClientError>;
    fn create_device(&self, device: &NewDevice) -> Result<(), ClientError>;
    fn update_device(&self, id: &DeviceId, patch: &DevicePatch) -> Result<(), ClientError>;
    fn delete_device(&self, id: &DeviceId) -> Result<(), ClientError>;
    fn list_rooms(&self) -> Result<Vec<String>, ClientError>;

    fn list_automations(&self) -> Result<Vec<AutomationRule>, ClientError>;
    fn create_automation(&self, rule: &AutomationPayload) -> Result<(), ClientError>;
    fn update_automation(&self, id: &RuleId, rule: &AutomationPayload) -> Result<(), ClientError>;
    fn set_automation_active(&self, id: &RuleId, active: bool) -> Result<(), ClientError>;
    fn delete_automation(&self, id: &RuleId) -> Result<(), ClientError>;

    fn get_shortcuts(&self) -> Result<Vec<Shortcut>, ClientError>;
    fn save_shortcuts(&self, shortcuts: &[Shortcut]) -> Result<(), ClientError>;
}
