use log::warn;

use crate::backend::Backend;
use crate::client::ClientError;
use crate::models::homiease::{Brightness, DeviceCategory, NewDevice};
use crate::notify::Notices;
use crate::screens::form::{required, FormError, SubmitError};

/// "Add device" form. New devices start switched off.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceForm {
    pub name: String,
    pub category: DeviceCategory,
    pub location: String,
    forced_category: bool,
}

impl DeviceForm {
    /// `forced` pins the category (the Lighting screen only adds lamps). The location starts
    /// at `default_room` when given, otherwise at the first known room.
    pub fn new(forced: Option<DeviceCategory>, default_room: Option<&str>, rooms: &[String]) -> Self {
        let location = default_room
            .map(str::to_string)
            .or_else(|| rooms.first().cloned())
            .unwrap_or_default();
        DeviceForm {
            name: String::new(),
            category: forced.unwrap_or(DeviceCategory::Lamps),
            location,
            forced_category: forced.is_some(),
        }
    }

    pub fn title(&self) -> String {
        if self.forced_category {
            let label = self.category.label();
            format!("Add New {}", label.strip_suffix('s').unwrap_or(label))
        } else {
            "Add New Device".to_string()
        }
    }

    pub fn set_category(&mut self, category: DeviceCategory) {
        if !self.forced_category {
            self.category = category;
        }
    }

    pub fn validate(&self) -> Result<NewDevice, FormError> {
        required("name", &self.name)?;
        Ok(NewDevice {
            name: self.name.trim().to_string(),
            category: self.category,
            location: self.location.clone(),
            status: false,
            brightness: Brightness::default(),
        })
    }

    pub fn submit<B: Backend>(&self, backend: &B, notices: &mut Notices) -> Result<(), SubmitError> {
        let device = self.validate()?;
        backend.create_device(&device).map_err(|e| {
            warn!("Adding device {:?} failed: {}", device.name, e);
            notices.error(match &e {
                ClientError::Http { message, .. } if message != "<no body>" => message.clone(),
                ClientError::Transport(_) => "Network error".to_string(),
                _ => "Error adding device".to_string(),
            });
            SubmitError::Backend(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::{Call, FakeBackend};

    fn rooms() -> Vec<String> {
        vec!["Living Room".to_string(), "Office".to_string()]
    }

    #[test]
    fn location_prefers_requested_room() {
        assert_eq!(DeviceForm::new(None, Some("Office"), &rooms()).location, "Office");
        assert_eq!(DeviceForm::new(None, None, &rooms()).location, "Living Room");
        assert_eq!(DeviceForm::new(None, None, &[]).location, "");
    }

    #[test]
    fn forced_category_is_fixed() {
        let mut form = DeviceForm::new(Some(DeviceCategory::Lamps), None, &rooms());
        form.set_category(DeviceCategory::Cameras);
        assert_eq!(form.category, DeviceCategory::Lamps);
        assert_eq!(form.title(), "Add New Lamp");
        assert_eq!(DeviceForm::new(None, None, &rooms()).title(), "Add New Device");
    }

    #[test]
    fn submit_creates_switched_off_device() {
        let backend = FakeBackend::new();
        let mut notices = Notices::new();
        let mut form = DeviceForm::new(Some(DeviceCategory::Lamps), None, &rooms());
        form.name = "Bedside".into();

        form.submit(&backend, &mut notices).unwrap();

        match &backend.calls()[0] {
            Call::CreateDevice(d) => {
                assert_eq!(d.name, "Bedside");
                assert_eq!(d.location, "Living Room");
                assert!(!d.status);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[test]
    fn nameless_device_is_rejected_locally() {
        let backend = FakeBackend::new();
        let mut notices = Notices::new();
        let form = DeviceForm::new(None, None, &rooms());
        assert!(matches!(
            form.submit(&backend, &mut notices),
            Err(SubmitError::Invalid(FormError::Required("name")))
        ));
        assert!(backend.calls().is_empty());
    }
}
