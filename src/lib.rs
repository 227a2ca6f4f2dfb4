pub mod models {
    pub mod homiease;
}

pub mod backend;
pub mod client;
pub mod clock;
pub mod config;
pub mod mutation;
pub mod nav;
pub mod notify;
pub mod session;
pub mod weather;
pub mod screens {
    pub mod all_devices;
    pub mod auth;
    pub mod automation_form;
    pub mod automations;
    pub mod device_form;
    pub mod form;
    pub mod home;
    pub mod lighting;
}
