//! Navigation shell: routes, side menu, bottom bar and the auth redirect.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Welcome,
    Login,
    Signup,
    Home,
    AllDevices,
    Lighting,
    Temperature,
    Security,
    Automations,
    Scenarios,
    Settings,
    Profile,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Welcome => "/",
            Route::Login => "/login",
            Route::Signup => "/signup",
            Route::Home => "/home",
            Route::AllDevices => "/devices",
            Route::Lighting => "/lighting",
            Route::Temperature => "/temperature",
            Route::Security => "/security",
            Route::Automations => "/automations",
            Route::Scenarios => "/scenarios",
            Route::Settings => "/settings",
            Route::Profile => "/profile",
        }
    }

    /// Routes reachable without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Route::Welcome | Route::Login | Route::Signup)
    }

    /// Where a request for this route actually lands given the session state.
    pub fn guard(self, authenticated: bool) -> Route {
        match (self.is_public(), authenticated) {
            (false, false) => Route::Login,
            (true, true) => Route::Home,
            _ => self,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Route {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let all = [
            Route::Welcome,
            Route::Login,
            Route::Signup,
            Route::Home,
            Route::AllDevices,
            Route::Lighting,
            Route::Temperature,
            Route::Security,
            Route::Automations,
            Route::Scenarios,
            Route::Settings,
            Route::Profile,
        ];
        all.into_iter()
            .find(|r| r.path() == s)
            .ok_or_else(|| format!("unknown route: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: &'static str,
    pub route: Route,
    pub enabled: bool,
}

/// Side menu entries in display order. Only implemented screens are enabled.
pub fn side_menu() -> Vec<MenuItem> {
    vec![
        MenuItem { label: "Lighting", route: Route::Lighting, enabled: true },
        MenuItem { label: "Temperature", route: Route::Temperature, enabled: false },
        MenuItem { label: "Security", route: Route::Security, enabled: false },
        MenuItem { label: "Automations", route: Route::Automations, enabled: true },
        MenuItem { label: "Scenarios", route: Route::Scenarios, enabled: false },
        MenuItem { label: "Settings", route: Route::Settings, enabled: false },
    ]
}

pub fn bottom_nav() -> Vec<MenuItem> {
    vec![
        MenuItem { label: "Home", route: Route::Home, enabled: true },
        MenuItem { label: "Devices", route: Route::AllDevices, enabled: true },
    ]
}

/// Pick a side menu entry by label. Disabled entries go nowhere.
pub fn select(label: &str) -> Option<Route> {
    side_menu()
        .into_iter()
        .chain(bottom_nav())
        .find(|item| item.label.eq_ignore_ascii_case(label))
        .filter(|item| item.enabled)
        .map(|item| item.route)
}
