//! Blocking HTTP client for the HomiEase backend.
//!
//! - Uses `ureq` (no async); one method per endpoint.
//! - Records live in `crate::models::homiease`.
//! - The bearer token comes from the shared session and is attached when present.
//!   Requests without a token are still sent; the backend decides.
//! - A 401 clears the stored token so a dead credential is not replayed. Nothing is retried.

use http::{Method, StatusCode};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::RequestBuilder;

use crate::backend::Backend;
use crate::config::Config;
use crate::models::homiease::*;
use crate::session::{self, SharedSession};

#[derive(Debug)]
pub enum ClientError {
    /// Network-level failure: DNS, connect, TLS, read.
    Transport(String),
    /// The server answered 401; the session token has been cleared.
    Unauthorized,
    Http { status: u16, message: String },
    Decode(serde_path_to_error::Error<serde_json::Error>),
    Encode(serde_json::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized => Some(StatusCode::UNAUTHORIZED.as_u16()),
            ClientError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl core::fmt::Display for ClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ClientError::Transport(s) => write!(f, "transport error: {}", s),
            ClientError::Unauthorized => write!(f, "unauthorized: session token rejected"),
            ClientError::Http { status, message } => write!(f, "http {}: {}", status, message),
            ClientError::Decode(e) => write!(f, "unexpected response at {}: {}", e.path(), e.inner()),
            ClientError::Encode(e) => write!(f, "request encoding failed: {}", e),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Decode(e) => Some(e.inner()),
            ClientError::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for ClientError {
    fn from(value: serde_path_to_error::Error<serde_json::Error>) -> Self {
        ClientError::Decode(value)
    }
}

pub struct HomieClient {
    agent: ureq::Agent,
    base_url: String,
    session: SharedSession,
}

impl HomieClient {
    pub fn new(cfg: &Config, session: SharedSession) -> Self {
        Self::with_base_url(&cfg.api_base_url, cfg.http_timeout, session)
    }

    pub fn with_base_url(base_url: &str, timeout: Option<Duration>, session: SharedSession) -> Self {
        // Status codes are inspected by hand so error bodies and 401s can be handled.
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build();
        HomieClient {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn prepare<B>(&self, req: RequestBuilder<B>) -> RequestBuilder<B> {
        let req = req.header("Accept", "application/json");
        match session::lock(&self.session).token() {
            Some(token) => req.header("Authorization", format!("Bearer {}", token)),
            None => req,
        }
    }

    fn send_without_body(&self, req: RequestBuilder<WithoutBody>) -> Result<http::Response<ureq::Body>, ureq::Error> {
        self.prepare(req).call()
    }

    fn send_with_body(
        &self,
        req: RequestBuilder<WithBody>,
        body: &serde_json::Value,
    ) -> Result<http::Response<ureq::Body>, ureq::Error> {
        self.prepare(req).send_json(body)
    }

    /// Issue a request and return the raw response body of a 2xx answer.
    fn execute<Q: Serialize + ?Sized>(&self, method: Method, path: &str, body: Option<&Q>) -> Result<String, ClientError> {
        let url = self.url(path);
        let body = body
            .map(serde_json::to_value)
            .transpose()
            .map_err(ClientError::Encode)?
            .unwrap_or(serde_json::Value::Null);
        debug!("{} {}", method, url);

        let result = match method.as_str() {
            "GET" => self.send_without_body(self.agent.get(&url)),
            "DELETE" => self.send_without_body(self.agent.delete(&url)),
            "POST" => self.send_with_body(self.agent.post(&url), &body),
            "PUT" => self.send_with_body(self.agent.put(&url), &body),
            other => return Err(ClientError::Transport(format!("unsupported method {}", other))),
        };

        let mut res = result.map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = res.status();
        let text = res
            .body_mut()
            .read_to_string()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if status == StatusCode::UNAUTHORIZED {
            if let Err(e) = session::lock(&self.session).invalidate() {
                warn!("Clearing rejected session token failed: {}", e);
            }
            return Err(ClientError::Unauthorized);
        }
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }
        Ok(text)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let text = self.execute::<()>(Method::GET, path, None)?;
        decode(&text)
    }

    fn send_json<Q: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &Q,
    ) -> Result<T, ClientError> {
        let text = self.execute(method, path, Some(body))?;
        decode(&text)
    }

    /// For endpoints whose response body carries nothing the caller needs.
    fn send_discard<Q: Serialize + ?Sized>(&self, method: Method, path: &str, body: Option<&Q>) -> Result<(), ClientError> {
        self.execute(method, path, body).map(|_| ())
    }

    pub fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ClientError> {
        let res: LoginResponse = self.send_json(Method::POST, "/auth/login", credentials)?;
        if let Some(token) = res.token.as_deref() {
            if let Err(e) = session::lock(&self.session).set_token(token) {
                warn!("Persisting session token failed: {}", e);
            }
        }
        Ok(res)
    }

    pub fn register(&self, user: &NewUser) -> Result<(), ClientError> {
        self.send_discard(Method::POST, "/users", Some(user))
    }

    pub fn logout(&self) {
        if let Err(e) = session::lock(&self.session).end() {
            warn!("Clearing session failed: {}", e);
        }
    }

    pub fn list_devices(&self) -> Result<Vec<Device>, ClientError> {
        self.get_json("/lighting/devices")
    }

    pub fn create_device(&self, device: &NewDevice) -> Result<(), ClientError> {
        self.send_discard(Method::POST, "/lighting/devices", Some(device))
    }

    pub fn update_device(&self, id: &DeviceId, patch: &DevicePatch) -> Result<(), ClientError> {
        self.send_discard(Method::PUT, &format!("/lighting/devices/{}", id.0), Some(patch))
    }

    pub fn delete_device(&self, id: &DeviceId) -> Result<(), ClientError> {
        self.send_discard::<()>(Method::DELETE, &format!("/lighting/devices/{}", id.0), None)
    }

    pub fn list_rooms(&self) -> Result<Vec<String>, ClientError> {
        self.get_json("/lighting/rooms")
    }

    pub fn list_automations(&self) -> Result<Vec<AutomationRule>, ClientError> {
        self.get_json("/automations")
    }

    pub fn create_automation(&self, rule: &AutomationPayload) -> Result<(), ClientError> {
        self.send_discard(Method::POST, "/automations", Some(rule))
    }

    pub fn update_automation(&self, id: &RuleId, rule: &AutomationPayload) -> Result<(), ClientError> {
        self.send_discard(Method::PUT, &format!("/automations/{}", id.0), Some(rule))
    }

    pub fn set_automation_active(&self, id: &RuleId, active: bool) -> Result<(), ClientError> {
        let patch = AutomationActivePatch { is_active: active };
        self.send_discard(Method::PUT, &format!("/automations/{}", id.0), Some(&patch))
    }

    pub fn delete_automation(&self, id: &RuleId) -> Result<(), ClientError> {
        self.send_discard::<()>(Method::DELETE, &format!("/automations/{}", id.0), None)
    }

    pub fn get_shortcuts(&self) -> Result<Vec<Shortcut>, ClientError> {
        self.get_json::<ShortcutList>("/shortcuts").map(|list| list.0)
    }

    /// Replaces the whole list on the server.
    pub fn save_shortcuts(&self, shortcuts: &[Shortcut]) -> Result<(), ClientError> {
        self.send_discard(Method::POST, "/shortcuts", Some(shortcuts))
    }
}

impl Backend for HomieClient {
    fn login(&self, credentials: &Credentials) -> Result<LoginResponse, ClientError> {
        HomieClient::login(self, credentials)
    }

    fn register(&self, user: &NewUser) -> Result<(), ClientError> {
        HomieClient::register(self, user)
    }

    fn list_devices(&self) -> Result<Vec<Device>, ClientError> {
        HomieClient::list_devices(self)
    }

    fn create_device(&self, device: &NewDevice) -> Result<(), ClientError> {
        HomieClient::create_device(self, device)
    }

    fn update_device(&self, id: &DeviceId, patch: &DevicePatch) -> Result<(), ClientError> {
        HomieClient::update_device(self, id, patch)
    }

    fn delete_device(&self, id: &DeviceId) -> Result<(), ClientError> {
        HomieClient::delete_device(self, id)
    }

    fn list_rooms(&self) -> Result<Vec<String>, ClientError> {
        HomieClient::list_rooms(self)
    }

    fn list_automations(&self) -> Result<Vec<AutomationRule>, ClientError> {
        HomieClient::list_automations(self)
    }

    fn create_automation(&self, rule: &AutomationPayload) -> Result<(), ClientError> {
        HomieClient::create_automation(self, rule)
    }

    fn update_automation(&self, id: &RuleId, rule: &AutomationPayload) -> Result<(), ClientError> {
        HomieClient::update_automation(self, id, rule)
    }

    fn set_automation_active(&self, id: &RuleId, active: bool) -> Result<(), ClientError> {
        HomieClient::set_automation_active(self, id, active)
    }

    fn delete_automation(&self, id: &RuleId) -> Result<(), ClientError> {
        HomieClient::delete_automation(self, id)
    }

    fn get_shortcuts(&self) -> Result<Vec<Shortcut>, ClientError> {
        HomieClient::get_shortcuts(self)
    }

    fn save_shortcuts(&self, shortcuts: &[Shortcut]) -> Result<(), ClientError> {
        HomieClient::save_shortcuts(self, shortcuts)
    }
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ClientError> {
    let de = &mut serde_json::Deserializer::from_str(text);
    Ok(serde_path_to_error::deserialize(de)?)
}

/// Pull a human-readable message out of an error response body.
pub(crate) fn error_message(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::from("<no body>");
    }
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(trimmed) {
        for key in ["error", "message", "detail"] {
            if let Some(serde_json::Value::String(msg)) = map.get(key) {
                return msg.clone();
            }
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;

    #[test]
    fn joins_paths_onto_base_url() {
        let client = HomieClient::with_base_url("http://localhost:5050/api/", None, SessionStore::in_memory().into_shared());
        assert_eq!(client.url("/automations"), "http://localhost:5050/api/automations");
        assert_eq!(client.url("shortcuts"), "http://localhost:5050/api/shortcuts");
    }

    #[test]
    fn extracts_backend_error_field() {
        assert_eq!(error_message(r#"{"error":"Invalid credentials"}"#), "Invalid credentials");
        assert_eq!(error_message(r#"{"message":"Not found"}"#), "Not found");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message("  "), "<no body>");
    }

    #[test]
    fn decode_reports_failing_path() {
        let err = decode::<Vec<Device>>(r#"[{"id":"1","name":"Lamp","category":"lamps","brightness":400}]"#)
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("[0].brightness"), "{}", msg);
    }

    #[test]
    fn unreachable_backend_is_a_transport_error() {
        // Port 9 (discard) is closed on test machines; the connection is refused.
        let client = HomieClient::with_base_url(
            "http://127.0.0.1:9/api",
            Some(Duration::from_secs(2)),
            SessionStore::in_memory().into_shared(),
        );
        assert!(matches!(client.list_devices(), Err(ClientError::Transport(_))));
    }
}
