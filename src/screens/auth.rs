//! Login, signup and logout.

use log::{info, warn};

use crate::backend::Backend;
use crate::models::homiease::{Credentials, NewUser};
use crate::nav::Route;
use crate::notify::Notices;
use crate::screens::form::{required, FormError};
use crate::session::{self, SharedSession};

pub const LOGIN_OK: &str = "Login successful!";
pub const LOGIN_FAILED: &str = "Login failed. Please check your credentials.";
pub const SIGNUP_OK: &str = "Account created! Please log in.";
pub const SIGNUP_FAILED: &str = "Signup failed. Please try again.";

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        LoginForm {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn validate(&self) -> Result<Credentials, FormError> {
        required("username", &self.username)?;
        required("password", &self.password)?;
        Ok(Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }

    /// Submit the form and return the route the user ends up on.
    ///
    /// Success begins the session and lands on Home. Any failure stays on Login with an
    /// error notice and leaves no token behind.
    pub fn submit<B: Backend>(
        &self,
        backend: &B,
        session: &SharedSession,
        notices: &mut Notices,
    ) -> Result<Route, FormError> {
        let credentials = self.validate()?;

        let token = match backend.login(&credentials) {
            Ok(res) => res.token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!("Login error: {}", e);
                None
            }
        };
        let Some(token) = token else {
            if let Err(e) = session::lock(session).invalidate() {
                warn!("Clearing session failed: {}", e);
            }
            notices.error(LOGIN_FAILED);
            return Ok(Route::Login);
        };

        if let Err(e) = session::lock(session).begin(token, credentials.username.as_str()) {
            warn!("Persisting session failed: {}", e);
        }
        info!("Logged in as {}", credentials.username);
        notices.success(LOGIN_OK);
        Ok(Route::Home)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignupForm {
    pub fn validate(&self) -> Result<NewUser, FormError> {
        required("username", &self.username)?;
        required("email", &self.email)?;
        validate_email(&self.email)?;
        required("password", &self.password)?;
        Ok(NewUser {
            username: self.username.clone(),
            password: self.password.clone(),
            email: self.email.trim().to_string(),
        })
    }

    pub fn submit<B: Backend>(&self, backend: &B, notices: &mut Notices) -> Result<Route, FormError> {
        let user = self.validate()?;
        match backend.register(&user) {
            Ok(()) => {
                info!("Registered user {}", user.username);
                notices.success(SIGNUP_OK);
                Ok(Route::Login)
            }
            Err(e) => {
                warn!("Signup error: {}", e);
                notices.error(SIGNUP_FAILED);
                Ok(Route::Signup)
            }
        }
    }
}

/// Same shape check as an `<input type="email">`: something@something.
fn validate_email(email: &str) -> Result<(), FormError> {
    let email = email.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => Ok(()),
        _ => Err(FormError::Invalid {
            field: "email",
            reason: format!("{:?} is not an email address", email),
        }),
    }
}

pub fn logout(session: &SharedSession) -> Route {
    if let Err(e) = session::lock(session).end() {
        warn!("Clearing session failed: {}", e);
    }
    Route::Login
}
