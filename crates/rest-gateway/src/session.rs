//! Login side-channel.
//!
//! Requests may carry `login[...]` fields to resume or open an end-user
//! session alongside the API call. The gateway only consumes this port; the
//! session store behind it is external.

use crate::dispatch::ResultBag;
use crate::domain::{RequestFields, Value};
use tracing::{debug, warn};

/// How the caller asked to log in
#[derive(Clone, PartialEq, Eq)]
pub enum LoginRequest {
    /// Resume an existing session
    Resume {
        session_id: String,
        security_token: String,
    },
    Username { username: String, password: String },
    Email { email: String, password: String },
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginRequest::Resume { session_id, .. } => f
                .debug_struct("Resume")
                .field("session_id", session_id)
                .finish_non_exhaustive(),
            LoginRequest::Username { username, .. } => f
                .debug_struct("Username")
                .field("username", username)
                .finish_non_exhaustive(),
            LoginRequest::Email { email, .. } => f
                .debug_struct("Email")
                .field("email", email)
                .finish_non_exhaustive(),
        }
    }
}

impl LoginRequest {
    /// Read the `login` field group. A resume request wins; otherwise
    /// username login wins over email login.
    pub fn from_fields(fields: &RequestFields) -> Vec<LoginRequest> {
        let Some(login) = fields.get("login") else {
            return Vec::new();
        };
        let field = |name: &str| {
            login
                .get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|v| !v.is_empty() && *v != "0")
                .map(str::to_string)
        };

        let mut attempts = Vec::new();
        if let (Some(session_id), Some(security_token)) = (field("sessionID"), field("securityToken")) {
            attempts.push(LoginRequest::Resume {
                session_id,
                security_token,
            });
        }
        if let Some(password) = field("password") {
            if let Some(username) = field("username") {
                attempts.push(LoginRequest::Username { username, password });
            } else if let Some(email) = field("email") {
                attempts.push(LoginRequest::Email { email, password });
            }
        }
        attempts
    }
}

/// The logged-in user and its session, as reported back to the caller
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub username: String,
    pub group_ids: Vec<i64>,
    pub language_ids: Vec<i64>,
    /// Language object (serialized with the usual redaction)
    pub language: Value,
    pub has_administrative_access: bool,
    pub banned: bool,
    pub language_id: i64,
    pub session_id: String,
    pub security_token: String,
}

impl SessionUser {
    /// Write the session values into `bag`, ahead of dispatch results
    pub fn write_into(&self, bag: &mut ResultBag) {
        bag.insert("username", self.username.as_str());
        bag.insert("groupIDs", self.group_ids.clone());
        bag.insert("languageIDs", self.language_ids.clone());
        bag.insert("language", self.language.clone());
        bag.insert("hasAdministrativeAccess", self.has_administrative_access);
        bag.insert("banned", self.banned);
        bag.insert("languageID", self.language_id);
        bag.insert("sessionID", self.session_id.as_str());
        bag.insert("securityToken", self.security_token.as_str());
    }
}

/// Session store port
pub trait SessionProvider: Send + Sync {
    /// Resume a session when the security token matches
    fn resume(&self, session_id: &str, security_token: &str) -> Option<SessionUser>;

    /// Authenticate by username and password
    fn login_username(&self, username: &str, password: &str) -> Option<SessionUser>;

    /// Authenticate by email address and password
    fn login_email(&self, email: &str, password: &str) -> Option<SessionUser>;
}

/// Provider for deployments without end-user sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSessions;

impl SessionProvider for NoSessions {
    fn resume(&self, _session_id: &str, _security_token: &str) -> Option<SessionUser> {
        None
    }

    fn login_username(&self, _username: &str, _password: &str) -> Option<SessionUser> {
        None
    }

    fn login_email(&self, _email: &str, _password: &str) -> Option<SessionUser> {
        None
    }
}

/// Run the login side-channel. Failed attempts are not errors.
pub fn establish(provider: &dyn SessionProvider, fields: &RequestFields) -> Option<SessionUser> {
    for attempt in LoginRequest::from_fields(fields) {
        let user = match &attempt {
            LoginRequest::Resume {
                session_id,
                security_token,
            } => provider.resume(session_id, security_token),
            LoginRequest::Username { username, password } => {
                provider.login_username(username, password)
            }
            LoginRequest::Email { email, password } => provider.login_email(email, password),
        };

        match user {
            Some(user) => {
                debug!(username = %user.username, "Session established");
                return Some(user);
            }
            None => warn!(attempt = ?attempt, "Login attempt failed"),
        }
    }
    None
}
