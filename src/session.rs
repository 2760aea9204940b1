//! @acp:module "Session"
//! @acp:summary "Authenticated sessions against a remote service and the origin wrapping them"
//! @acp:domain remote
//! @acp:layer client
//!
//! The transport lives elsewhere; this module only turns a [`Profile`] into a
//! validated [`Session`] and hands out the [`Origin`] commands navigate from.

use std::fmt;

use crate::error::{CliError, Result};
use crate::profiles::Profile;

/// Path of the API below a server URL
pub const API_PATH: &str = "api/2.0/";

/// OAuth triple encoded in an API key as `consumer_key:token_key:token_secret`
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub consumer_key: String,
    pub token_key: String,
    pub token_secret: String,
}

impl Credentials {
    /// Parse an API key; an empty key means anonymous access
    pub fn parse(api_key: &str) -> Result<Option<Self>> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Ok(None);
        }
        let parts: Vec<&str> = api_key.split(':').collect();
        match parts.as_slice() {
            [consumer_key, token_key, token_secret]
                if parts.iter().all(|p| !p.is_empty()) =>
            {
                Ok(Some(Self {
                    consumer_key: consumer_key.to_string(),
                    token_key: token_key.to_string(),
                    token_secret: token_secret.to_string(),
                }))
            }
            _ => Err(CliError::InvalidApiKey),
        }
    }
}

// Never print the secret.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("token_key", &self.token_key)
            .field("token_secret", &"<redacted>")
            .finish()
    }
}

/// An authenticated session for one profile
#[derive(Debug, Clone)]
pub struct Session {
    profile: Profile,
    api_url: String,
    credentials: Option<Credentials>,
}

impl Session {
    /// @acp:summary "Build a session from a profile's URL and API key"
    pub fn from_profile(profile: &Profile) -> Result<Self> {
        let api_url = api_url(&profile.url)?;
        let credentials = Credentials::parse(&profile.api_key)?;
        Ok(Self {
            profile: profile.clone(),
            api_url,
            credentials,
        })
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.credentials.is_none()
    }
}

/// Derive the API endpoint from a server URL
fn api_url(url: &str) -> Result<String> {
    let invalid = |reason: &str| CliError::InvalidUrl {
        url: url.to_string(),
        reason: reason.to_string(),
    };

    let trimmed = url.trim();
    let rest = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .ok_or_else(|| invalid("scheme must be http or https"))?;
    let host = rest.split('/').next().unwrap_or_default();
    if host.is_empty() {
        return Err(invalid("missing host"));
    }

    let mut base = trimmed.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    if base.ends_with(API_PATH) {
        Ok(base)
    } else {
        Ok(format!("{}{}", base, API_PATH))
    }
}

/// Turns a profile into a session. Swapped out in tests.
pub trait Connector {
    fn connect(&self, profile: &Profile) -> Result<Session>;
}

/// Connector used by the binary
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConnector;

impl Connector for DefaultConnector {
    fn connect(&self, profile: &Profile) -> Result<Session> {
        Session::from_profile(profile)
    }
}

/// Root of the domain model reachable through a session
#[derive(Debug)]
pub struct Origin {
    session: Session,
}

impl Origin {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }
}
