use std::fmt;

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::domain::SuppressionData;

/// Session key holding the serialized [`SuppressionData`] aggregate.
pub const SUPPRESSION_DATA_KEY: &str = "suppression";
/// Session key holding the sign-in record written by the authentication layer.
pub const SIGN_IN_INFO_KEY: &str = "signin_info";

/// Opaque identifier of a browser session, carried in a cookie.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Read the session cookie named `cookie_name` from the request headers.
    pub fn from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<Self> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|raw| raw.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == cookie_name && !value.is_empty())
            .map(|(_, value)| Self(value.to_string()))
    }

    pub fn cookie(&self, cookie_name: &str) -> String {
        format!("{cookie_name}={}; Path=/; HttpOnly; SameSite=Lax", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Session-scoped key/value storage provided by the hosting platform.
pub trait SessionStore: Send + Sync {
    fn get(&self, session: &SessionId, key: &str) -> Result<Option<Value>, SessionError>;
    fn set(&self, session: &SessionId, key: &str, value: Value) -> Result<(), SessionError>;
}

/// Error enumeration for session access failures.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("request carries no session")]
    NoSession,
    #[error("no access token found in session sign-in info")]
    MissingAccessToken,
    #[error("session value under '{key}' is malformed: {source}")]
    Malformed {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// The part of the sign-in record read here. Other fields written by the authentication layer
/// are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignInInfo {
    #[serde(default)]
    pub access_token: Option<AccessToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
}

/// Accessors over the current request's session.
pub struct SessionContext<'a, S: ?Sized> {
    store: &'a S,
    id: Option<SessionId>,
}

impl<'a, S> SessionContext<'a, S>
where
    S: SessionStore + ?Sized,
{
    pub fn new(store: &'a S, id: Option<SessionId>) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    /// Stored aggregate, or `None` when the session has none (or there is no session).
    pub fn suppression_data(&self) -> Result<Option<SuppressionData>, SessionError> {
        let Some(id) = &self.id else {
            return Ok(None);
        };

        match self.store.get(id, SUPPRESSION_DATA_KEY)? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| SessionError::Malformed {
                    key: SUPPRESSION_DATA_KEY,
                    source,
                }),
            None => Ok(None),
        }
    }

    /// Overwrite the stored aggregate. Callers merge before calling.
    pub fn set_suppression_data(&self, data: &SuppressionData) -> Result<(), SessionError> {
        let id = self.id.as_ref().ok_or(SessionError::NoSession)?;
        let value = serde_json::to_value(data).map_err(|source| SessionError::Malformed {
            key: SUPPRESSION_DATA_KEY,
            source,
        })?;
        self.store.set(id, SUPPRESSION_DATA_KEY, value)
    }

    /// Bearer token used to authenticate calls to the payments API.
    pub fn access_token(&self) -> Result<String, SessionError> {
        let id = self.id.as_ref().ok_or(SessionError::NoSession)?;
        let value = self
            .store
            .get(id, SIGN_IN_INFO_KEY)?
            .ok_or(SessionError::MissingAccessToken)?;
        let info: SignInInfo =
            serde_json::from_value(value).map_err(|source| SessionError::Malformed {
                key: SIGN_IN_INFO_KEY,
                source,
            })?;

        info.access_token
            .map(|token| token.access_token)
            .filter(|token| !token.is_empty())
            .ok_or(SessionError::MissingAccessToken)
    }
}
