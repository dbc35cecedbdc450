use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, warn};

use super::domain::PaymentStatus;
use crate::config::PaymentsConfig;

/// Read-only view of the payment provider's record for a payment resource.
#[async_trait]
pub trait PaymentService: Send + Sync {
    async fn get_payment_status(
        &self,
        resource_uri: &str,
        access_token: &str,
    ) -> Result<VerifiedStatus, PaymentServiceError>;
}

/// Status as answered by the provider. Values outside [`PaymentStatus`] are kept verbatim so a
/// disagreement is never mistaken for a failed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifiedStatus {
    Known(PaymentStatus),
    Unrecognised(String),
}

impl VerifiedStatus {
    pub fn parse(raw: &str) -> Self {
        raw.parse()
            .map(VerifiedStatus::Known)
            .unwrap_or_else(|_| VerifiedStatus::Unrecognised(raw.to_string()))
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, VerifiedStatus::Known(PaymentStatus::Paid))
    }
}

impl From<PaymentStatus> for VerifiedStatus {
    fn from(status: PaymentStatus) -> Self {
        VerifiedStatus::Known(status)
    }
}

impl fmt::Display for VerifiedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifiedStatus::Known(status) => fmt::Display::fmt(status, f),
            VerifiedStatus::Unrecognised(raw) => write!(f, "unrecognised '{raw}'"),
        }
    }
}

/// Error enumeration for payment provider lookups.
#[derive(Debug, thiserror::Error)]
pub enum PaymentServiceError {
    #[error("payments client could not be built: {0}")]
    Client(String),
    #[error("invalid payment resource uri '{uri}': {reason}")]
    InvalidResourceUri { uri: String, reason: String },
    #[error("payments API unreachable: {0}")]
    Transport(String),
    #[error("payments API did not answer within {0:?}")]
    Timeout(Duration),
    #[error("payments API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("payments API response could not be decoded: {0}")]
    Decode(String),
}

impl PaymentServiceError {
    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PaymentServiceError::Transport(_) | PaymentServiceError::Timeout(_) => true,
            PaymentServiceError::Api { status, .. } => *status >= 500,
            PaymentServiceError::Client(_)
            | PaymentServiceError::InvalidResourceUri { .. }
            | PaymentServiceError::Decode(_) => false,
        }
    }
}

/// Per-attempt timeout and retry budget for the verification call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationPolicy {
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            retries: 1,
        }
    }
}

impl From<&PaymentsConfig> for VerificationPolicy {
    fn from(config: &PaymentsConfig) -> Self {
        Self {
            timeout: config.timeout,
            retries: config.retries,
        }
    }
}

/// Ask the provider for the authoritative status, bounded by `policy`.
///
/// `policy.timeout` is the only deadline applied to a lookup.
pub async fn verify_payment_status<P>(
    payments: &P,
    policy: VerificationPolicy,
    resource_uri: &str,
    access_token: &str,
) -> Result<VerifiedStatus, PaymentServiceError>
where
    P: PaymentService + ?Sized,
{
    let mut attempt = 0;
    loop {
        let result = tokio::time::timeout(
            policy.timeout,
            payments.get_payment_status(resource_uri, access_token),
        )
        .await
        .unwrap_or(Err(PaymentServiceError::Timeout(policy.timeout)));

        match result {
            Ok(status) => {
                debug!(%resource_uri, %status, attempt, "payment status verified");
                return Ok(status);
            }
            Err(err) if err.is_retryable() && attempt < policy.retries => {
                attempt += 1;
                warn!(%resource_uri, error = %err, attempt, "retrying payment status lookup");
            }
            Err(err) => return Err(err),
        }
    }
}

#[derive(Debug, Deserialize)]
struct PaymentResource {
    status: String,
}

/// [`PaymentService`] backed by the provider's REST API.
#[derive(Debug, Clone)]
pub struct HttpPaymentService {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpPaymentService {
    pub fn new(config: &PaymentsConfig) -> Result<Self, PaymentServiceError> {
        let base_url = Url::parse(&config.api_url).map_err(|err| {
            PaymentServiceError::InvalidResourceUri {
                uri: config.api_url.clone(),
                reason: err.to_string(),
            }
        })?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| PaymentServiceError::Client(err.to_string()))?;

        Ok(Self { base_url, client })
    }

    /// Resource URIs may be absolute or relative to the API base.
    pub fn resolve(&self, resource_uri: &str) -> Result<Url, PaymentServiceError> {
        self.base_url
            .join(resource_uri)
            .map_err(|err| PaymentServiceError::InvalidResourceUri {
                uri: resource_uri.to_string(),
                reason: err.to_string(),
            })
    }
}

#[async_trait]
impl PaymentService for HttpPaymentService {
    async fn get_payment_status(
        &self,
        resource_uri: &str,
        access_token: &str,
    ) -> Result<VerifiedStatus, PaymentServiceError> {
        let url = self.resolve(resource_uri)?;
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|err| PaymentServiceError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PaymentServiceError::Api { status, body });
        }

        let resource: PaymentResource = response
            .json()
            .await
            .map_err(|err| PaymentServiceError::Decode(err.to_string()))?;
        Ok(VerifiedStatus::parse(&resource.status))
    }
}
