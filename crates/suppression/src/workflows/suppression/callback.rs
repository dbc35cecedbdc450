use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use super::domain::PaymentStatus;
use super::paths::{CONFIRMATION_PAGE_URI, PAYMENT_REVIEW_PAGE_URI};
use super::payment::{
    verify_payment_status, PaymentService, PaymentServiceError, VerificationPolicy,
};
use super::session::{SessionContext, SessionError, SessionStore};

/// Raw query string of the provider redirect. Every field is untrusted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentCallbackQuery {
    pub state: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "ref")]
    pub reference: Option<String>,
}

/// Callback parameters after boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentCallback {
    pub state: String,
    pub status: PaymentStatus,
    pub reference: String,
}

impl PaymentCallbackQuery {
    pub fn validate(self) -> Result<PaymentCallback, CallbackError> {
        let fields = (
            non_empty(self.state),
            non_empty(self.status),
            non_empty(self.reference),
        );

        let (state, status, reference) = match fields {
            (Some(state), Some(status), Some(reference)) => (state, status, reference),
            (state, status, reference) => {
                let missing = [
                    ("state", state.is_none()),
                    ("status", status.is_none()),
                    ("ref", reference.is_none()),
                ]
                .into_iter()
                .filter_map(|(name, absent)| absent.then_some(name))
                .collect();
                return Err(CallbackError::InvalidArguments { missing });
            }
        };

        let status = status
            .parse::<PaymentStatus>()
            .map_err(|err| CallbackError::InvalidStatus(err.0))?;

        Ok(PaymentCallback {
            state,
            status,
            reference,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

/// Failures that abort callback handling before any redirect or session write.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    #[error("received invalid arguments, missing {missing:?}")]
    InvalidArguments { missing: Vec<&'static str> },
    #[error("received invalid payment status '{0}'")]
    InvalidStatus(String),
    #[error("session expected but none found")]
    SessionNotFound,
    #[error("payment state mismatch")]
    StateMismatch,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("payment status could not be verified: {0}")]
    Verification(#[from] PaymentServiceError),
}

/// Reconciles provider redirects with the payment attempt recorded in the session.
pub struct PaymentCallbackHandler<P> {
    payments: Arc<P>,
    policy: VerificationPolicy,
}

impl<P> PaymentCallbackHandler<P>
where
    P: PaymentService + 'static,
{
    pub fn new(payments: Arc<P>, policy: VerificationPolicy) -> Self {
        Self { payments, policy }
    }

    pub fn policy(&self) -> VerificationPolicy {
        self.policy
    }

    /// Validate the redirect, re-verify claimed success and return the page to redirect to.
    ///
    /// The caller-supplied status is persisted whatever the verification says; the session is
    /// left untouched when an error is returned.
    pub async fn check_payment_status<S>(
        &self,
        session: &SessionContext<'_, S>,
        query: PaymentCallbackQuery,
    ) -> Result<&'static str, CallbackError>
    where
        S: SessionStore + ?Sized,
    {
        let callback = query.validate()?;

        let mut data = session
            .suppression_data()?
            .ok_or(CallbackError::SessionNotFound)?;

        let payment = data
            .payment_details
            .as_mut()
            .ok_or(CallbackError::StateMismatch)?;
        if payment.state_uuid != callback.state {
            return Err(CallbackError::StateMismatch);
        }

        let redirect = if callback.status == PaymentStatus::Paid {
            let access_token = session.access_token()?;
            let verified = verify_payment_status(
                self.payments.as_ref(),
                self.policy,
                &payment.resource_uri,
                &access_token,
            )
            .await?;

            if verified.is_paid() {
                CONFIRMATION_PAGE_URI
            } else {
                warn!(
                    reference = %callback.reference,
                    %verified,
                    "could not verify user-reported payment status, routing to review"
                );
                PAYMENT_REVIEW_PAGE_URI
            }
        } else {
            PAYMENT_REVIEW_PAGE_URI
        };

        payment.status = Some(callback.status);
        session.set_suppression_data(&data)?;

        info!(
            reference = %callback.reference,
            status = %callback.status,
            redirect,
            "payment callback reconciled"
        );
        Ok(redirect)
    }
}
