use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use serde_json::{json, Value};

use crate::workflows::suppression::domain::{
    Address, ApplicantDetails, ApplicationReference, PaymentDetails, PaymentStatus,
    SuppressionData,
};
use crate::workflows::suppression::payment::{
    PaymentService, PaymentServiceError, VerificationPolicy, VerifiedStatus,
};
use crate::workflows::suppression::session::{
    SessionError, SessionId, SessionStore, SIGN_IN_INFO_KEY, SUPPRESSION_DATA_KEY,
};
use crate::workflows::suppression::{suppression_router, SuppressionService};

pub(super) const COOKIE_NAME: &str = "__SID";
pub(super) const STATE_UUID: &str = "0d7e3f4c-6c1e-4a57-9b0c-2d6f2a1b9e11";
pub(super) const RESOURCE_URI: &str = "/payments/P-123";
pub(super) const ACCESS_TOKEN: &str = "token-abc";

pub(super) fn session_id() -> SessionId {
    SessionId("session-1".to_string())
}

pub(super) fn address() -> Address {
    Address {
        line1: "1 Test Street".to_string(),
        line2: String::new(),
        town: "Test Town".to_string(),
        county: "Test Midlands".to_string(),
        postcode: "TE10 6ST".to_string(),
        country: String::new(),
    }
}

pub(super) fn suppression_data() -> SuppressionData {
    SuppressionData {
        applicant_details: Some(ApplicantDetails {
            full_name: "test-name".to_string(),
            email_address: "test@example.com".to_string(),
            date_of_birth: None,
        }),
        address_to_remove: Some(address()),
        payment_details: Some(PaymentDetails {
            state_uuid: STATE_UUID.to_string(),
            resource_uri: RESOURCE_URI.to_string(),
            status: None,
        }),
        application_reference: Some(ApplicationReference("SR-TEST-0001".to_string())),
        ..SuppressionData::default()
    }
}

#[derive(Default)]
pub(super) struct MemorySessionStore {
    values: Mutex<HashMap<(SessionId, String), Value>>,
    writes: AtomicUsize,
}

impl MemorySessionStore {
    /// Store with an application and a signed-in user under [`session_id`].
    pub(super) fn seeded(data: &SuppressionData) -> Self {
        let store = Self::default();
        store.put(SUPPRESSION_DATA_KEY, serde_json::to_value(data).expect("serializes"));
        store.put(
            SIGN_IN_INFO_KEY,
            json!({ "signed_in": 1, "access_token": { "access_token": ACCESS_TOKEN } }),
        );
        store.writes.store(0, Ordering::SeqCst);
        store
    }

    pub(super) fn put(&self, key: &str, value: Value) {
        self.set(&session_id(), key, value).expect("store write");
    }

    pub(super) fn stored_data(&self) -> Option<SuppressionData> {
        self.values
            .lock()
            .expect("session mutex poisoned")
            .get(&(session_id(), SUPPRESSION_DATA_KEY.to_string()))
            .map(|value| serde_json::from_value(value.clone()).expect("stored data decodes"))
    }

    pub(super) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, session: &SessionId, key: &str) -> Result<Option<Value>, SessionError> {
        let guard = self.values.lock().expect("session mutex poisoned");
        Ok(guard.get(&(session.clone(), key.to_string())).cloned())
    }

    fn set(&self, session: &SessionId, key: &str, value: Value) -> Result<(), SessionError> {
        let mut guard = self.values.lock().expect("session mutex poisoned");
        guard.insert((session.clone(), key.to_string()), value);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub(super) struct UnavailableSessionStore;

impl SessionStore for UnavailableSessionStore {
    fn get(&self, _session: &SessionId, _key: &str) -> Result<Option<Value>, SessionError> {
        Err(SessionError::Unavailable("redis offline".to_string()))
    }

    fn set(&self, _session: &SessionId, _key: &str, _value: Value) -> Result<(), SessionError> {
        Err(SessionError::Unavailable("redis offline".to_string()))
    }
}

/// Provider fake answering from a script; the last entry repeats once the script runs out.
pub(super) struct ScriptedPayments {
    script: Mutex<Vec<Result<VerifiedStatus, PaymentServiceError>>>,
    calls: Mutex<Vec<(String, String)>>,
    delay: Option<Duration>,
}

impl ScriptedPayments {
    pub(super) fn answering(status: PaymentStatus) -> Self {
        Self::scripted(vec![Ok(status.into())])
    }

    pub(super) fn scripted(script: Vec<Result<VerifiedStatus, PaymentServiceError>>) -> Self {
        Self {
            script: Mutex::new(script),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub(super) fn slow(status: PaymentStatus, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::answering(status)
        }
    }

    pub(super) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("calls mutex poisoned").clone()
    }

    fn next(&self) -> Result<VerifiedStatus, PaymentServiceError> {
        let mut script = self.script.lock().expect("script mutex poisoned");
        if script.len() > 1 {
            script.remove(0)
        } else {
            match script.first() {
                Some(Ok(status)) => Ok(status.clone()),
                Some(Err(err)) => Err(PaymentServiceError::Transport(err.to_string())),
                None => Err(PaymentServiceError::Transport("script exhausted".to_string())),
            }
        }
    }
}

#[async_trait]
impl PaymentService for ScriptedPayments {
    async fn get_payment_status(
        &self,
        resource_uri: &str,
        access_token: &str,
    ) -> Result<VerifiedStatus, PaymentServiceError> {
        self.calls
            .lock()
            .expect("calls mutex poisoned")
            .push((resource_uri.to_string(), access_token.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next()
    }
}

pub(super) fn policy() -> VerificationPolicy {
    VerificationPolicy {
        timeout: Duration::from_millis(200),
        retries: 1,
    }
}

pub(super) fn build_service(
    store: Arc<MemorySessionStore>,
    payments: Arc<ScriptedPayments>,
) -> SuppressionService<MemorySessionStore, ScriptedPayments> {
    SuppressionService::new(store, payments, policy(), COOKIE_NAME)
}

pub(super) fn build_router(
    store: Arc<MemorySessionStore>,
    payments: Arc<ScriptedPayments>,
) -> axum::Router {
    suppression_router(Arc::new(build_service(store, payments)))
}

pub(super) fn session_cookie() -> String {
    format!("{COOKIE_NAME}={}", session_id())
}

pub(super) fn location(response: &Response) -> Option<&str> {
    response
        .headers()
        .get(axum::http::header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
