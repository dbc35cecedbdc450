use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier wrapper for a suppression case.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationReference(pub String);

impl ApplicationReference {
    /// Human-friendly reference in the `SR-XXXX-XXXX` shape.
    pub fn generate() -> Self {
        let raw = Uuid::new_v4().simple().to_string().to_ascii_uppercase();
        Self(format!("SR-{}-{}", &raw[0..4], &raw[4..8]))
    }
}

impl fmt::Display for ApplicationReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The in-progress application carried in the session between form steps.
///
/// Sections stay `None` until the matching step has been submitted. The serialized field names
/// are the contract shared with every other reader of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppressionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_details: Option<ApplicantDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_to_remove: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_details: Option<DocumentDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_address: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_details: Option<PaymentDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_reference: Option<ApplicationReference>,
}

impl SuppressionData {
    /// Fresh aggregate with a newly assigned application reference.
    pub fn new() -> Self {
        Self {
            application_reference: Some(ApplicationReference::generate()),
            ..Self::default()
        }
    }

    pub fn payment_status(&self) -> Option<PaymentStatus> {
        self.payment_details
            .as_ref()
            .and_then(|details| details.status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantDetails {
    pub full_name: String,
    pub email_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
}

/// Postal address. `line2` and `country` may be empty, the rest may not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub line1: String,
    #[serde(default)]
    pub line2: String,
    pub town: String,
    pub county: String,
    pub postcode: String,
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetails {
    pub company_name: String,
    pub company_number: String,
    pub description: String,
    pub date: NaiveDate,
}

/// Binding between this session and one payment attempt at the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    #[serde(rename = "stateUUID")]
    pub state_uuid: String,
    pub resource_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
}

impl PaymentDetails {
    /// Details for a freshly created payment; the state token is minted here and never changes.
    pub fn initiate(resource_uri: impl Into<String>) -> Self {
        Self {
            state_uuid: Uuid::new_v4().to_string(),
            resource_uri: resource_uri.into(),
            status: None,
        }
    }
}

/// Payment outcome as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentStatus {
    Paid,
    Failed,
    Pending,
    InProgress,
    Cancelled,
    NoFunds,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 6] = [
        PaymentStatus::Paid,
        PaymentStatus::Failed,
        PaymentStatus::Pending,
        PaymentStatus::InProgress,
        PaymentStatus::Cancelled,
        PaymentStatus::NoFunds,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Pending => "pending",
            PaymentStatus::InProgress => "in-progress",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::NoFunds => "no-funds",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment status '{0}'")]
pub struct UnknownPaymentStatus(pub String);

impl FromStr for PaymentStatus {
    type Err = UnknownPaymentStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "pending" => Ok(PaymentStatus::Pending),
            "in-progress" => Ok(PaymentStatus::InProgress),
            "cancelled" => Ok(PaymentStatus::Cancelled),
            "no-funds" => Ok(PaymentStatus::NoFunds),
            other => Err(UnknownPaymentStatus(other.to_string())),
        }
    }
}
