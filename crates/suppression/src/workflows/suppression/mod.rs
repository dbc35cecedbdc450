//! Suppression application journey: session-backed form steps and payment callback handling.

pub mod callback;
pub mod domain;
pub mod forms;
pub mod paths;
pub mod payment;
pub mod router;
pub mod service;
pub mod session;

#[cfg(test)]
mod tests;

pub use callback::{CallbackError, PaymentCallback, PaymentCallbackHandler, PaymentCallbackQuery};
pub use domain::{
    Address, ApplicantDetails, ApplicationReference, DocumentDetails, PaymentDetails,
    PaymentStatus, SuppressionData, UnknownPaymentStatus,
};
pub use forms::{
    AddressForm, AddressSlot, ApplicantDetailsForm, DocumentDetailsForm, FieldError, FormStep,
    FormStepError, StepForm, StepOutcome, StepView, ValidationErrors,
};
pub use payment::{
    verify_payment_status, HttpPaymentService, PaymentService, PaymentServiceError,
    VerificationPolicy, VerifiedStatus,
};
pub use router::suppression_router;
pub use service::SuppressionService;
pub use session::{
    AccessToken, SessionContext, SessionError, SessionId, SessionStore, SignInInfo,
    SIGN_IN_INFO_KEY, SUPPRESSION_DATA_KEY,
};
