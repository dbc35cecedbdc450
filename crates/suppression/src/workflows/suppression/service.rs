use std::sync::Arc;

use super::callback::{CallbackError, PaymentCallbackHandler, PaymentCallbackQuery};
use super::domain::SuppressionData;
use super::forms::{
    self, AddressForm, AddressSlot, ApplicantDetailsForm, DocumentDetailsForm, FormStep,
    FormStepError, StepOutcome, StepView,
};
use super::payment::{PaymentService, VerificationPolicy};
use super::session::{SessionContext, SessionError, SessionId, SessionStore};

/// Service composing the session store, the form steps and the payment callback handler.
pub struct SuppressionService<S, P> {
    sessions: Arc<S>,
    callback: PaymentCallbackHandler<P>,
    cookie_name: String,
}

impl<S, P> SuppressionService<S, P>
where
    S: SessionStore + 'static,
    P: PaymentService + 'static,
{
    pub fn new(
        sessions: Arc<S>,
        payments: Arc<P>,
        policy: VerificationPolicy,
        cookie_name: impl Into<String>,
    ) -> Self {
        Self {
            sessions,
            callback: PaymentCallbackHandler::new(payments, policy),
            cookie_name: cookie_name.into(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn session(&self, id: Option<SessionId>) -> SessionContext<'_, S> {
        SessionContext::new(self.sessions.as_ref(), id)
    }

    /// Handle the provider redirect and return the page to send the user to.
    pub async fn check_payment_status(
        &self,
        id: Option<SessionId>,
        query: PaymentCallbackQuery,
    ) -> Result<&'static str, CallbackError> {
        let session = self.session(id);
        self.callback.check_payment_status(&session, query).await
    }

    pub fn step_view(
        &self,
        id: Option<SessionId>,
        step: FormStep,
    ) -> Result<StepView, SessionError> {
        forms::step_view(&self.session(id), step)
    }

    /// First step; starts the application when the session holds none.
    pub fn submit_applicant_details(
        &self,
        id: SessionId,
        form: &ApplicantDetailsForm,
    ) -> Result<StepOutcome, FormStepError> {
        forms::submit_step(
            &self.session(Some(id)),
            FormStep::ApplicantDetails,
            form,
            |details, data| data.applicant_details = Some(details),
        )
    }

    pub fn submit_address(
        &self,
        id: Option<SessionId>,
        slot: AddressSlot,
        form: &AddressForm,
    ) -> Result<StepOutcome, FormStepError> {
        forms::submit_address(&self.session(id), slot, form)
    }

    pub fn submit_document_details(
        &self,
        id: Option<SessionId>,
        form: &DocumentDetailsForm,
    ) -> Result<StepOutcome, FormStepError> {
        forms::submit_step(
            &self.session(id),
            FormStep::DocumentDetails,
            form,
            |details, data| data.document_details = Some(details),
        )
    }

    /// The stored application; required by the summary and outcome pages.
    pub fn application(&self, id: Option<SessionId>) -> Result<SuppressionData, FormStepError> {
        self.session(id)
            .suppression_data()?
            .ok_or(FormStepError::SessionNotFound)
    }
}
