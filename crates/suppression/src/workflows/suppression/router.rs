use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, MethodRouter},
    Form, Json, Router,
};
use serde_json::json;
use tracing::error;

use super::callback::PaymentCallbackQuery;
use super::domain::SuppressionData;
use super::forms::{
    AddressForm, AddressSlot, ApplicantDetailsForm, DocumentDetailsForm, FormStep,
    FormStepError, StepOutcome,
};
use super::paths::{
    ADDRESS_TO_REMOVE_PAGE_URI, APPLICANT_DETAILS_PAGE_URI, CHECK_YOUR_ANSWERS_PAGE_URI,
    CONFIRMATION_PAGE_URI, CONTACT_DETAILS_PAGE_URI, DOCUMENT_DETAILS_PAGE_URI,
    PAYMENT_CALLBACK_URI, PAYMENT_REVIEW_PAGE_URI, ROOT_URI, SERVICE_ADDRESS_PAGE_URI,
};
use super::payment::PaymentService;
use super::service::SuppressionService;
use super::session::{SessionId, SessionStore};

type Service<S, P> = State<Arc<SuppressionService<S, P>>>;

/// Router builder exposing the suppression journey.
pub fn suppression_router<S, P>(service: Arc<SuppressionService<S, P>>) -> Router
where
    S: SessionStore + 'static,
    P: PaymentService + 'static,
{
    Router::new()
        .route(ROOT_URI, get(start_handler))
        .route(
            APPLICANT_DETAILS_PAGE_URI,
            show_step::<S, P>(FormStep::ApplicantDetails)
                .post(applicant_details_handler::<S, P>),
        )
        .route(
            ADDRESS_TO_REMOVE_PAGE_URI,
            address_step::<S, P>(AddressSlot::AddressToRemove),
        )
        .route(
            SERVICE_ADDRESS_PAGE_URI,
            address_step::<S, P>(AddressSlot::ServiceAddress),
        )
        .route(
            DOCUMENT_DETAILS_PAGE_URI,
            show_step::<S, P>(FormStep::DocumentDetails)
                .post(document_details_handler::<S, P>),
        )
        .route(
            CONTACT_DETAILS_PAGE_URI,
            address_step::<S, P>(AddressSlot::ContactAddress),
        )
        .route(CHECK_YOUR_ANSWERS_PAGE_URI, get(check_your_answers_handler::<S, P>))
        .route(PAYMENT_CALLBACK_URI, get(payment_callback_handler::<S, P>))
        .route(CONFIRMATION_PAGE_URI, get(outcome_handler::<S, P>))
        .route(PAYMENT_REVIEW_PAGE_URI, get(outcome_handler::<S, P>))
        .with_state(service)
}

/// GET for a step page.
fn show_step<S, P>(step: FormStep) -> MethodRouter<Arc<SuppressionService<S, P>>>
where
    S: SessionStore + 'static,
    P: PaymentService + 'static,
{
    get(
        move |State(service): Service<S, P>, headers: HeaderMap| async move {
            step_page(&service, &headers, step)
        },
    )
}

/// GET and POST for one of the address pages.
fn address_step<S, P>(slot: AddressSlot) -> MethodRouter<Arc<SuppressionService<S, P>>>
where
    S: SessionStore + 'static,
    P: PaymentService + 'static,
{
    show_step::<S, P>(slot.step()).post(
        move |State(service): Service<S, P>,
              headers: HeaderMap,
              form: Option<Form<AddressForm>>| async move {
            let form = form.map(|Form(form)| form).unwrap_or_default();
            let outcome = service.submit_address(session_id(&service, &headers), slot, &form);
            step_response(slot.step().path(), outcome)
        },
    )
}

fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => service_problem(),
    }
}

fn service_problem() -> Response {
    let payload = json!({
        "error": "Sorry, there is a problem with the service",
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

fn session_id<S, P>(service: &SuppressionService<S, P>, headers: &HeaderMap) -> Option<SessionId>
where
    S: SessionStore + 'static,
    P: PaymentService + 'static,
{
    SessionId::from_headers(headers, service.cookie_name())
}

fn step_response(handler: &'static str, outcome: Result<StepOutcome, FormStepError>) -> Response {
    match outcome {
        Ok(StepOutcome::Redirect(next)) => found(next),
        Ok(StepOutcome::Invalid(view)) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(view)).into_response()
        }
        Err(err) => {
            error!(handler, error = %err, "form step failed");
            service_problem()
        }
    }
}

pub(crate) async fn start_handler() -> Response {
    found(APPLICANT_DETAILS_PAGE_URI)
}

pub(crate) fn step_page<S, P>(
    service: &SuppressionService<S, P>,
    headers: &HeaderMap,
    step: FormStep,
) -> Response
where
    S: SessionStore + 'static,
    P: PaymentService + 'static,
{
    match service.step_view(session_id(service, headers), step) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => {
            error!(handler = step.path(), error = %err, "step could not be shown");
            service_problem()
        }
    }
}

pub(crate) async fn applicant_details_handler<S, P>(
    State(service): Service<S, P>,
    headers: HeaderMap,
    form: Option<Form<ApplicantDetailsForm>>,
) -> Response
where
    S: SessionStore + 'static,
    P: PaymentService + 'static,
{
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let (id, issued) = match session_id(&service, &headers) {
        Some(id) => (id, false),
        None => (SessionId::generate(), true),
    };
    let cookie = id.cookie(service.cookie_name());

    let outcome = service.submit_applicant_details(id, &form);
    let redirected = matches!(outcome, Ok(StepOutcome::Redirect(_)));
    let mut response = step_response("applicant_details", outcome);

    if issued && redirected {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

pub(crate) async fn document_details_handler<S, P>(
    State(service): Service<S, P>,
    headers: HeaderMap,
    form: Option<Form<DocumentDetailsForm>>,
) -> Response
where
    S: SessionStore + 'static,
    P: PaymentService + 'static,
{
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let outcome = service.submit_document_details(session_id(&service, &headers), &form);
    step_response("document_details", outcome)
}

pub(crate) async fn check_your_answers_handler<S, P>(
    State(service): Service<S, P>,
    headers: HeaderMap,
) -> Response
where
    S: SessionStore + 'static,
    P: PaymentService + 'static,
{
    match service.application(session_id(&service, &headers)) {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(err) => {
            error!(handler = "check_your_answers", error = %err, "summary unavailable");
            service_problem()
        }
    }
}

pub(crate) async fn payment_callback_handler<S, P>(
    State(service): Service<S, P>,
    headers: HeaderMap,
    query: Result<Query<PaymentCallbackQuery>, QueryRejection>,
) -> Response
where
    S: SessionStore + 'static,
    P: PaymentService + 'static,
{
    let query = match query {
        Ok(Query(query)) => query,
        Err(rejection) => {
            error!(handler = "payment_callback", error = %rejection, "malformed callback query");
            return service_problem();
        }
    };

    match service
        .check_payment_status(session_id(&service, &headers), query)
        .await
    {
        Ok(redirect) => found(redirect),
        Err(err) => {
            error!(handler = "payment_callback", error = %err, "payment callback rejected");
            service_problem()
        }
    }
}

pub(crate) async fn outcome_handler<S, P>(
    State(service): Service<S, P>,
    headers: HeaderMap,
) -> Response
where
    S: SessionStore + 'static,
    P: PaymentService + 'static,
{
    match service.application(session_id(&service, &headers)) {
        Ok(data) => (StatusCode::OK, Json(outcome_view(&data))).into_response(),
        Err(err) => {
            error!(handler = "payment_outcome", error = %err, "outcome unavailable");
            service_problem()
        }
    }
}

fn outcome_view(data: &SuppressionData) -> serde_json::Value {
    json!({
        "applicationReference": data.application_reference,
        "paymentStatus": data.payment_status(),
    })
}
