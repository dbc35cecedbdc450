use super::common::*;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::suppression::domain::{PaymentStatus, SuppressionData};
use crate::workflows::suppression::paths::{
    ADDRESS_TO_REMOVE_PAGE_URI, APPLICANT_DETAILS_PAGE_URI, CHECK_YOUR_ANSWERS_PAGE_URI,
    CONFIRMATION_PAGE_URI, PAYMENT_CALLBACK_URI, PAYMENT_REVIEW_PAGE_URI, ROOT_URI,
    SERVICE_ADDRESS_PAGE_URI,
};
use crate::workflows::suppression::router::start_handler;
use crate::workflows::suppression::SuppressionService;

fn form_post(uri: &str, body: &str, with_session: bool) -> Request<Body> {
    let mut request = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if with_session {
        request = request.header(header::COOKIE, session_cookie());
    }
    request.body(Body::from(body.to_string())).unwrap()
}

fn get_with_session(uri: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, session_cookie())
        .body(Body::empty())
        .unwrap()
}

fn seeded() -> (Arc<MemorySessionStore>, axum::Router) {
    let store = Arc::new(MemorySessionStore::seeded(&suppression_data()));
    let router = build_router(
        store.clone(),
        Arc::new(ScriptedPayments::answering(PaymentStatus::Paid)),
    );
    (store, router)
}

#[tokio::test]
async fn start_redirects_to_first_step() {
    let response = start_handler().await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some(APPLICANT_DETAILS_PAGE_URI));

    let (_, router) = seeded();
    let response = router
        .oneshot(Request::get(ROOT_URI).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
}

#[tokio::test]
async fn empty_address_post_shows_every_error() {
    let (store, router) = seeded();

    let response = router
        .oneshot(form_post(ADDRESS_TO_REMOVE_PAGE_URI, "", true))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["title"], "Address details");
    assert_eq!(payload["errors"].as_array().map(Vec::len), Some(4));
    assert_eq!(
        payload["error_summary"],
        serde_json::json!([
            "Building and street is required",
            "Town or city is required",
            "County is required",
            "Postcode is required",
        ])
    );
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn invalid_address_is_shown_again_even_without_a_session() {
    let store = Arc::new(MemorySessionStore::default());
    let router = build_router(
        store.clone(),
        Arc::new(ScriptedPayments::answering(PaymentStatus::Paid)),
    );

    let response = router
        .oneshot(form_post(ADDRESS_TO_REMOVE_PAGE_URI, "line1=1+High+St", false))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert_eq!(payload["values"]["line1"], "1 High St");
    assert_eq!(payload["errors"].as_array().map(Vec::len), Some(3));
}

#[tokio::test]
async fn valid_address_without_line_two_is_saved() {
    let (store, router) = seeded();

    let response = router
        .oneshot(form_post(
            ADDRESS_TO_REMOVE_PAGE_URI,
            "line1=2+New+Road&town=Cardiff&county=Glamorgan&postcode=CF14+3UZ",
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some(SERVICE_ADDRESS_PAGE_URI));

    let stored = store.stored_data().expect("aggregate saved");
    let address = stored.address_to_remove.expect("address saved");
    assert_eq!(address.line1, "2 New Road");
    assert_eq!(address.line2, "");
    assert_eq!(address.postcode, "CF14 3UZ");
    assert_eq!(
        stored.applicant_details,
        suppression_data().applicant_details,
        "other steps keep their answers"
    );
}

#[tokio::test]
async fn valid_address_without_a_session_is_a_service_problem() {
    let store = Arc::new(MemorySessionStore::default());
    let router = build_router(
        store.clone(),
        Arc::new(ScriptedPayments::answering(PaymentStatus::Paid)),
    );

    let response = router
        .oneshot(form_post(
            ADDRESS_TO_REMOVE_PAGE_URI,
            "line1=2+New+Road&town=Cardiff&county=Glamorgan&postcode=CF14+3UZ",
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "Sorry, there is a problem with the service");
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn address_page_is_prepopulated_from_the_session() {
    let (_, router) = seeded();

    let response = router
        .oneshot(get_with_session(ADDRESS_TO_REMOVE_PAGE_URI))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["step"], "address-to-remove");
    assert_eq!(payload["values"]["line1"], "1 Test Street");
    assert_eq!(payload["values"]["postcode"], "TE10 6ST");
    assert_eq!(payload["errors"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn address_page_is_blank_without_a_session() {
    let store = Arc::new(MemorySessionStore::default());
    let router = build_router(
        store,
        Arc::new(ScriptedPayments::answering(PaymentStatus::Paid)),
    );

    let response = router
        .oneshot(
            Request::get(SERVICE_ADDRESS_PAGE_URI)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["values"]["line1"], "");
}

#[tokio::test]
async fn first_step_starts_an_application_and_issues_a_cookie() {
    let store = Arc::new(MemorySessionStore::default());
    let router = build_router(
        store.clone(),
        Arc::new(ScriptedPayments::answering(PaymentStatus::Paid)),
    );

    let response = router
        .oneshot(form_post(
            APPLICANT_DETAILS_PAGE_URI,
            "fullName=Jo+Bloggs&emailAddress=jo%40example.com",
            false,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some(ADDRESS_TO_REMOVE_PAGE_URI));
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .expect("session cookie issued");
    assert!(cookie.starts_with("__SID="));
    assert!(cookie.contains("HttpOnly"));
    assert_eq!(store.writes(), 1);
}

#[tokio::test]
async fn first_step_reuses_an_existing_session() {
    let (store, router) = seeded();

    let response = router
        .oneshot(form_post(
            APPLICANT_DETAILS_PAGE_URI,
            "fullName=Jo+Bloggs&emailAddress=jo%40example.com",
            true,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let stored = store.stored_data().expect("aggregate saved");
    assert_eq!(
        stored.application_reference,
        suppression_data().application_reference
    );
    assert_eq!(
        stored.applicant_details.map(|details| details.full_name),
        Some("Jo Bloggs".to_string())
    );
}

#[tokio::test]
async fn invalid_first_step_issues_no_cookie() {
    let store = Arc::new(MemorySessionStore::default());
    let router = build_router(
        store.clone(),
        Arc::new(ScriptedPayments::answering(PaymentStatus::Paid)),
    );

    let response = router
        .oneshot(form_post(APPLICANT_DETAILS_PAGE_URI, "emailAddress=nope", false))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn paid_callback_route_redirects_to_confirmation() {
    let (store, router) = seeded();

    let response = router
        .oneshot(get_with_session(&format!(
            "{PAYMENT_CALLBACK_URI}?state={STATE_UUID}&status=paid&ref=SR-TEST-0001"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some(CONFIRMATION_PAGE_URI));
    assert_eq!(
        store.stored_data().and_then(|data| data.payment_status()),
        Some(PaymentStatus::Paid)
    );
}

#[tokio::test]
async fn failed_callback_route_redirects_to_review() {
    let (_, router) = seeded();

    let response = router
        .oneshot(get_with_session(&format!(
            "{PAYMENT_CALLBACK_URI}?state={STATE_UUID}&status=failed&ref=SR-TEST-0001"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), Some(PAYMENT_REVIEW_PAGE_URI));
}

#[tokio::test]
async fn rejected_callback_route_is_a_service_problem() {
    for query in [
        format!("state={STATE_UUID}&status=refunded&ref=SR-TEST-0001"),
        format!("state={STATE_UUID}&status=paid"),
        "state=forged&status=paid&ref=SR-TEST-0001".to_string(),
    ] {
        let (store, router) = seeded();

        let response = router
            .oneshot(get_with_session(&format!("{PAYMENT_CALLBACK_URI}?{query}")))
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::INTERNAL_SERVER_ERROR,
            "query {query}"
        );
        assert_eq!(store.writes(), 0, "query {query}");
    }
}

#[tokio::test]
async fn malformed_callback_query_is_a_service_problem() {
    let (store, router) = seeded();

    let response = router
        .oneshot(get_with_session(&format!(
            "{PAYMENT_CALLBACK_URI}?state={STATE_UUID}&state=other&status=paid&ref=SR-TEST-0001"
        )))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "Sorry, there is a problem with the service");
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn unavailable_session_store_is_a_service_problem() {
    let service = Arc::new(SuppressionService::new(
        Arc::new(UnavailableSessionStore),
        Arc::new(ScriptedPayments::answering(PaymentStatus::Paid)),
        policy(),
        COOKIE_NAME,
    ));
    let router = crate::workflows::suppression::suppression_router(service);

    let response = router
        .oneshot(get_with_session(CHECK_YOUR_ANSWERS_PAGE_URI))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn check_your_answers_returns_the_application() {
    let (_, router) = seeded();

    let response = router
        .oneshot(get_with_session(CHECK_YOUR_ANSWERS_PAGE_URI))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let data: SuppressionData = serde_json::from_value(payload).expect("aggregate payload");
    assert_eq!(data, suppression_data());
}

#[tokio::test]
async fn confirmation_reports_reference_and_status() {
    let mut data = suppression_data();
    if let Some(payment) = data.payment_details.as_mut() {
        payment.status = Some(PaymentStatus::Paid);
    }
    let router = build_router(
        Arc::new(MemorySessionStore::seeded(&data)),
        Arc::new(ScriptedPayments::answering(PaymentStatus::Paid)),
    );

    let response = router
        .oneshot(get_with_session(CONFIRMATION_PAGE_URI))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["applicationReference"], "SR-TEST-0001");
    assert_eq!(payload["paymentStatus"], "paid");
}
