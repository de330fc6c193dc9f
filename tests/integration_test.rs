// End-to-end handshake tests against the actix routes with fake collaborators
use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use fhir_auth_broker::audit::AuditEventType;
use fhir_auth_broker::session::{HeaderIdentity, SESSION_COOKIE_NAME, STATE_COOKIE_NAME};
use fhir_auth_broker::settings::{BrokerSettings, Environment};
use fhir_auth_broker::testing::assertions::{error_reason, location, set_cookies};
use fhir_auth_broker::testing::{
    FailingTokenStore, FakeTokenExchanger, TestCollaborators, TestFixtures,
};
use fhir_auth_broker::{configure_routes, AuthBroker, BrokerCollaborators};

macro_rules! broker_app {
    ($broker:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($broker))
                .configure(configure_routes),
        )
        .await
    };
}

fn broker(settings: &BrokerSettings, collaborators: BrokerCollaborators) -> AuthBroker {
    AuthBroker::with_collaborators(settings, collaborators).unwrap()
}

fn default_broker() -> (AuthBroker, TestCollaborators) {
    let (collaborators, handles) = TestFixtures::collaborators();
    (broker(&TestFixtures::settings(), collaborators), handles)
}

fn cookie<'a>(cookies: &'a [Cookie<'static>], name: &str) -> &'a Cookie<'static> {
    cookies
        .iter()
        .find(|c| c.name() == name)
        .unwrap_or_else(|| panic!("no {name} cookie set"))
}

fn query_param(location: &str, name: &str) -> Option<String> {
    url::Url::parse(location)
        .unwrap()
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn audit_events(handles: &TestCollaborators) -> Vec<AuditEventType> {
    handles
        .audit
        .entries()
        .iter()
        .map(|entry| entry.event_type)
        .collect()
}

#[actix_web::test]
async fn test_start_redirects_with_state_bound_to_cookie() {
    let (broker, _) = default_broker();
    let app = broker_app!(broker);

    let resp = test::call_service(&app, test::TestRequest::get().uri("/auth/start").to_request()).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let location = location(resp.response()).to_string();
    assert!(location.starts_with(TestFixtures::AUTHORIZE_ENDPOINT));
    assert_eq!(query_param(&location, "response_type").as_deref(), Some("code"));
    assert_eq!(query_param(&location, "client_id").as_deref(), Some(TestFixtures::CLIENT_ID));
    assert_eq!(query_param(&location, "aud").as_deref(), Some(TestFixtures::FHIR_BASE_URL));

    let cookies = set_cookies(resp.response());
    let state_cookie = cookie(&cookies, STATE_COOKIE_NAME);
    assert_eq!(query_param(&location, "state").as_deref(), Some(state_cookie.value()));
    assert_eq!(state_cookie.value().len(), 43);
    assert_eq!(state_cookie.http_only(), Some(true));
    assert_ne!(state_cookie.secure(), Some(true));
    assert_eq!(
        state_cookie.max_age(),
        Some(actix_web::cookie::time::Duration::seconds(600))
    );
}

#[actix_web::test]
async fn test_state_cookie_secure_in_production() {
    let mut settings = TestFixtures::settings();
    settings.application.environment = Environment::Production;
    let (collaborators, _) = TestFixtures::collaborators();
    let app = broker_app!(broker(&settings, collaborators));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/auth/start").to_request()).await;
    let cookies = set_cookies(resp.response());
    assert_eq!(cookie(&cookies, STATE_COOKIE_NAME).secure(), Some(true));
}

#[actix_web::test]
async fn test_each_start_issues_a_fresh_state() {
    let (broker, _) = default_broker();
    let app = broker_app!(broker);

    let first = test::call_service(&app, test::TestRequest::get().uri("/auth/start").to_request()).await;
    let second = test::call_service(&app, test::TestRequest::get().uri("/auth/start").to_request()).await;

    let first = query_param(location(first.response()), "state");
    let second = query_param(location(second.response()), "state");
    assert_ne!(first, second);
}

#[actix_web::test]
async fn test_successful_handshake() {
    let (broker, handles) = default_broker();
    let app = broker_app!(broker);

    let start = test::call_service(&app, test::TestRequest::get().uri("/auth/start").to_request()).await;
    let state = query_param(location(start.response()), "state").unwrap();

    let req = test::TestRequest::get()
        .uri(&format!("/auth/callback?code=auth-code-1&state={state}"))
        .cookie(Cookie::new(STATE_COOKIE_NAME, state.clone()))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(resp.response()), "/dashboard");

    let cookies = set_cookies(resp.response());
    assert_eq!(cookie(&cookies, SESSION_COOKIE_NAME).value(), "true");
    assert_eq!(cookie(&cookies, STATE_COOKIE_NAME).value(), "");
    assert_eq!(
        cookies.iter().filter(|c| c.name() == SESSION_COOKIE_NAME).count(),
        1
    );

    assert_eq!(handles.exchanger.codes(), vec!["auth-code-1".to_string()]);
    assert_eq!(audit_events(&handles), vec![AuditEventType::AuthSuccess]);
    assert!(handles.tokens.get(TestFixtures::PATIENT_ID).is_some());

    let entry = &handles.audit.entries()[0];
    assert_eq!(entry.resource_type, "epic_fhir");
    let serialized = serde_json::to_string(entry).unwrap();
    assert!(!serialized.contains("access-token-value"));
    assert!(!serialized.contains("refresh-token-value"));
}

#[actix_web::test]
async fn test_provider_error_short_circuits() {
    let (broker, handles) = default_broker();
    let app = broker_app!(broker);

    let req = test::TestRequest::get()
        .uri("/auth/callback?error=access_denied&state=abc123")
        .cookie(Cookie::new(STATE_COOKIE_NAME, "abc123"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(resp.response()), "/login?error=provider_error");
    assert_eq!(handles.exchanger.calls(), 0);
    assert_eq!(audit_events(&handles), vec![AuditEventType::AuthFailure]);
    assert_eq!(handles.audit.entries()[0].metadata["reason"], "provider_error");
}

#[actix_web::test]
async fn test_state_mismatch_never_exchanges() {
    let (broker, handles) = default_broker();
    let app = broker_app!(broker);

    let req = test::TestRequest::get()
        .uri("/auth/callback?code=abc&state=forged")
        .cookie(Cookie::new(STATE_COOKIE_NAME, "expected"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(error_reason(resp.response()).as_deref(), Some("invalid_state"));
    assert_eq!(handles.exchanger.calls(), 0);
    assert!(set_cookies(resp.response())
        .iter()
        .all(|c| c.name() != SESSION_COOKIE_NAME));
}

#[actix_web::test]
async fn test_missing_state_cookie_is_invalid_state() {
    let (broker, handles) = default_broker();
    let app = broker_app!(broker);

    let req = test::TestRequest::get()
        .uri("/auth/callback?code=abc&state=abc123")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(error_reason(resp.response()).as_deref(), Some("invalid_state"));
    assert_eq!(handles.exchanger.calls(), 0);
}

#[actix_web::test]
async fn test_missing_code_is_missing_params() {
    let (broker, handles) = default_broker();
    let app = broker_app!(broker);

    let req = test::TestRequest::get()
        .uri("/auth/callback?state=abc123")
        .cookie(Cookie::new(STATE_COOKIE_NAME, "abc123"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(location(resp.response()), "/login?error=missing_params");
    assert_eq!(handles.exchanger.calls(), 0);
}

#[actix_web::test]
async fn test_duplicate_query_params_are_callback_error() {
    let (broker, handles) = default_broker();
    let app = broker_app!(broker);

    let req = test::TestRequest::get()
        .uri("/auth/callback?code=a&code=b&state=abc123")
        .cookie(Cookie::new(STATE_COOKIE_NAME, "abc123"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(error_reason(resp.response()).as_deref(), Some("callback_error"));
    assert_eq!(handles.exchanger.calls(), 0);
}

#[actix_web::test]
async fn test_exchange_failure_redirects_to_login() {
    let (collaborators, handles) =
        TestFixtures::collaborators_with(FakeTokenExchanger::rejecting(400));
    let app = broker_app!(broker(&TestFixtures::settings(), collaborators));

    let req = test::TestRequest::get()
        .uri("/auth/callback?code=used-code&state=abc123")
        .cookie(Cookie::new(STATE_COOKIE_NAME, "abc123"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(location(resp.response()), "/login?error=token_exchange_failed");
    assert_eq!(handles.exchanger.calls(), 1);
    assert!(handles.tokens.is_empty());
    assert_eq!(audit_events(&handles), vec![AuditEventType::AuthFailure]);
    assert!(set_cookies(resp.response())
        .iter()
        .all(|c| c.name() != SESSION_COOKIE_NAME));
}

#[actix_web::test]
async fn test_exchange_timeout_redirects_to_login() {
    let (collaborators, handles) =
        TestFixtures::collaborators_with(FakeTokenExchanger::timing_out(10));
    let app = broker_app!(broker(&TestFixtures::settings(), collaborators));

    let req = test::TestRequest::get()
        .uri("/auth/callback?code=c&state=abc123")
        .cookie(Cookie::new(STATE_COOKIE_NAME, "abc123"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(error_reason(resp.response()).as_deref(), Some("token_exchange_failed"));
    assert_eq!(handles.exchanger.calls(), 1);
}

#[actix_web::test]
async fn test_token_store_failure_is_callback_error() {
    let (mut collaborators, handles) = TestFixtures::collaborators();
    collaborators.token_store = Arc::new(FailingTokenStore);
    let app = broker_app!(broker(&TestFixtures::settings(), collaborators));

    let req = test::TestRequest::get()
        .uri("/auth/callback?code=c&state=abc123")
        .cookie(Cookie::new(STATE_COOKIE_NAME, "abc123"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(error_reason(resp.response()).as_deref(), Some("callback_error"));
    assert_eq!(audit_events(&handles), vec![AuditEventType::AuthFailure]);
}

#[actix_web::test]
async fn test_replay_without_cookie_fails() {
    let (broker, handles) = default_broker();
    let app = broker_app!(broker);

    let first = test::TestRequest::get()
        .uri("/auth/callback?code=c&state=abc123")
        .cookie(Cookie::new(STATE_COOKIE_NAME, "abc123"))
        .to_request();
    let resp = test::call_service(&app, first).await;
    assert_eq!(location(resp.response()), "/dashboard");

    // The browser dropped the cleared state cookie
    let replay = test::TestRequest::get()
        .uri("/auth/callback?code=c&state=abc123")
        .to_request();
    let resp = test::call_service(&app, replay).await;
    assert_eq!(error_reason(resp.response()).as_deref(), Some("invalid_state"));
    assert_eq!(handles.exchanger.calls(), 1);
}

#[actix_web::test]
async fn test_single_use_state_rejects_replayed_cookie() {
    let mut settings = TestFixtures::settings();
    settings.state.enforce_single_use = true;
    let (collaborators, handles) = TestFixtures::collaborators();
    let app = broker_app!(broker(&settings, collaborators));

    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri("/auth/callback?code=c&state=abc123")
            .cookie(Cookie::new(STATE_COOKIE_NAME, "abc123"))
            .to_request();
        test::call_service(&app, req).await;
    }

    assert_eq!(handles.exchanger.calls(), 1);
    assert_eq!(
        audit_events(&handles),
        vec![AuditEventType::AuthSuccess, AuditEventType::AuthFailure]
    );
}

#[actix_web::test]
async fn test_header_identity_attributes_audit_entries() {
    let (mut collaborators, handles) = TestFixtures::collaborators();
    collaborators.identity = Arc::new(HeaderIdentity::new("X-User-Id"));
    let app = broker_app!(broker(&TestFixtures::settings(), collaborators));

    let req = test::TestRequest::get()
        .uri("/auth/start")
        .insert_header(("X-User-Id", "clinician-7"))
        .to_request();
    test::call_service(&app, req).await;

    let entries = handles.audit.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event_type, AuditEventType::AuthAttempt);
    assert_eq!(entries[0].actor_id.as_deref(), Some("clinician-7"));
}

#[actix_web::test]
async fn test_logout_clears_session_indicator() {
    let (broker, _) = default_broker();
    let app = broker_app!(broker);

    let req = test::TestRequest::post()
        .uri("/auth/logout")
        .cookie(Cookie::new(SESSION_COOKIE_NAME, "true"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(location(resp.response()), "/login");
    let cookies = set_cookies(resp.response());
    assert_eq!(cookie(&cookies, SESSION_COOKIE_NAME).value(), "");
}
