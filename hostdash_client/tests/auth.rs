//! Session handling against the fake backend: login, CSRF, refresh-and-retry.

mod common;

use common::{agent_json, authed_client, client, Backend};
use hostdash_client::types::Registration;
use hostdash_client::ApiError;
use serde_json::json;

#[tokio::test]
async fn login_stores_tokens_and_sends_bearer() {
    let backend = Backend::new();
    backend
        .reply("POST", "/auth/login/", 200, json!({"access": "a1", "refresh": "r1"}))
        .reply("GET", "/agents/", 200, json!([agent_json(1, true)]));
    let c = client(&backend.serve().await);

    c.login("ops@example.com", "hunter2").await.unwrap();
    assert!(c.session().is_authenticated().await);
    assert_eq!(c.list_agents().await.len(), 1);

    let login = &backend.requests_to("POST", "/auth/login/")[0];
    assert_eq!(login.body, json!({"email": "ops@example.com", "password": "hunter2"}));
    let read = &backend.requests_to("GET", "/agents/")[0];
    assert_eq!(read.auth.as_deref(), Some("Bearer a1"));
}

#[tokio::test]
async fn bad_credentials_do_not_trigger_refresh() {
    let backend = Backend::new();
    backend.reply("POST", "/auth/login/", 401, json!({"detail": "No active account"}));
    let c = client(&backend.serve().await);

    let err = c.login("ops@example.com", "wrong").await.unwrap_err();
    assert!(matches!(err, ApiError::Status { .. }));
    assert!(err.user_message().contains("No active account"));
    assert!(backend.requests_to("POST", "/auth/refresh/").is_empty());
}

#[tokio::test]
async fn blank_login_fields_are_refused_locally() {
    let backend = Backend::new();
    let c = client(&backend.serve().await);
    assert!(matches!(c.login(" ", "pw").await, Err(ApiError::Validation(_))));
    assert!(matches!(c.login("ops@example.com", "").await, Err(ApiError::Validation(_))));
    assert!(backend.requests().is_empty());
}

#[tokio::test]
async fn csrf_header_only_on_writes() {
    let backend = Backend::new();
    backend
        .reply("GET", "/csrf/", 200, json!({"csrfToken": "body-token"}))
        .reply("GET", "/agents/", 200, json!([]))
        .reply("POST", "/alerts/5/resolve/", 200, json!({"status": "resolved"}));
    let c = client(&backend.serve().await);

    assert!(c.initialize_csrf().await);
    c.list_agents().await;
    c.resolve_alert(5).await.unwrap();

    assert_eq!(backend.requests_to("GET", "/agents/")[0].csrf, None);
    let write = &backend.requests_to("POST", "/alerts/5/resolve/")[0];
    assert_eq!(write.csrf.as_deref(), Some("body-token"));
}

#[tokio::test]
async fn csrf_cookie_wins_over_body_token() {
    let backend = Backend::new();
    backend
        .reply("GET", "/csrf/", 200, json!({"csrfToken": "body-token"}))
        .set_cookie("/csrf/", "csrftoken=cookie-token; Path=/")
        .reply("DELETE", "/alerts/9/", 204, json!(null));
    let c = client(&backend.serve().await);

    c.initialize_csrf().await;
    assert_eq!(c.csrf_token().await.as_deref(), Some("cookie-token"));
    c.delete_alert(9).await.unwrap();
    let write = &backend.requests_to("DELETE", "/alerts/9/")[0];
    assert_eq!(write.csrf.as_deref(), Some("cookie-token"));
}

#[tokio::test]
async fn csrf_failure_is_not_fatal() {
    let backend = Backend::new();
    backend.reply("GET", "/csrf/", 500, json!({}));
    let c = client(&backend.serve().await);
    assert!(!c.initialize_csrf().await);
    assert!(c.csrf_token().await.is_none());
}

#[tokio::test]
async fn expired_access_is_refreshed_and_retried_once() {
    let backend = Backend::new();
    backend
        .reply_once("GET", "/agents/", 401, json!({"detail": "token expired"}))
        .reply("GET", "/agents/", 200, json!([agent_json(1, true), agent_json(2, false)]))
        .reply("POST", "/auth/refresh/", 200, json!({"access": "fresh"}));
    let c = authed_client(&backend.serve().await, "stale", "r1");

    let agents = c.try_list_agents().await.unwrap();
    assert_eq!(agents.len(), 2);

    let reads = backend.requests_to("GET", "/agents/");
    assert_eq!(reads.len(), 2);
    assert_eq!(reads[0].auth.as_deref(), Some("Bearer stale"));
    assert_eq!(reads[1].auth.as_deref(), Some("Bearer fresh"));
    let refresh = backend.requests_to("POST", "/auth/refresh/");
    assert_eq!(refresh.len(), 1);
    assert_eq!(refresh[0].body, json!({"refresh": "r1"}));
    // refresh token kept when the server does not rotate it
    assert_eq!(c.session().refresh_token().await.as_deref(), Some("r1"));
}

#[tokio::test]
async fn second_401_is_not_retried_again() {
    let backend = Backend::new();
    backend
        .reply("GET", "/agents/", 401, json!({}))
        .reply("POST", "/auth/refresh/", 200, json!({"access": "fresh"}));
    let c = authed_client(&backend.serve().await, "stale", "r1");

    let err = c.try_list_agents().await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status, .. } if status.as_u16() == 401));
    assert_eq!(backend.requests_to("GET", "/agents/").len(), 2);
    assert_eq!(backend.requests_to("POST", "/auth/refresh/").len(), 1);
}

#[tokio::test]
async fn failed_refresh_expires_the_session() {
    let backend = Backend::new();
    backend
        .reply("GET", "/agents/", 401, json!({}))
        .reply("POST", "/alerts/1/resolve/", 401, json!({}))
        .reply("POST", "/auth/refresh/", 401, json!({"detail": "Token is blacklisted"}));
    let c = authed_client(&backend.serve().await, "stale", "r1");

    let err = c.try_list_agents().await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(!c.session().is_authenticated().await);

    // with no refresh token left, a write expires without another refresh call
    let err = c.resolve_alert(1).await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(backend.requests_to("POST", "/auth/refresh/").len(), 1);
}

#[tokio::test]
async fn logout_clears_session_even_when_server_fails() {
    let backend = Backend::new();
    backend.reply("POST", "/auth/logout/", 500, json!({}));
    let c = authed_client(&backend.serve().await, "a1", "r1");

    c.logout().await;
    assert!(!c.session().is_authenticated().await);
    let sent = &backend.requests_to("POST", "/auth/logout/")[0];
    assert_eq!(sent.body, json!({"refresh_token": "r1"}));
}

#[tokio::test]
async fn registration_posts_the_form_and_surfaces_field_errors() {
    let backend = Backend::new();
    backend
        .reply_once("POST", "/auth/register/", 201, json!({"message": "pending approval"}))
        .reply(
            "POST",
            "/auth/register/",
            400,
            json!({"email": ["user with this email already exists."]}),
        );
    let c = client(&backend.serve().await);
    let form = Registration {
        username: "jdoe".into(),
        email: "jdoe@example.com".into(),
        first_name: "Jane".into(),
        last_name: "Doe".into(),
        password: "correct horse".into(),
        password2: "correct horse".into(),
    };

    c.register(&form).await.unwrap();
    let sent = &backend.requests_to("POST", "/auth/register/")[0].body;
    assert_eq!(sent["username"], json!("jdoe"));
    assert_eq!(sent["password2"], json!("correct horse"));
    assert!(!c.session().is_authenticated().await);

    let err = c.register(&form).await.unwrap_err();
    assert_eq!(
        err.user_message(),
        "Request failed (400): email: user with this email already exists."
    );

    let mismatch = Registration {
        password2: "battery staple".into(),
        ..form
    };
    assert!(matches!(c.register(&mismatch).await, Err(ApiError::Validation(_))));
    assert_eq!(backend.requests_to("POST", "/auth/register/").len(), 2);
}
