/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! End-to-end callback handshake tests against a wiremock identity provider.


use std::collections::HashMap;

use axum::http::StatusCode;
use tower::ServiceExt;

use sso_api::store::{TeamSsoConfig, UserRecord};
use test_helpers::*;

fn okta_only(idp: &MockIdp) -> HashMap<String, sso_api::config::GlobalProviderConfig> {
    let mut providers = HashMap::new();
    providers.insert("okta".to_string(), global_provider(idp, "okta-client"));
    providers
}

fn corp_team(idp: &MockIdp) -> TeamSsoConfig {
    TeamSsoConfig {
        team_id: "team-corp".to_string(),
        sso_enabled: true,
        provider: "okta".to_string(),
        client_id: "corp-client".to_string(),
        client_secret_ciphertext: "corp-secret".to_string(),
        issuer: idp.issuer(),
        redirect_uri: "https://app.example.com/callback".to_string(),
        domains: vec!["corp.example.com".to_string()],
    }
}

fn assert_failure_redirect(resp: &axum::response::Response) {
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(resp), format!("{LOGIN_URL}?error=sso_failed"));
    let cookies = set_cookies(resp);
    assert!(
        cookie_named(&cookies, "session-token").is_none(),
        "no session on rejection"
    );
    // Handshake cookies are cleared on every terminal response.
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("oauth_state_okta=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn new_user_is_provisioned_and_session_issued() {
    let idp = MockIdp::start().await;
    idp.mount_metadata().await;
    let id_token = idp.id_token("okta-client", "sub-1", "alice@example.com", "nonce-1");
    idp.mount_token_endpoint(&id_token).await;

    let (app, store) = build_app(okta_only(&idp));
    let resp = app
        .oneshot(callback_request(
            "okta",
            "code=auth-code&state=state-1",
            "oauth_state_okta=state-1; oauth_nonce_okta=nonce-1",
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), AFTER_LOGIN_URL);

    let cookies = set_cookies(&resp);
    let session = cookie_named(&cookies, "session-token").expect("session cookie set");
    assert!(!session.is_empty());
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("oauth_state_okta=;") && c.contains("Max-Age=0")));
    assert!(cookies
        .iter()
        .any(|c| c.starts_with("oauth_nonce_okta=;") && c.contains("Max-Age=0")));

    let user = store.user_by_email("alice@example.com").await.expect("user created");
    assert_eq!(user.sso_provider.as_deref(), Some("okta"));
    assert_eq!(user.sso_subject.as_deref(), Some("sub-1"));
    assert_eq!(user.name.as_deref(), Some("Test User"));
}

#[tokio::test]
async fn existing_unlinked_user_gets_linked() {
    let idp = MockIdp::start().await;
    idp.mount_metadata().await;
    let id_token = idp.id_token("okta-client", "sub-9", "carol@example.com", "nonce-1");
    idp.mount_token_endpoint(&id_token).await;

    let (app, store) = build_app(okta_only(&idp));
    store
        .insert_user(UserRecord {
            id: "user-carol".to_string(),
            email: "carol@example.com".to_string(),
            name: Some("Carol".to_string()),
            sso_provider: None,
            sso_subject: None,
            team_id: None,
        })
        .await;

    let resp = app
        .oneshot(callback_request(
            "okta",
            "code=auth-code&state=state-1",
            "oauth_state_okta=state-1; oauth_nonce_okta=nonce-1",
        ))
        .await
        .unwrap();
    assert_eq!(location(&resp), AFTER_LOGIN_URL);

    let user = store.user_by_email("carol@example.com").await.unwrap();
    assert_eq!(user.id, "user-carol");
    assert_eq!(user.sso_provider.as_deref(), Some("okta"));
    assert_eq!(user.sso_subject.as_deref(), Some("sub-9"));
}

#[tokio::test]
async fn state_mismatch_rejects_with_generic_redirect() {
    let idp = MockIdp::start().await;
    let (app, store) = build_app(okta_only(&idp));

    // Same length, different bytes.
    let resp = app
        .clone()
        .oneshot(callback_request(
            "okta",
            "code=auth-code&state=state-1",
            "oauth_state_okta=state-2; oauth_nonce_okta=nonce-1",
        ))
        .await
        .unwrap();
    assert_failure_redirect(&resp);

    // Different lengths hit the length gate.
    let resp = app
        .oneshot(callback_request(
            "okta",
            "code=auth-code&state=state-1",
            "oauth_state_okta=state-1-and-more; oauth_nonce_okta=nonce-1",
        ))
        .await
        .unwrap();
    assert_failure_redirect(&resp);

    assert!(store.user_by_email("alice@example.com").await.is_none());
}

#[tokio::test]
async fn provider_error_param_rejects_without_code_exchange() {
    let idp = MockIdp::start().await;
    let (app, _store) = build_app(okta_only(&idp));

    // No token endpoint mounted: reaching it would 404 and fail differently.
    let resp = app
        .oneshot(callback_request(
            "okta",
            "error=access_denied&error_description=user+cancelled&state=state-1",
            "oauth_state_okta=state-1; oauth_nonce_okta=nonce-1",
        ))
        .await
        .unwrap();
    assert_failure_redirect(&resp);
}

#[tokio::test]
async fn missing_code_rejects() {
    let idp = MockIdp::start().await;
    let (app, _store) = build_app(okta_only(&idp));

    let resp = app
        .oneshot(callback_request(
            "okta",
            "state=state-1",
            "oauth_state_okta=state-1; oauth_nonce_okta=nonce-1",
        ))
        .await
        .unwrap();
    assert_failure_redirect(&resp);
}

#[tokio::test]
async fn unconfigured_provider_rejects() {
    let (app, _store) = build_app(HashMap::new());

    let resp = app
        .oneshot(callback_request(
            "okta",
            "code=auth-code&state=state-1",
            "oauth_state_okta=state-1; oauth_nonce_okta=nonce-1",
        ))
        .await
        .unwrap();
    assert_failure_redirect(&resp);
}

#[tokio::test]
async fn linked_account_never_moves_to_another_provider() {
    let idp = MockIdp::start().await;
    idp.mount_metadata().await;
    // Same email arrives via a different provider and subject.
    let id_token = idp.id_token("google-client", "sub-2", "alice@example.com", "nonce-1");
    idp.mount_token_endpoint(&id_token).await;

    let mut providers = okta_only(&idp);
    providers.insert("google".to_string(), global_provider(&idp, "google-client"));
    let (app, store) = build_app(providers);

    store
        .insert_user(UserRecord {
            id: "user-alice".to_string(),
            email: "alice@example.com".to_string(),
            name: Some("Alice".to_string()),
            sso_provider: Some("okta".to_string()),
            sso_subject: Some("s1".to_string()),
            team_id: None,
        })
        .await;

    let resp = app
        .oneshot(callback_request(
            "google",
            "code=auth-code&state=state-1",
            "oauth_state_google=state-1; oauth_nonce_google=nonce-1",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), format!("{LOGIN_URL}?error=sso_failed"));

    // The record is untouched.
    let user = store.user_by_email("alice@example.com").await.unwrap();
    assert_eq!(user.sso_provider.as_deref(), Some("okta"));
    assert_eq!(user.sso_subject.as_deref(), Some("s1"));
}

#[tokio::test]
async fn team_bound_login_succeeds_for_owned_domain() {
    let idp = MockIdp::start().await;
    idp.mount_metadata().await;
    // Team-scoped client id is the audience.
    let id_token = idp.id_token("corp-client", "sub-7", "bob@corp.example.com", "nonce-1");
    idp.mount_token_endpoint(&id_token).await;

    let (app, store) = build_app(okta_only(&idp));
    store.insert_team(corp_team(&idp)).await;

    let resp = app
        .oneshot(callback_request(
            "okta",
            "code=auth-code&state=state-1",
            "oauth_state_okta=state-1; oauth_nonce_okta=nonce-1; oauth_teamid_okta=team-corp",
        ))
        .await
        .unwrap();
    assert_eq!(location(&resp), AFTER_LOGIN_URL);

    let user = store.user_by_email("bob@corp.example.com").await.unwrap();
    assert_eq!(user.team_id.as_deref(), Some("team-corp"));
    assert!(set_cookies(&resp)
        .iter()
        .any(|c| c.starts_with("oauth_teamid_okta=;") && c.contains("Max-Age=0")));
}

#[tokio::test]
async fn tampered_team_cookie_rejects_foreign_domain() {
    let idp = MockIdp::start().await;
    idp.mount_metadata().await;
    let id_token = idp.id_token("corp-client", "sub-8", "bob@other.com", "nonce-1");
    idp.mount_token_endpoint(&id_token).await;

    let (app, store) = build_app(okta_only(&idp));
    store.insert_team(corp_team(&idp)).await;

    let resp = app
        .oneshot(callback_request(
            "okta",
            "code=auth-code&state=state-1",
            "oauth_state_okta=state-1; oauth_nonce_okta=nonce-1; oauth_teamid_okta=team-corp",
        ))
        .await
        .unwrap();
    assert_failure_redirect(&resp);
    assert!(store.user_by_email("bob@other.com").await.is_none());
}

#[tokio::test]
async fn wrong_nonce_in_token_rejects() {
    let idp = MockIdp::start().await;
    idp.mount_metadata().await;
    let id_token = idp.id_token("okta-client", "sub-1", "alice@example.com", "other-nonce");
    idp.mount_token_endpoint(&id_token).await;

    let (app, store) = build_app(okta_only(&idp));
    let resp = app
        .oneshot(callback_request(
            "okta",
            "code=auth-code&state=state-1",
            "oauth_state_okta=state-1; oauth_nonce_okta=nonce-1",
        ))
        .await
        .unwrap();
    assert_failure_redirect(&resp);
    assert!(store.user_by_email("alice@example.com").await.is_none());
}
