//! Login flow composition tests
//!
//! `flow::authorize` itself launches a browser and binds the fixed port, so
//! these tests drive the same composition from its parts: a PKCE session,
//! the callback listener, and the exchanger against a wiremock endpoint.
//! The key property is verifier binding: the code captured by the listener
//! is exchanged with the verifier of the same session, and the authorize
//! URL carries that session's challenge.

use std::time::Duration;

use base64::Engine as _;
use sha2::{Digest, Sha256};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bbx::auth::callback::CallbackListener;
use bbx::auth::exchange::TokenExchanger;
use bbx::auth::flow::build_authorize_url;
use bbx::auth::pkce;

#[tokio::test]
async fn test_code_from_redirect_is_exchanged_with_session_verifier() {
    let server = MockServer::start().await;

    // One login session: one PKCE pair.
    let session = pkce::generate().expect("pkce");

    // The token endpoint requires this session's verifier; any other
    // verifier fails the match and the .expect(1) below.
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=browser_code_42"))
        .and(body_string_contains(format!(
            "code_verifier={}",
            session.verifier
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "flow_access",
            "refresh_token": "flow_refresh",
            "expires_in": 7200
        })))
        .expect(1)
        .mount(&server)
        .await;

    // Listener is bound before the "browser" (this test) issues the
    // redirect, mirroring the flow's ordering invariant.
    let listener = CallbackListener::bind(0).await.expect("bind");
    let port = listener.port();
    let waiter = tokio::spawn(listener.wait(Duration::from_secs(5)));

    reqwest::get(format!(
        "http://127.0.0.1:{port}/callback?code=browser_code_42"
    ))
    .await
    .expect("redirect");

    let code = waiter.await.expect("join").expect("code");

    let exchanger = TokenExchanger::new(
        reqwest::Client::new(),
        "client".to_string(),
        "secret".to_string(),
    )
    .with_token_url(format!("{}/token", server.uri()));

    let token = exchanger
        .exchange_code(&code, &session.verifier)
        .await
        .expect("exchange");
    assert_eq!(token.access_token, "flow_access");

    server.verify().await;
}

#[tokio::test]
async fn test_denied_redirect_never_reaches_the_token_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let listener = CallbackListener::bind(0).await.expect("bind");
    let port = listener.port();
    let waiter = tokio::spawn(listener.wait(Duration::from_secs(5)));

    reqwest::get(format!(
        "http://127.0.0.1:{port}/callback?error=access_denied&error_description=nope"
    ))
    .await
    .expect("redirect");

    // The wait fails, so the flow would stop here without an exchange.
    waiter
        .await
        .expect("join")
        .expect_err("denial must fail the wait");

    server.verify().await;
}

#[test]
fn test_authorize_url_carries_challenge_of_the_session_verifier() {
    let session = pkce::generate().expect("pkce");
    let url = build_authorize_url("client-id", &session.challenge);

    // The URL must carry the challenge, never the verifier.
    assert!(url.contains(&session.challenge), "challenge missing: {url}");
    assert!(
        !url.contains(&session.verifier),
        "verifier must never appear in the authorize URL"
    );

    // And the challenge must be the S256 derivation of the verifier.
    let digest = Sha256::digest(session.verifier.as_bytes());
    let expected =
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice());
    assert_eq!(session.challenge, expected);
}

#[test]
fn test_distinct_sessions_produce_distinct_authorize_urls() {
    let a = pkce::generate().expect("pkce a");
    let b = pkce::generate().expect("pkce b");
    assert_ne!(
        build_authorize_url("client", &a.challenge),
        build_authorize_url("client", &b.challenge),
        "no cross-session challenge reuse"
    );
}
