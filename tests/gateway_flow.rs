//! Full login → protected request → logout flow through the public router.

use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use timelog::auth::hash_password;
use timelog::config::Config;
use timelog::gateway::{router, AppState};
use timelog::security::SecretKey;
use timelog::session::{SessionError, SessionTokens};

const USER_ID: &str = "3fe9a1c2-5b7d-4e8f-9a0b-1c2d3e4f5a6b";
const KEY_HEX: &str = "00112233445566778899aabbccddeeff";

fn app() -> Router {
    let mut config = Config::default();
    config
        .apply_env_overrides(|name| match name {
            "TIMELOG_SECRET_KEY" => Some(KEY_HEX.to_owned()),
            "TIMELOG_USERNAME" => Some("andras".to_owned()),
            "TIMELOG_PASSWORD_HASH" => Some(hash_password("correct horse").unwrap()),
            "TIMELOG_USER_ID" => Some(USER_ID.to_owned()),
            _ => None,
        })
        .unwrap();
    let auth = config.validate().unwrap();
    router(AppState::from_runtime(auth, &config.gateway).unwrap())
}

async fn send(app: &Router, request: Request<Body>) -> axum::response::Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn login(username: &str, password: &str) -> Request<Body> {
    let peer: SocketAddr = "198.51.100.4:51000".parse().unwrap();
    let mut request = Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password={password}")))
        .unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));
    request
}

#[tokio::test]
async fn login_then_access_then_logout() {
    let app = app();

    let response = send(&app, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");

    let response = send(&app, get("/login", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app, login("andras", "correct%20horse")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["hx-redirect"], "/");
    let set_cookie = response.headers()[header::SET_COOKIE]
        .to_str()
        .unwrap()
        .to_owned();
    let cookie = set_cookie.split(';').next().unwrap().to_owned();

    let response = send(&app, get("/api/me", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let me: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(me["user_id"], USER_ID);
    assert_eq!(me["username"], "andras");

    let response = send(&app, get("/logout", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let cleared = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cleared.starts_with("session=;"));
    assert!(cleared.contains("Expires=Thu, 01 Jan 1970"));
}

#[tokio::test]
async fn tampered_cookie_is_redirected() {
    let app = app();
    let response = send(&app, login("andras", "correct%20horse")).await;
    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    let token = set_cookie
        .strip_prefix("session=")
        .and_then(|rest| rest.split(';').next())
        .unwrap();

    // Flip a character in the ciphertext body. The last symbol carries
    // padding bits that a decoder may ignore.
    let mut chars: Vec<char> = token.chars().collect();
    let mid = chars.len() / 2;
    chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
    let tampered: String = chars.into_iter().collect();
    assert_ne!(tampered, token);

    // Decodes fine but fails authentication.
    let key = SecretKey::from_hex(KEY_HEX).unwrap();
    let tokens = SessionTokens::new(&key, Some(604_800)).unwrap();
    assert_eq!(tokens.verify(&tampered), Err(SessionError::InvalidToken));

    let response = send(&app, get("/api/me", Some(&format!("session={tampered}")))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[header::LOCATION], "/login");
}

#[tokio::test]
async fn wrong_password_and_unknown_user_look_the_same() {
    let app = app();
    let wrong = send(&app, login("andras", "nope")).await;
    let unknown = send(&app, login("nobody", "nope")).await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

    let wrong = wrong.into_body().collect().await.unwrap().to_bytes();
    let unknown = unknown.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn health_is_public() {
    let response = send(&app(), get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("request-id"));
}
