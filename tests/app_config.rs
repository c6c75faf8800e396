#[path = "common/mod.rs"]
mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::EnvGuard;
use once_cell::sync::Lazy;
use tokio::sync::Mutex;
use tower::ServiceExt;
use wabridge::{app, build_state, AppConfig};

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

#[tokio::test]
async fn rejects_invalid_boolean_env_values() {
    let _lock = ENV_MUTEX.lock().await;
    let mut env = EnvGuard::new();
    env.remove("LOG_STDOUT");
    env.set("LOG_ROTATE_COMPRESS", "maybe");

    let err = AppConfig::from_env().expect_err("expected invalid boolean to error");
    assert!(format!("{}", err).contains("LOG_ROTATE_COMPRESS"));
}

#[tokio::test]
async fn unreadable_profile_fails_startup() {
    let _lock = ENV_MUTEX.lock().await;
    let mut env = EnvGuard::new();
    env.remove("LOG_ROTATE_COMPRESS");
    env.set("BRIDGE_PROFILE", "/nonexistent/wabridge-profile.json");

    let err = AppConfig::from_env().expect_err("missing profile must error");
    assert!(format!("{:#}", err).contains("BRIDGE_PROFILE"));
}

#[tokio::test]
async fn verify_token_comes_from_environment() {
    let _lock = ENV_MUTEX.lock().await;
    let mut env = EnvGuard::new();
    env.remove("LOG_ROTATE_COMPRESS");
    env.remove("BRIDGE_PROFILE");
    env.remove("LOG_FILE");
    env.remove("PORT");
    env.set("VERIFY_TOKEN", "from-env");

    let state = build_state(AppConfig::from_env().unwrap()).unwrap();
    let req = Request::builder()
        .uri("/webhook?hub.mode=subscribe&hub.verify_token=from-env&hub.challenge=ok")
        .body(Body::empty())
        .unwrap();
    let resp = app(state).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn verify_token_whitespace_is_significant() {
    let _lock = ENV_MUTEX.lock().await;
    let mut env = EnvGuard::new();
    env.remove("LOG_ROTATE_COMPRESS");
    env.remove("BRIDGE_PROFILE");
    env.remove("LOG_FILE");
    env.remove("PORT");
    env.set("VERIFY_TOKEN", "tok ");

    let config = AppConfig::from_env().unwrap();
    assert_eq!(config.verify_token.as_deref(), Some("tok "));
    let router = app(build_state(config).unwrap());

    for (token, expected) in [("tok%20", StatusCode::OK), ("tok", StatusCode::FORBIDDEN)] {
        let req = Request::builder()
            .uri(format!(
                "/webhook?hub.mode=subscribe&hub.verify_token={token}&hub.challenge=ok"
            ))
            .body(Body::empty())
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), expected, "{token}");
    }
}

#[tokio::test]
async fn invalid_port_fails_startup() {
    let _lock = ENV_MUTEX.lock().await;
    let mut env = EnvGuard::new();
    env.remove("LOG_ROTATE_COMPRESS");
    env.remove("BRIDGE_PROFILE");
    env.set("PORT", "abc");

    let err = AppConfig::from_env().expect_err("non-numeric PORT must error");
    assert!(format!("{}", err).contains("PORT"));
}
