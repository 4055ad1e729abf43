use std::sync::Arc;

use mockito::{Matcher, Server};
use pianotutor_core::auth::ValidationError;
use pianotutor_core::storage::{KEY_TOKEN, KEY_TOKEN_TIMESTAMP};
use pianotutor_core::{
    ApiError, AuthError, AuthService, Config, JsonFileStore, KeyValueStore, MemoryStore,
    RequestOutcome, SuccessConvention,
};

fn config_for(server: &Server) -> Config {
    Config {
        base_url: server.url(),
        ..Config::default()
    }
}

async fn service_for(server: &Server) -> (AuthService, Arc<MemoryStore>) {
    let storage = Arc::new(MemoryStore::new());
    let service = AuthService::connect(&config_for(server), storage.clone())
        .await
        .unwrap();
    (service, storage)
}

#[tokio::test]
async fn login_stores_token_and_authenticates_later_requests() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/users/auth/login")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::Json(
            serde_json::json!({"username": "ada", "password": "keys"}),
        ))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code":200,"msg":"Success","data":{"token":"tok-1"}}"#)
        .create_async()
        .await;
    let progress = server
        .mock("GET", "/practice/progress")
        .match_header("authorization", "Bearer tok-1")
        .with_status(200)
        .with_body(r#"{"code":200,"msg":"Success","data":{"minutes":45}}"#)
        .create_async()
        .await;

    let (service, storage) = service_for(&server).await;
    let response = service.login(" ada ", "keys").await.unwrap();
    assert_eq!(response.token, "tok-1");
    assert!(service.session().is_authenticated());
    assert_eq!(
        storage.get_string(KEY_TOKEN).await.unwrap().as_deref(),
        Some("tok-1")
    );
    assert!(storage.get_i64(KEY_TOKEN_TIMESTAMP).await.unwrap().unwrap() > 0);

    let outcome: RequestOutcome<serde_json::Value> =
        service.api().get("practice/progress").await;
    match outcome {
        RequestOutcome::Success(data) => assert_eq!(data["minutes"], 45),
        other => panic!("expected success, got {:?}", other),
    }

    login.assert_async().await;
    progress.assert_async().await;
}

#[tokio::test]
async fn login_business_failure_leaves_session_empty() {
    let mut server = Server::new_async().await;
    let _login = server
        .mock("POST", "/users/auth/login")
        .with_status(200)
        .with_body(r#"{"code":500,"msg":"invalid credentials","data":null}"#)
        .create_async()
        .await;

    let (service, storage) = service_for(&server).await;
    let err = service.login("ada", "wrong").await.unwrap_err();

    assert!(matches!(err, AuthError::Business { code: 500, .. }));
    assert_eq!(err.user_message(), "invalid credentials");
    assert!(!service.session().is_authenticated());
    assert_eq!(storage.get_string(KEY_TOKEN).await.unwrap(), None);
}

#[tokio::test]
async fn rejected_login_keeps_the_current_session() {
    let mut server = Server::new_async().await;
    let login = server
        .mock("POST", "/users/auth/login")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_body(r#"{"code":401,"msg":"bad credentials"}"#)
        .create_async()
        .await;

    let (service, storage) = service_for(&server).await;
    service.session().write(Some("tok-current".to_string())).await;

    let err = service.login("ada", "wrong").await.unwrap_err();

    login.assert_async().await;
    assert!(err.is_unauthorized());
    assert_eq!(service.session().read().as_deref(), Some("tok-current"));
    assert_eq!(
        storage.get_string(KEY_TOKEN).await.unwrap().as_deref(),
        Some("tok-current")
    );
}

#[tokio::test]
async fn validation_failures_never_reach_the_server() {
    let mut server = Server::new_async().await;
    let any_request = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let (service, _) = service_for(&server).await;

    let err = service.register("ada", "one", "two").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Validation(ValidationError::PasswordMismatch)
    ));

    let err = service.forgot_password("  ", "pw", "pw").await.unwrap_err();
    assert!(matches!(
        err,
        AuthError::Validation(ValidationError::EmptyUsername)
    ));

    let err = service.login("ada", "").await.unwrap_err();
    assert_eq!(err.user_message(), "Username and password required");

    any_request.assert_async().await;
}

#[tokio::test]
async fn register_sends_only_username_and_password() {
    let mut server = Server::new_async().await;
    let register = server
        .mock("POST", "/users/auth/register")
        .match_body(Matcher::Json(
            serde_json::json!({"username": "ada", "password": "keys"}),
        ))
        .with_status(200)
        .with_body(r#"{"code":200,"msg":"Success","data":"registered"}"#)
        .create_async()
        .await;

    let (service, _) = service_for(&server).await;
    let message = service.register("ada", "keys", "keys").await.unwrap();

    assert_eq!(message, "registered");
    assert!(!service.session().is_authenticated());
    register.assert_async().await;
}

#[tokio::test]
async fn forgot_password_reports_http_errors() {
    let mut server = Server::new_async().await;
    let _reset = server
        .mock("POST", "/users/auth/forgot-password")
        .with_status(404)
        .with_body(r#"{"code":404,"msg":"no such user"}"#)
        .create_async()
        .await;

    let (service, _) = service_for(&server).await;
    let err = service
        .forgot_password("ghost", "new-pw", "new-pw")
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::Business { code: 404, ref message } if message == "no such user"));
}

#[tokio::test]
async fn logout_clears_session_even_when_server_fails() {
    let mut server = Server::new_async().await;
    let logout = server
        .mock("POST", "/users/auth/logout")
        .match_header("authorization", "Bearer tok-2")
        .with_status(503)
        .with_body("maintenance")
        .create_async()
        .await;

    let (service, storage) = service_for(&server).await;
    service.session().write(Some("tok-2".to_string())).await;

    let err = service.logout().await.unwrap_err();

    assert!(matches!(err, AuthError::Business { code: 503, .. }));
    assert!(!service.session().is_authenticated());
    assert_eq!(storage.get_string(KEY_TOKEN).await.unwrap(), None);
    logout.assert_async().await;
}

#[tokio::test]
async fn logout_succeeds_without_payload() {
    let mut server = Server::new_async().await;
    let _logout = server
        .mock("POST", "/users/auth/logout")
        .with_status(200)
        .with_body(r#"{"code":200,"msg":"Success","data":null}"#)
        .create_async()
        .await;

    let (service, _) = service_for(&server).await;
    service.session().write(Some("tok-3".to_string())).await;

    service.logout().await.unwrap();
    assert_eq!(service.session().read(), None);
}

#[tokio::test]
async fn logout_clears_session_when_server_is_unreachable() {
    let config = Config {
        base_url: "http://127.0.0.1:9".to_string(),
        connect_timeout_secs: 2,
        request_timeout_secs: 2,
        ..Config::default()
    };
    let service = AuthService::connect(&config, Arc::new(MemoryStore::new()))
        .await
        .unwrap();
    service.session().write(Some("tok-4".to_string())).await;

    let err = service.logout().await.unwrap_err();

    assert!(matches!(err, AuthError::Transport(ApiError::NetworkError(_))));
    assert!(err.user_message().starts_with("Request failed:"));
    assert!(!service.session().is_authenticated());
}

#[tokio::test]
async fn zero_code_convention_is_honoured() {
    let mut server = Server::new_async().await;
    let _login = server
        .mock("POST", "/users/auth/login")
        .with_status(200)
        .with_body(r#"{"code":0,"msg":"Success","data":{"token":"tok-zero"}}"#)
        .create_async()
        .await;

    let config = Config {
        success_convention: SuccessConvention::ZeroWithSuccessMsg,
        ..config_for(&server)
    };
    let service = AuthService::connect(&config, Arc::new(MemoryStore::new()))
        .await
        .unwrap();

    service.login("ada", "keys").await.unwrap();
    assert_eq!(service.session().read().as_deref(), Some("tok-zero"));
}

#[tokio::test]
async fn session_survives_restart_with_file_storage() {
    let mut server = Server::new_async().await;
    let _login = server
        .mock("POST", "/users/auth/login")
        .with_status(200)
        .with_body(r#"{"code":200,"msg":"Success","data":{"token":"tok-disk"}}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = config_for(&server);
    {
        let storage = Arc::new(JsonFileStore::in_dir(dir.path()));
        let service = AuthService::connect(&config, storage).await.unwrap();
        service.login("ada", "keys").await.unwrap();
    }

    let storage = Arc::new(JsonFileStore::in_dir(dir.path()));
    let restarted = AuthService::connect(&config, storage).await.unwrap();
    assert_eq!(restarted.session().read().as_deref(), Some("tok-disk"));
}
