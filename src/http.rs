//! HTTP control plane
//!
//! - `POST /submitMessage` - inject a message (JSON body)
//! - `GET /getLogs` - raw service log
//! - `GET /stats` - user/channel/message counts

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::control::{ControlPlane, InjectOutcome, InjectRequest};
use crate::error::ChatError;

/// Build the control-plane router
pub fn create_router(control: Arc<ControlPlane>) -> Router {
    Router::new()
        .route("/submitMessage", post(submit_message))
        .route("/getLogs", get(get_logs))
        .route("/stats", get(get_stats))
        .with_state(control)
}

/// Serve the control plane on `addr` until the listener fails
pub async fn serve(addr: &str, control: Arc<ControlPlane>) -> Result<(), ChatError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Control plane listening on {}", listener.local_addr()?);
    axum::serve(listener, create_router(control)).await?;
    Ok(())
}

async fn submit_message(State(control): State<Arc<ControlPlane>>, body: Bytes) -> Response {
    let request: InjectRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!("JSON decoding error: {}", e);
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    let text = match control.inject_message(&request).await {
        Ok(InjectOutcome::Delivered) => "Message submitted successfully",
        Ok(InjectOutcome::ChannelNotFound) => "Channel does not exist",
        Ok(InjectOutcome::UserNotFound) => "User does not exist",
        Err(e) => {
            warn!("Message submission error: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    (StatusCode::OK, text).into_response()
}

async fn get_logs(State(control): State<Arc<ControlPlane>>) -> Response {
    match control.read_recent_log().await {
        Ok(contents) => (StatusCode::OK, contents).into_response(),
        Err(e) => {
            warn!("Log file reading error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_stats(State(control): State<Arc<ControlPlane>>) -> Response {
    Json(control.read_stats().await).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::util::ServiceExt;

    use super::*;
    use crate::service::ChatService;

    fn app(log_file: &std::path::Path) -> (Router, ChatService) {
        let service = ChatService::default();
        let control = Arc::new(ControlPlane::new(service.clone(), log_file));
        (create_router(control), service)
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn submit(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/submitMessage")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_submit_message_variants() {
        let cases = [
            (r#"{"message":"hello"}"#, "Message submitted successfully"),
            (r#"{"user":"foo", "message":"hello"}"#, "User does not exist"),
            (r#"{"channel":"foo", "message":"hello"}"#, "Channel does not exist"),
        ];

        let (router, _service) = app(std::path::Path::new("missing.log"));
        for (body, expected) in cases {
            let response = router.clone().oneshot(submit(body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_text(response).await, expected);
        }
    }

    #[tokio::test]
    async fn test_submit_message_bad_json() {
        let (router, service) = app(std::path::Path::new("missing.log"));

        let response = router.oneshot(submit(r#"{"foo:"foo"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!body_text(response).await.is_empty());
        assert_eq!(service.stats().messages_sent(), 0);
    }

    #[tokio::test]
    async fn test_get_stats() {
        let (router, service) = app(std::path::Path::new("missing.log"));
        service.directory().create_channel("foochannel").await.unwrap();

        let response = router
            .clone()
            .oneshot(submit(r#"{"message":"hello"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(Request::builder().uri("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_text(response).await,
            r#"{"channels":1,"messages_sent":1,"users":0}"#
        );
    }

    #[tokio::test]
    async fn test_get_logs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.log");
        std::fs::write(&path, "created telnet server\n").unwrap();
        let (router, _service) = app(&path);

        let response = router
            .oneshot(Request::builder().uri("/getLogs").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "created telnet server\n");
    }

    #[tokio::test]
    async fn test_get_logs_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let (router, _service) = app(&dir.path().join("absent.log"));

        let response = router
            .oneshot(Request::builder().uri("/getLogs").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
