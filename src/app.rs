use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{admin, auth, meals, nutrition, profile};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(profile::router())
                .merge(meals::router())
                .merge(nutrition::router())
                .merge(admin::router())
                .route("/health", get(|| async { "ok" })),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let app = build_app(AppState::fake());
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(v) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(v.to_string())
            }
            None => Body::empty(),
        };
        let res = app.oneshot(req.body(body).unwrap()).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn health() {
        let (status, body) = send(Method::GET, "/api/v1/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"ok");
    }

    #[tokio::test]
    async fn protein_endpoint_computes_target() {
        let (status, body) = send(
            Method::POST,
            "/api/v1/nutrition/protein",
            Some(json!({
                "weight": 70,
                "goal": "muscle-gain",
                "activity_level": "very-active",
                "sex": "male"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["recommended_protein_g"], 140);
        assert_eq!(v["multiplier"], 2.0);
        assert_eq!(v["goal"], "muscle-gain");
    }

    #[tokio::test]
    async fn protein_endpoint_reports_fields() {
        let (status, body) = send(
            Method::POST,
            "/api/v1/nutrition/protein",
            Some(json!({ "weight": "abc", "sex": "male", "age": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert!(v["errors"]["weight"].is_string());
        assert!(v["errors"]["age"].is_string());
        assert!(v["errors"].get("sex").is_none());
    }

    #[tokio::test]
    async fn time_slots_are_public() {
        let (status, body) = send(Method::GET, "/api/v1/meals/time-slots", None).await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["slots"].as_array().map(Vec::len), Some(33));
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        for (method, uri) in [
            (Method::GET, "/api/v1/me"),
            (Method::GET, "/api/v1/meals"),
            (Method::GET, "/api/v1/profile"),
            (Method::GET, "/api/v1/meals/days/Monday"),
            (Method::GET, "/api/v1/admin/users"),
        ] {
            let (status, _) = send(method, uri, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn refresh_tokens_are_not_access_tokens() {
        use crate::auth::jwt::JwtKeys;
        use axum::extract::FromRef;

        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let refresh = keys.sign_refresh(uuid::Uuid::new_v4()).unwrap();

        let req = Request::builder()
            .uri("/api/v1/meals")
            .header(header::AUTHORIZATION, format!("Bearer {refresh}"))
            .body(Body::empty())
            .unwrap();
        let res = build_app(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn bad_email_is_rejected_before_touching_the_database() {
        let (status, _) = send(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": "not-an-email", "password": "longenough" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            Method::POST,
            "/api/v1/auth/register",
            Some(json!({ "email": "student@uni.edu", "password": "short" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
