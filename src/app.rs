use std::{net::SocketAddr, time::Duration};

use axum::{
    body::Body,
    http::{Request, Response},
    middleware,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, error, field, info, info_span, Span};

use crate::{auth, sources, state::AppState};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "lead-central-api" }))
}

pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(auth::handlers::me_routes())
        .merge(sources::router())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::extractors::require_auth,
        ));

    Router::new()
        .merge(auth::router())
        .nest("/api", protected)
        .route("/health", get(health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(record_response),
        )
}

/// Path only: query strings are never logged.
fn request_span(req: &Request<Body>) -> Span {
    info_span!(
        "request",
        method = %req.method(),
        path = req.uri().path(),
        status = field::Empty,
        latency_ms = field::Empty,
    )
}

fn record_response(res: &Response<Body>, latency: Duration, span: &Span) {
    let status = res.status();
    span.record("status", status.as_u16());
    span.record("latency_ms", latency.as_millis() as u64);
    if status.is_server_error() {
        error!(status = status.as_u16(), "request failed");
    } else {
        debug!(status = status.as_u16(), "request done");
    }
}

pub async fn serve(app: Router, host: &str, port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::users::memory::MemoryUserRepository;

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(b.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn register_and_login(app: &Router, email: &str) -> (String, String) {
        let (status, user) = call(
            app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"name": "User", "email": email, "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = call(
            app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": email, "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["token"].as_str().unwrap().to_string(),
            user["id"].as_str().unwrap().to_string(),
        )
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(AppState::fake());
        let (status, body) = call(&app, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn full_scenario() {
        let state = AppState::fake();
        let app = build_app(state.clone());

        let (status, user) = call(
            &app,
            "POST",
            "/auth/register",
            None,
            Some(json!({"name": "Ana", "email": "ana@x.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["name"], "Ana");
        assert_eq!(user["email"], "ana@x.com");
        assert!(user.get("passwordHash").is_none());
        assert!(user.get("password_hash").is_none());
        let user_id = user["id"].as_str().unwrap().to_string();

        let (status, login) = call(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "ana@x.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(login["user"]["id"], user_id.as_str());
        let token = login["token"].as_str().unwrap().to_string();
        let claims = state.jwt.verify(&token).unwrap();
        assert_eq!(claims.sub.to_string(), user_id);

        let (status, _) = call(&app, "GET", "/api/external-source/config", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, ack) = call(
            &app,
            "POST",
            "/api/external-source/config",
            Some(&token),
            Some(json!({"sourceUrl": "https://s.example", "secret": "k1", "schema": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(ack["message"].is_string());

        let (status, cfg) = call(&app, "GET", "/api/external-source/config", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cfg["sourceUrl"], "https://s.example");
        assert_eq!(cfg["secret"], "k1");
        assert_eq!(cfg["tableName"], "leads");
        assert_eq!(cfg["schema"], json!({}));
        assert!(cfg.get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts() {
        let app = build_app(AppState::fake());
        let body = json!({"name": "Ana", "email": "ana@x.com", "password": "secret1"});
        let (status, first) = call(&app, "POST", "/auth/register", None, Some(body.clone())).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = call(&app, "POST", "/auth/register", None, Some(body)).await;
        assert_eq!(status, StatusCode::CONFLICT);

        // original account still logs in and is the same user
        let (status, login) = call(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "ana@x.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(login["user"]["id"], first["id"]);
    }

    #[tokio::test]
    async fn register_validation_is_400() {
        let app = build_app(AppState::fake());
        for body in [
            json!({"name": "", "email": "ana@x.com", "password": "secret1"}),
            json!({"name": "Ana", "email": "not-an-email", "password": "secret1"}),
            json!({"name": "Ana", "email": "ana@x.com", "password": "12345"}),
            json!({"email": "ana@x.com"}),
        ] {
            let (status, err) = call(&app, "POST", "/auth/register", None, Some(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(err["error"].is_string());
        }
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .method("POST")
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let app = build_app(AppState::fake());
        register_and_login(&app, "ana@x.com").await;

        let (wrong_pw_status, wrong_pw) = call(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "ana@x.com", "password": "secret2"})),
        )
        .await;
        let (unknown_status, unknown) = call(
            &app,
            "POST",
            "/auth/login",
            None,
            Some(json!({"email": "nobody@x.com", "password": "secret1"})),
        )
        .await;

        assert_eq!(wrong_pw_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_pw, unknown);
    }

    #[tokio::test]
    async fn protected_routes_require_valid_token() {
        let app = build_app(AppState::fake());

        let (status, _) = call(&app, "GET", "/api/external-source/config", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(&app, "GET", "/api/me", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = call(
            &app,
            "POST",
            "/api/external-source/config",
            Some("garbage"),
            Some(json!({"sourceUrl": "https://s.example", "secret": "k1", "schema": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        // token signed with someone else's secret
        let foreign = crate::auth::jwt::JwtKeys::new(b"not-ours", time::Duration::hours(1))
            .issue(uuid::Uuid::new_v4(), "admin")
            .unwrap();
        let (status, _) = call(&app, "GET", "/api/me", Some(&foreign), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_returns_caller_and_first_user_is_admin() {
        let app = build_app(AppState::fake());
        let (admin_token, admin_id) = register_and_login(&app, "first@x.com").await;
        let (member_token, _) = register_and_login(&app, "second@x.com").await;

        let (status, me) = call(&app, "GET", "/api/me", Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], admin_id.as_str());
        assert_eq!(me["role"], "admin");

        let (_, me) = call(&app, "GET", "/api/me", Some(&member_token), None).await;
        assert_eq!(me["role"], "member");
    }

    #[tokio::test]
    async fn config_is_scoped_to_caller() {
        let app = build_app(AppState::fake());
        let (ana, _) = register_and_login(&app, "ana@x.com").await;
        let (bob, _) = register_and_login(&app, "bob@x.com").await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/external-source/config",
            Some(&ana),
            Some(json!({
                "sourceUrl": "https://ana.example",
                "secret": "ana-key",
                "tableName": "prospects",
                "schema": {"columns": [{"name": "id"}]}
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = call(&app, "GET", "/api/external-source/config", Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, cfg) = call(&app, "GET", "/api/external-source/config", Some(&ana), None).await;
        assert_eq!(cfg["tableName"], "prospects");
        assert_eq!(cfg["secret"], "ana-key");
    }

    #[tokio::test]
    async fn config_validation_is_400() {
        let app = build_app(AppState::fake());
        let (token, _) = register_and_login(&app, "ana@x.com").await;
        for body in [
            json!({"sourceUrl": "nope", "secret": "k1", "schema": {}}),
            json!({"sourceUrl": "https://s.example", "secret": "", "schema": {}}),
            json!({"sourceUrl": "https://s.example", "secret": "k1"}),
        ] {
            let (status, _) = call(
                &app,
                "POST",
                "/api/external-source/config",
                Some(&token),
                Some(body),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn unreadable_secret_is_500_without_detail() {
        let repo = Arc::new(MemoryUserRepository::new());
        let app = build_app(AppState::fake_with(repo.clone()));
        let (token, user_id) = register_and_login(&app, "ana@x.com").await;

        let (status, _) = call(
            &app,
            "POST",
            "/api/external-source/config",
            Some(&token),
            Some(json!({"sourceUrl": "https://s.example", "secret": "k1", "schema": {}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        repo.corrupt_secret(user_id.parse().unwrap(), "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA")
            .await;

        let (status, body) = call(&app, "GET", "/api/external-source/config", Some(&token), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "internal server error");
    }
}
