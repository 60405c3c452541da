use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Json, Router,
};
use tracing::{info, instrument, warn};
use url::Url;

use super::dto::{Ack, ConfigureSourceRequest, SourceConfigView};
use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    state::AppState,
    users::{SourceConfigInput, StoreError},
};

pub fn source_routes() -> Router<AppState> {
    Router::new().route(
        "/external-source/config",
        get(get_source_config).post(configure_source),
    )
}

fn validate_source_url(raw: &str) -> Result<String, AppError> {
    let raw = raw.trim();
    let url = Url::parse(raw)
        .map_err(|_| AppError::Validation("sourceUrl must be a valid URL".into()))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().map_or(true, str::is_empty) {
        return Err(AppError::Validation(
            "sourceUrl must be an http(s) URL with a host".into(),
        ));
    }
    Ok(raw.to_string())
}

fn validate(req: ConfigureSourceRequest) -> Result<SourceConfigInput, AppError> {
    let source_url = validate_source_url(&req.source_url)?;
    if req.secret.trim().is_empty() {
        return Err(AppError::Validation("secret is required".into()));
    }
    let schema = req
        .schema
        .ok_or_else(|| AppError::Validation("schema is required".into()))?;

    Ok(SourceConfigInput {
        source_url,
        secret: req.secret,
        table_name: req.table_name,
        schema,
    })
}

#[instrument(skip(state, auth, payload), fields(user_id = %auth.id, role = %auth.role))]
pub async fn configure_source(
    State(state): State<AppState>,
    auth: AuthUser,
    payload: Result<Json<ConfigureSourceRequest>, JsonRejection>,
) -> Result<Json<Ack>, AppError> {
    let Json(payload) = payload?;
    let input = validate(payload).map_err(|e| {
        warn!(error = %e, "source config rejected");
        e
    })?;

    state
        .users
        .set_source_config(auth.id, input)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound("user not found"),
            other => other.into(),
        })?;

    info!("external source configured");
    Ok(Json(Ack {
        message: "external source configured",
    }))
}

/// Only ever reads the caller's own row; the id comes from the token.
#[instrument(skip(state, auth), fields(user_id = %auth.id, role = %auth.role))]
pub async fn get_source_config(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<SourceConfigView>, AppError> {
    let config = state
        .users
        .get_source_config(auth.id)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::NotFound("external source not configured"),
            other => other.into(),
        })?;
    Ok(Json(config.into()))
}
