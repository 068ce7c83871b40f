use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::request_id::RequestId,
    models::{
        RecommendRequest, Recommendation, SearchParams, SearchResults, DEFAULT_SEARCH_LIMIT,
    },
    services::catalog::Fetched,
};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Recommends tracks or albums similar to the selected items
///
/// "Nothing usable to recommend from" is answered with an empty array;
/// authentication failures surface as errors.
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendRequest>,
) -> AppResult<Json<Vec<Recommendation>>> {
    let selected = request.selected_ids();

    tracing::info!(
        request_id = %request_id,
        selected = selected.len(),
        search_type = ?request.search_type,
        "Processing recommendation request"
    );

    match state.engine.recommend(&selected, request.search_type).await {
        Ok(recommendations) => {
            tracing::info!(
                request_id = %request_id,
                count = recommendations.len(),
                "Recommendation request completed"
            );
            Ok(Json(recommendations))
        }
        Err(e) if e.is_empty_result() => {
            tracing::warn!(request_id = %request_id, error = %e, "No recommendations possible");
            Ok(Json(Vec::new()))
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Recommendation request failed");
            Err(e)
        }
    }
}

/// Client-credentials access token, served from the gateway's cache when still valid
pub async fn token(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
) -> AppResult<Json<Value>> {
    let token = state.gateway.access_token().await.map_err(|e| {
        tracing::error!(request_id = %request_id, error = %e, "Token request failed");
        e
    })?;

    Ok(Json(json!({
        "access_token": token.as_str(),
        "token_type": "Bearer"
    })))
}

/// Searches the catalog for tracks or albums the client can then select
pub async fn search(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<SearchResults>> {
    let query = params.q.trim();
    if query.is_empty() {
        return Err(AppError::InvalidInput(
            "Query parameter 'q' must not be empty".to_string(),
        ));
    }

    tracing::info!(
        request_id = %request_id,
        query = %query,
        search_type = ?params.search_type,
        "Processing search request"
    );

    let token = state.gateway.access_token().await?;
    let limit = params.limit.unwrap_or(DEFAULT_SEARCH_LIMIT);

    match state
        .gateway
        .search(&token, query, params.search_type, limit)
        .await?
    {
        Fetched::Items(results) => {
            tracing::info!(
                request_id = %request_id,
                tracks = results.tracks.len(),
                albums = results.albums.len(),
                "Search request completed"
            );
            Ok(Json(results))
        }
        Fetched::ShapeError(raw) => {
            tracing::error!(request_id = %request_id, raw = %raw, "Unexpected search response");
            Err(AppError::GatewayShape(raw))
        }
    }
}
