use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json,
};

use crate::{
    api::{
        errors::LinkServiceError,
        service::LinkService,
        types::{LinksResponse, OptionsResponse, StatsQueryParams, StatsResponse},
    },
    links::generator::LinkRequest,
    state::State as AppState,
};

pub async fn generate_links(
    state: State<AppState>,
    payload: Result<Json<LinkRequest>, JsonRejection>,
) -> Result<Json<LinksResponse>, LinkServiceError> {
    let Json(request) =
        payload.map_err(|e| LinkServiceError::RequestParsingError(e.body_text()))?;
    let outcome = LinkService::new(&state).generate_links(&request).await?;
    Ok(Json(LinksResponse {
        links: outcome.lines,
    }))
}

pub async fn options(state: State<AppState>) -> Result<Json<OptionsResponse>, LinkServiceError> {
    Ok(Json(LinkService::new(&state).options().await?))
}

pub async fn stats(
    state: State<AppState>,
    Query(params): Query<StatsQueryParams>,
) -> Result<Json<StatsResponse>, LinkServiceError> {
    Ok(Json(LinkService::new(&state).stats(params.date).await?))
}
