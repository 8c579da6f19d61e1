use axum::{
    extract::{Extension, Query, State},
    Json,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    api::{handlers::types::parse_day, middleware::auth::CurrentUser, state::AppState},
    domain::{cents_to_pesos, ActivityLog},
    error::Result,
};

const DEFAULT_ACTIVITY_LIMIT: i64 = 100;
const MAX_ACTIVITY_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
pub struct CollectionsParams {
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CollectionRow {
    pub organization_id: i64,
    pub code: String,
    pub name: String,
    pub active_fees: i64,
    pub pending_requests: i64,
    pub total_collected: f64,
    pub collected_today: f64,
    pub collected_in_range: f64,
    pub payments_in_range: usize,
}

#[derive(Debug, Serialize)]
pub struct CollectionsReport {
    pub organizations: Vec<CollectionRow>,
    pub grand_total: f64,
}

pub async fn collections(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<CollectionsParams>,
) -> Result<Json<CollectionsReport>> {
    let officer = current.officer()?;

    let date_from = parse_day(params.date_from.as_deref(), "date_from")?;
    let date_to = parse_day(params.date_to.as_deref(), "date_to")?.map(|day| day + Duration::days(1));

    let summaries = state
        .service_context
        .report_service
        .collections_report(officer, date_from, date_to)
        .await?;

    let grand_total_cents: i64 = summaries.iter().map(|s| s.collected_in_range_cents).sum();
    let organizations = summaries
        .into_iter()
        .map(|summary| CollectionRow {
            organization_id: summary.organization_id,
            code: summary.code,
            name: summary.name,
            active_fees: summary.stats.active_fees,
            pending_requests: summary.stats.pending_requests,
            total_collected: cents_to_pesos(summary.stats.total_collected_cents),
            collected_today: cents_to_pesos(summary.stats.collected_today_cents),
            collected_in_range: cents_to_pesos(summary.collected_in_range_cents),
            payments_in_range: summary.payments_in_range,
        })
        .collect();

    Ok(Json(CollectionsReport {
        organizations,
        grand_total: cents_to_pesos(grand_total_cents),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ActivityParams {
    pub limit: Option<i64>,
}

pub async fn activity_log(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Query(params): Query<ActivityParams>,
) -> Result<Json<Vec<ActivityLog>>> {
    let officer = current.officer()?;
    let limit = params
        .limit
        .unwrap_or(DEFAULT_ACTIVITY_LIMIT)
        .clamp(1, MAX_ACTIVITY_LIMIT);

    let entries = state
        .service_context
        .report_service
        .activity_log(officer, limit)
        .await?;

    Ok(Json(entries))
}
