/// Home page
///
/// ```text
/// GET /
/// ```
///
/// Returns the number of drivers, cars and manufacturers, and how many
/// times this session has loaded the page (including this visit).

use axum::{extract::State, Json};
use serde::Serialize;
use taxi_shared::store::FleetCounts;
use tower_sessions::Session;

use crate::{app::AppState, error::ApiResult};

/// Session key of the visit counter
pub const VISITS_KEY: &str = "num_visits";

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub num_drivers: u64,
    pub num_cars: u64,
    pub num_manufacturers: u64,
    pub num_visits: u64,
}

pub async fn index(State(state): State<AppState>, session: Session) -> ApiResult<Json<IndexResponse>> {
    let FleetCounts {
        drivers,
        cars,
        manufacturers,
    } = state.store.counts().await?;

    let num_visits = session.get::<u64>(VISITS_KEY).await?.unwrap_or(0) + 1;
    session.insert(VISITS_KEY, num_visits).await?;

    Ok(Json(IndexResponse {
        num_drivers: drivers,
        num_cars: cars,
        num_manufacturers: manufacturers,
        num_visits,
    }))
}
