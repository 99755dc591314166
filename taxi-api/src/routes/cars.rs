/// Car endpoints
///
/// - `GET  /cars/?model=&page=`
/// - `GET  /cars/:id/`
/// - `POST /cars/create/`
/// - `POST /cars/:id/update/`
/// - `POST /cars/:id/delete/`
/// - `POST /cars/:id/toggle-assign/`
///
/// Car forms carry a manufacturer id and a non-empty list of driver ids:
///
/// ```json
/// { "model": "Corolla", "manufacturer": "<uuid>", "drivers": ["<uuid>"] }
/// ```

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Extension, Json,
};
use taxi_shared::models::{Car, CarData, CarDetail, CarFilter, CarForm, CarSearch};
use taxi_shared::store::{Creator, Deleter, Fetcher, Lister, Updater};
use tracing::info;

use super::{parse_id, ListResponse, PageParams};
use crate::{app::AppState, error::ApiResult, middleware::auth::AuthContext};

const LIST_URL: &str = "/cars/";

pub async fn list(
    State(state): State<AppState>,
    search: Option<Query<CarSearch>>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<ListResponse<Car, CarSearch>>> {
    let search = search.map(|Query(search)| search).unwrap_or_default();
    let filter = search.filter();
    let page =
        Lister::<Car, CarFilter>::list(state.store.as_ref(), &filter, params.request()?).await?;

    Ok(Json(ListResponse { page, search }))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<CarDetail>> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.car_detail(id).await?))
}

pub async fn create(State(state): State<AppState>, Json(form): Json<CarForm>) -> ApiResult<Redirect> {
    let data = CarData::try_from(form)?;
    let car = Creator::<Car, CarData>::create(state.store.as_ref(), data).await?;

    info!(car_id = %car.id, model = %car.model, "Car created");
    Ok(Redirect::to(LIST_URL))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<CarForm>,
) -> ApiResult<Redirect> {
    let id = parse_id(&id)?;
    Fetcher::<Car>::fetch(state.store.as_ref(), id).await?;

    let data = CarData::try_from(form)?;
    Updater::<Car, CarData>::update(state.store.as_ref(), id, data).await?;

    Ok(Redirect::to(LIST_URL))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Redirect> {
    let id = parse_id(&id)?;
    Deleter::<Car>::delete(state.store.as_ref(), id).await?;

    info!(car_id = %id, "Car deleted");
    Ok(Redirect::to(LIST_URL))
}

/// Assigns the logged-in driver to the car, or unassigns them if already assigned
pub async fn toggle_assign(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Redirect> {
    let car_id = parse_id(&id)?;
    let assignment = state.store.toggle_assignment(auth.driver_id, car_id).await?;

    info!(
        driver_id = %auth.driver_id,
        car_id = %car_id,
        state = assignment.as_str(),
        "Car assignment toggled"
    );
    Ok(Redirect::to(LIST_URL))
}
