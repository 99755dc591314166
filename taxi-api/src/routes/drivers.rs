/// Driver endpoints
///
/// - `GET  /drivers/?username=&page=`
/// - `GET  /drivers/:id/`: driver with assigned cars and their manufacturers
/// - `POST /drivers/create/`: registration form
/// - `POST /drivers/:id/update/`: license number only
/// - `POST /drivers/:id/delete/`

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Json,
};
use taxi_shared::auth::password;
use taxi_shared::models::{
    Driver, DriverDetail, DriverFilter, DriverRegistration, DriverSearch, LicenseForm, NewDriver,
};
use taxi_shared::store::{Creator, Deleter, Fetcher, Lister, Updater};
use tracing::info;
use validator::Validate;

use super::{parse_id, ListResponse, PageParams};
use crate::{app::AppState, error::ApiResult};

const LIST_URL: &str = "/drivers/";

pub async fn list(
    State(state): State<AppState>,
    search: Option<Query<DriverSearch>>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<ListResponse<Driver, DriverSearch>>> {
    let search = search.map(|Query(search)| search).unwrap_or_default();
    let filter = search.filter();
    let page =
        Lister::<Driver, DriverFilter>::list(state.store.as_ref(), &filter, params.request()?)
            .await?;

    Ok(Json(ListResponse { page, search }))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<DriverDetail>> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.driver_detail(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<DriverRegistration>,
) -> ApiResult<Redirect> {
    form.check()?;

    let hash = password::hash_password(&form.password1)?;
    let driver =
        Creator::<Driver, NewDriver>::create(state.store.as_ref(), form.into_new_driver(hash))
            .await?;

    info!(driver_id = %driver.id, username = %driver.username, "Driver created");
    Ok(Redirect::to(LIST_URL))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<LicenseForm>,
) -> ApiResult<Redirect> {
    let id = parse_id(&id)?;
    Fetcher::<Driver>::fetch(state.store.as_ref(), id).await?;

    form.validate()?;
    Updater::<Driver, LicenseForm>::update(state.store.as_ref(), id, form).await?;

    Ok(Redirect::to(LIST_URL))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Redirect> {
    let id = parse_id(&id)?;
    Deleter::<Driver>::delete(state.store.as_ref(), id).await?;

    info!(driver_id = %id, "Driver deleted");
    Ok(Redirect::to(LIST_URL))
}
