/// Manufacturer endpoints
///
/// - `GET  /manufacturers/?name=&page=`
/// - `POST /manufacturers/create/`
/// - `POST /manufacturers/:id/update/`
/// - `POST /manufacturers/:id/delete/`

use axum::{
    extract::{Path, Query, State},
    response::Redirect,
    Json,
};
use taxi_shared::models::{Manufacturer, ManufacturerFilter, ManufacturerForm, ManufacturerSearch};
use taxi_shared::store::{Creator, Deleter, Fetcher, Lister, Updater};
use tracing::info;
use validator::Validate;

use super::{parse_id, ListResponse, PageParams};
use crate::{app::AppState, error::ApiResult};

const LIST_URL: &str = "/manufacturers/";

pub async fn list(
    State(state): State<AppState>,
    search: Option<Query<ManufacturerSearch>>,
    Query(params): Query<PageParams>,
) -> ApiResult<Json<ListResponse<Manufacturer, ManufacturerSearch>>> {
    // a query string that does not deserialize is an unfiltered search
    let search = search.map(|Query(search)| search).unwrap_or_default();
    let filter = search.filter();
    let page = Lister::<Manufacturer, ManufacturerFilter>::list(
        state.store.as_ref(),
        &filter,
        params.request()?,
    )
    .await?;

    Ok(Json(ListResponse { page, search }))
}

pub async fn create(
    State(state): State<AppState>,
    Json(form): Json<ManufacturerForm>,
) -> ApiResult<Redirect> {
    let form = form.normalized();
    form.validate()?;

    let manufacturer =
        Creator::<Manufacturer, ManufacturerForm>::create(state.store.as_ref(), form).await?;

    info!(manufacturer_id = %manufacturer.id, name = %manufacturer.name, "Manufacturer created");
    Ok(Redirect::to(LIST_URL))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(form): Json<ManufacturerForm>,
) -> ApiResult<Redirect> {
    let id = parse_id(&id)?;
    Fetcher::<Manufacturer>::fetch(state.store.as_ref(), id).await?;

    let form = form.normalized();
    form.validate()?;
    Updater::<Manufacturer, ManufacturerForm>::update(state.store.as_ref(), id, form).await?;

    Ok(Redirect::to(LIST_URL))
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Redirect> {
    let id = parse_id(&id)?;
    Deleter::<Manufacturer>::delete(state.store.as_ref(), id).await?;

    info!(manufacturer_id = %id, "Manufacturer deleted");
    Ok(Redirect::to(LIST_URL))
}
