use infra::{
    db::Db,
    models::{ItemRow, PlaceRow, PlaceSummaryRow, ReviewRow},
    repos::{items, places, reviews},
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::response::PageRequest;

/// Place with its review aggregate, as shown on the detail page.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceDetail {
    #[serde(flatten)]
    pub place: PlaceRow,
    pub rating_average: Option<f64>,
    pub rating_count: i64,
}

pub async fn get_place(db: &Db, place_id: Uuid) -> Result<PlaceRow, AppError> {
    places::get_by_id(db, place_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Place not found".into()))
}

pub async fn get_owner_of_place(db: &Db, place_id: Uuid) -> Result<Uuid, AppError> {
    places::get_owner_id(db, place_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Place not found".into()))
}

pub async fn get_place_detail(db: &Db, place_id: Uuid) -> Result<PlaceDetail, AppError> {
    let place = get_place(db, place_id).await?;
    let (rating_average, rating_count) = places::rating_summary(db, place_id).await?;

    Ok(PlaceDetail {
        place,
        rating_average,
        rating_count,
    })
}

/// Returns the page of summaries and the total number of places.
pub async fn list_places_paged(
    db: &Db,
    page: PageRequest,
) -> Result<(Vec<PlaceSummaryRow>, i64), AppError> {
    let rows = places::list_summaries(db, page.limit_offset()).await?;
    let total = places::count(db).await?;
    Ok((rows, total))
}

pub async fn list_items(db: &Db, place_id: Uuid) -> Result<Vec<ItemRow>, AppError> {
    get_place(db, place_id).await?;
    Ok(items::list_by_place(db, place_id).await?)
}

pub async fn list_reviews_paged(
    db: &Db,
    place_id: Uuid,
    page: PageRequest,
) -> Result<(Vec<ReviewRow>, i64), AppError> {
    get_place(db, place_id).await?;
    let rows = reviews::list_by_place(db, place_id, page.limit_offset()).await?;
    let total = reviews::count_by_place(db, place_id).await?;
    Ok((rows, total))
}
