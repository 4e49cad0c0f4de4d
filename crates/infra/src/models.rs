use crate::repos::bookings::BookingStatus;
use crate::repos::disbursements::DisbursementStatus;
use crate::repos::users::UserRole;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BusinessOwnerRow {
    pub user_id: Uuid,
    pub bank_code: String,
    pub account_number: String,
    pub account_holder_name: String,
    pub balance_available: i64,
    pub last_disbursement_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlaceRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub address: String,
    pub city: String,
    pub image_url: Option<String>,
    pub ticket_price: i64,
    pub open_hour: i32,
    pub close_hour: i32,
    pub slot_interval_minutes: i32,
    pub capacity: i32,
    pub min_slot_count: i32,
    pub max_slot_count: i32,
    pub min_interval_days: i32,
    pub max_interval_days: i32,
    pub lat: f64,
    pub long: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Place listing entry with its review aggregate.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlaceSummaryRow {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub city: String,
    pub image_url: Option<String>,
    pub ticket_price: i64,
    pub rating_average: Option<f64>,
    pub rating_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ItemRow {
    pub id: Uuid,
    pub place_id: Uuid,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookingRow {
    pub id: Uuid,
    pub place_id: Uuid,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub headcount: i32,
    pub status: BookingStatus,
    pub total_price_ticket: i64,
    pub total_price_item: i64,
    pub total_fee: i64,
    pub total_price: i64,
    pub payment_reference: Option<String>,
    pub payment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The slice of a booking that takes up capacity.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct OccupancyRow {
    pub id: Uuid,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub headcount: i32,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookingItemRow {
    pub booking_id: Uuid,
    pub item_id: Uuid,
    pub item_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ReviewRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub place_id: Uuid,
    pub booking_id: Uuid,
    pub rating: i16,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DisbursementRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub amount: i64,
    pub status: DisbursementStatus,
    pub external_reference: Option<String>,
    pub failure_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct BookingEventRow {
    pub id: Uuid,
    pub booking_id: Option<Uuid>,
    pub event_category: String,
    pub event_action: String,
    pub actor_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub event_time: DateTime<Utc>,
}
