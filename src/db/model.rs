use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::StoreError;
use crate::models::{Attendee, Event, GeoPoint, Location, Report, User};

#[derive(Debug, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
    pub capacity: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub organizer_uid: Uuid,
    pub cover_image: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub removed_by: Option<Uuid>,
    pub removal_reason: Option<String>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let capacity = u32::try_from(row.capacity).map_err(|_| {
            StoreError::Corrupt(format!("event {} has capacity {}", row.id, row.capacity))
        })?;
        Ok(Event {
            id: row.id,
            title: row.title,
            description: row.description,
            category: row.category,
            location: Location {
                geo_point: GeoPoint {
                    latitude: row.latitude,
                    longitude: row.longitude,
                },
                address: row.address,
            },
            capacity,
            start_time: row.start_time,
            end_time: row.end_time,
            organizer_uid: row.organizer_uid,
            cover_image: row.cover_image,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            removed_by: row.removed_by,
            removal_reason: row.removal_reason,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct AttendeeRow {
    pub uid: Uuid,
    pub status: String,
    pub joined_at: DateTime<Utc>,
    pub promoted_at: Option<DateTime<Utc>>,
}

impl TryFrom<AttendeeRow> for Attendee {
    type Error = StoreError;

    fn try_from(row: AttendeeRow) -> Result<Self, Self::Error> {
        Ok(Attendee {
            uid: row.uid,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            joined_at: row.joined_at,
            promoted_at: row.promoted_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct UserRow {
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
    pub pwd_hash: String,
    pub photo_url: Option<String>,
    pub bio: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub is_admin: bool,
    pub suspended: bool,
    pub suspension_reason: Option<String>,
    pub deleted: bool,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            uid: row.uid,
            email: row.email,
            display_name: row.display_name,
            pwd_hash: row.pwd_hash,
            photo_url: row.photo_url,
            bio: row.bio,
            joined_at: row.joined_at,
            is_admin: row.is_admin,
            suspended: row.suspended,
            suspension_reason: row.suspension_reason,
            deleted: row.deleted,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ReportRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub reporter_uid: Uuid,
    pub reason: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ReportRow> for Report {
    type Error = StoreError;

    fn try_from(row: ReportRow) -> Result<Self, Self::Error> {
        Ok(Report {
            id: row.id,
            event_id: row.event_id,
            reporter_uid: row.reporter_uid,
            reason: row.reason,
            status: row.status.parse().map_err(StoreError::Corrupt)?,
            created_at: row.created_at,
        })
    }
}

pub fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>, StoreError>
where
    T: TryFrom<R, Error = StoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}
