pub mod event;
pub mod user;
pub mod report;
pub mod memory;
pub mod model;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use derive_more::{Display, Error, From};
use log::info;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::models::{Attendee, AttendeeStatus, Event, EventStatus, Report, ReportStatus, User};
use crate::PGPool;

#[derive(Debug, Display, Error, From)]
pub enum StoreError {
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),

    #[display(fmt = "migration error: {}", _0)]
    Migration(sqlx::migrate::MigrateError),

    #[display(fmt = "corrupt record: {}", _0)]
    #[from(ignore)]
    Corrupt(#[error(not(source))] String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The `events` collection.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: &Event) -> StoreResult<()>;
    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>>;
    async fn save_event(&self, event: &Event) -> StoreResult<()>;
    /// Active events starting after `after`, earliest first.
    async fn upcoming_events(
        &self,
        category: Option<&str>,
        after: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Event>>;
    /// Latest start first.
    async fn events_by_organizer(&self, organizer_uid: Uuid) -> StoreResult<Vec<Event>>;
    async fn all_events(&self) -> StoreResult<Vec<Event>>;
    /// Newest created first.
    async fn events_for_moderation(
        &self,
        status: Option<EventStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Event>>;
}

/// The `attendees` sub-collection of each event, keyed by user id.
#[async_trait]
pub trait AttendeeStore: Send + Sync {
    async fn find_attendee(&self, event_id: Uuid, uid: Uuid) -> StoreResult<Option<Attendee>>;
    /// Returns false when the user already has a record on the event.
    async fn insert_attendee(&self, event_id: Uuid, attendee: &Attendee) -> StoreResult<bool>;
    /// Returns false when there was nothing to delete.
    async fn delete_attendee(&self, event_id: Uuid, uid: Uuid) -> StoreResult<bool>;
    async fn count_by_status(&self, event_id: Uuid, status: AttendeeStatus) -> StoreResult<u32>;
    /// Earliest joined attendee with `status`; ties go to the earlier insert.
    async fn first_by_status(
        &self,
        event_id: Uuid,
        status: AttendeeStatus,
    ) -> StoreResult<Option<Attendee>>;
    async fn promote(&self, event_id: Uuid, uid: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
    /// Earliest joined first; ties go to the earlier insert.
    async fn list_attendees(&self, event_id: Uuid) -> StoreResult<Vec<Attendee>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user(&self, uid: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn save_user(&self, user: &User) -> StoreResult<()>;
    /// Non-deleted users, newest first.
    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn insert_report(&self, report: &Report) -> StoreResult<()>;
    /// Newest first.
    async fn list_reports(&self, status: Option<ReportStatus>) -> StoreResult<Vec<Report>>;
}

/// Postgres-backed store; one table per collection, `attendees` keyed by
/// `(event_id, uid)`.
#[derive(Clone)]
pub struct PgStore {
    pool: PGPool,
}

impl PgStore {
    pub fn new(pool: PGPool) -> Self {
        Self { pool }
    }
}

pub async fn init_db_pool(db_url: &str, max_connections: u32) -> StoreResult<PGPool> {
    info!("connecting to postgres, max {} connections", max_connections);
    let pool: PGPool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await?;
    sqlx::migrate!().run(&pool).await?;
    info!("migrations applied");
    Ok(pool)
}
