use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::model::{collect, AttendeeRow, EventRow};
use super::{AttendeeStore, EventStore, PgStore, StoreError, StoreResult};
use crate::models::{Attendee, AttendeeStatus, Event, EventStatus};

const EVENT_COLUMNS: &str = "id, title, description, category, latitude, longitude, address, \
    capacity, start_time, end_time, organizer_uid, cover_image, status, created_at, updated_at, \
    removed_by, removal_reason";

const ATTENDEE_COLUMNS: &str = "uid, status, joined_at, promoted_at";

fn capacity_column(event: &Event) -> StoreResult<i32> {
    i32::try_from(event.capacity)
        .map_err(|_| StoreError::Corrupt(format!("capacity {} out of range", event.capacity)))
}

#[async_trait]
impl EventStore for PgStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO events (id, title, description, category, latitude, longitude, address,
            capacity, start_time, end_time, organizer_uid, cover_image, status, created_at,
            updated_at, removed_by, removal_reason)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.category)
        .bind(event.location.geo_point.latitude)
        .bind(event.location.geo_point.longitude)
        .bind(&event.location.address)
        .bind(capacity_column(event)?)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.organizer_uid)
        .bind(&event.cover_image)
        .bind(event.status.as_str())
        .bind(event.created_at)
        .bind(event.updated_at)
        .bind(event.removed_by)
        .bind(&event.removal_reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // /events/id
    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Event::try_from).transpose()
    }

    async fn save_event(&self, event: &Event) -> StoreResult<()> {
        sqlx::query(
            "UPDATE events SET title = $2, description = $3, category = $4, latitude = $5,
            longitude = $6, address = $7, capacity = $8, start_time = $9, end_time = $10,
            cover_image = $11, status = $12, updated_at = $13, removed_by = $14,
            removal_reason = $15
            WHERE id = $1",
        )
        .bind(event.id)
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.category)
        .bind(event.location.geo_point.latitude)
        .bind(event.location.geo_point.longitude)
        .bind(&event.location.address)
        .bind(capacity_column(event)?)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(&event.cover_image)
        .bind(event.status.as_str())
        .bind(event.updated_at)
        .bind(event.removed_by)
        .bind(&event.removal_reason)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upcoming_events(
        &self,
        category: Option<&str>,
        after: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
            WHERE status = 'active' AND start_time > $1 AND ($2::TEXT IS NULL OR category = $2)
            ORDER BY start_time ASC
            LIMIT $3 OFFSET $4"
        ))
        .bind(after)
        .bind(category)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn events_by_organizer(&self, organizer_uid: Uuid) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE organizer_uid = $1 ORDER BY start_time DESC"
        ))
        .bind(organizer_uid)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn all_events(&self) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!("SELECT {EVENT_COLUMNS} FROM events"))
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn events_for_moderation(
        &self,
        status: Option<EventStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Event>> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events
            WHERE ($1::TEXT IS NULL OR status = $1)
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3"
        ))
        .bind(status.map(|s| s.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }
}

#[async_trait]
impl AttendeeStore for PgStore {
    async fn find_attendee(&self, event_id: Uuid, uid: Uuid) -> StoreResult<Option<Attendee>> {
        let row = sqlx::query_as::<_, AttendeeRow>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE event_id = $1 AND uid = $2"
        ))
        .bind(event_id)
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Attendee::try_from).transpose()
    }

    async fn insert_attendee(&self, event_id: Uuid, attendee: &Attendee) -> StoreResult<bool> {
        let res = sqlx::query(
            "INSERT INTO attendees (event_id, uid, status, joined_at, promoted_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id, uid) DO NOTHING",
        )
        .bind(event_id)
        .bind(attendee.uid)
        .bind(attendee.status.as_str())
        .bind(attendee.joined_at)
        .bind(attendee.promoted_at)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn delete_attendee(&self, event_id: Uuid, uid: Uuid) -> StoreResult<bool> {
        let res = sqlx::query("DELETE FROM attendees WHERE event_id = $1 AND uid = $2")
            .bind(event_id)
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn count_by_status(&self, event_id: Uuid, status: AttendeeStatus) -> StoreResult<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM attendees WHERE event_id = $1 AND status = $2",
        )
        .bind(event_id)
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;
        u32::try_from(count).map_err(|_| StoreError::Corrupt(format!("attendee count {count}")))
    }

    async fn first_by_status(
        &self,
        event_id: Uuid,
        status: AttendeeStatus,
    ) -> StoreResult<Option<Attendee>> {
        let row = sqlx::query_as::<_, AttendeeRow>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees
            WHERE event_id = $1 AND status = $2
            ORDER BY joined_at ASC, seq ASC
            LIMIT 1"
        ))
        .bind(event_id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Attendee::try_from).transpose()
    }

    async fn promote(&self, event_id: Uuid, uid: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query(
            "UPDATE attendees SET status = $3, promoted_at = $4 WHERE event_id = $1 AND uid = $2",
        )
        .bind(event_id)
        .bind(uid)
        .bind(AttendeeStatus::Going.as_str())
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_attendees(&self, event_id: Uuid) -> StoreResult<Vec<Attendee>> {
        let rows = sqlx::query_as::<_, AttendeeRow>(&format!(
            "SELECT {ATTENDEE_COLUMNS} FROM attendees WHERE event_id = $1
            ORDER BY joined_at ASC, seq ASC"
        ))
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }
}
