use std::sync::Arc;

use chrono::Duration;
use log::{info, warn};
use uuid::Uuid;

use super::attendance::AttendanceManager;
use super::auth::UserAuthData;
use super::clock::Clock;
use crate::db::{EventStore, ReportStore};
use crate::dto::{check_schedule, EventQuery, NewEventDto, UpdateEventDto};
use crate::errors::MyError;
use crate::models::{Event, EventStatus, Report, ReportStatus};

/// Organizers cannot edit an event later than this before it starts.
pub fn edit_window() -> Duration {
    Duration::hours(1)
}

pub struct EventDirectory {
    events: Arc<dyn EventStore>,
    reports: Arc<dyn ReportStore>,
    attendance: Arc<AttendanceManager>,
    clock: Arc<dyn Clock>,
}

/// Parses a `status` query value; `all` and absence both mean no filter.
pub fn parse_status_filter<T: std::str::FromStr<Err = String>>(
    status: Option<&str>,
) -> Result<Option<T>, MyError> {
    match status {
        None | Some("all") | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(MyError::BadClientData),
    }
}

impl EventDirectory {
    pub fn new(
        events: Arc<dyn EventStore>,
        reports: Arc<dyn ReportStore>,
        attendance: Arc<AttendanceManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            reports,
            attendance,
            clock,
        }
    }

    pub async fn create(&self, organizer: &UserAuthData, dto: NewEventDto) -> Result<Event, MyError> {
        let now = self.clock.now();
        dto.validate(now)?;
        let event = Event {
            id: Uuid::new_v4(),
            title: dto.title.trim().to_string(),
            description: dto.description,
            category: dto.category,
            location: dto.location,
            capacity: dto.capacity,
            start_time: dto.start_time,
            end_time: dto.end_time,
            organizer_uid: organizer.uid,
            cover_image: dto.cover_image,
            status: EventStatus::Active,
            created_at: now,
            updated_at: now,
            removed_by: None,
            removal_reason: None,
        };
        self.events.insert_event(&event).await?;
        info!("event {} created by {} ({})", event.id, organizer.uid, organizer.email);
        Ok(event)
    }

    pub async fn list(&self, query: &EventQuery) -> Result<Vec<Event>, MyError> {
        let category = query
            .category
            .as_deref()
            .filter(|c| !c.is_empty() && *c != "all");
        let mut events = self
            .events
            .upcoming_events(category, self.clock.now(), query.limit.max(0), query.offset.max(0))
            .await?;

        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            events.retain(|e| {
                e.title.to_lowercase().contains(&needle)
                    || e.description.to_lowercase().contains(&needle)
            });
        }
        info!(
            "found {} events matching category={:?}, search={:?}",
            events.len(),
            query.category,
            query.search
        );
        Ok(events)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Event, MyError> {
        self.events
            .find_event(id)
            .await?
            .ok_or_else(|| MyError::NotFound("event not found".to_string()))
    }

    fn authorize(event: &Event, actor: &UserAuthData) -> Result<(), MyError> {
        if event.organizer_uid == actor.uid || actor.is_admin {
            Ok(())
        } else {
            Err(MyError::Unauthorized)
        }
    }

    pub async fn update(
        &self,
        id: Uuid,
        fields: UpdateEventDto,
        actor: &UserAuthData,
    ) -> Result<Event, MyError> {
        let mut event = self.get_by_id(id).await?;
        Self::authorize(&event, actor)?;

        if event.is_cancelled() {
            return Err(MyError::BadClientData("event is cancelled".to_string()));
        }
        let now = self.clock.now();
        if now > event.start_time - edit_window() {
            if !fields.is_cancellation() {
                return Err(MyError::EditWindowClosed);
            }
            // only the cancellation goes through this close to the start
            event.status = EventStatus::Cancelled;
            event.updated_at = now;
            self.events.save_event(&event).await?;
            info!("event {} cancelled inside the edit window by {}", event.id, actor.uid);
            return Ok(event);
        }
        fields.validate()?;

        let previous_capacity = event.capacity;
        if let Some(v) = fields.title {
            event.title = v.trim().to_string();
        }
        if let Some(v) = fields.description {
            event.description = v;
        }
        if let Some(v) = fields.category {
            event.category = v;
        }
        if let Some(v) = fields.location {
            event.location = v;
        }
        if let Some(v) = fields.capacity {
            event.capacity = v;
        }
        if let Some(v) = fields.start_time {
            event.start_time = v;
        }
        if let Some(v) = fields.end_time {
            event.end_time = v;
        }
        if let Some(v) = fields.cover_image {
            event.cover_image = Some(v);
        }
        if let Some(v) = fields.status {
            event.status = v;
        }
        check_schedule(event.start_time, event.end_time)?;
        event.updated_at = now;

        self.events.save_event(&event).await?;
        info!("event {} updated by {}", event.id, actor.uid);

        let opened = event.is_unlimited() || event.capacity > previous_capacity;
        if opened && previous_capacity != 0 && !event.is_cancelled() {
            self.attendance.fill_open_seats(&event).await?;
        }
        Ok(event)
    }

    /// Soft-cancel; the record and its attendees are kept.
    pub async fn delete(&self, id: Uuid, actor: &UserAuthData) -> Result<(), MyError> {
        let mut event = self.get_by_id(id).await?;
        Self::authorize(&event, actor)?;
        event.status = EventStatus::Cancelled;
        event.updated_at = self.clock.now();
        self.events.save_event(&event).await?;
        info!("event {} cancelled by {}", event.id, actor.uid);
        Ok(())
    }

    pub async fn admin_remove(
        &self,
        id: Uuid,
        admin: &UserAuthData,
        reason: Option<String>,
    ) -> Result<(), MyError> {
        let mut event = self.get_by_id(id).await?;
        event.status = EventStatus::Cancelled;
        event.removed_by = Some(admin.uid);
        event.removal_reason = Some(reason.unwrap_or_else(|| "Removed by admin".to_string()));
        event.updated_at = self.clock.now();
        self.events.save_event(&event).await?;
        warn!("event {} removed by admin {}", event.id, admin.uid);
        Ok(())
    }

    pub async fn moderation(
        &self,
        status: Option<EventStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Event>, MyError> {
        Ok(self
            .events
            .events_for_moderation(status, limit.max(0), offset.max(0))
            .await?)
    }

    pub async fn flag(&self, id: Uuid, reporter: &UserAuthData, reason: String) -> Result<Report, MyError> {
        let event = self.get_by_id(id).await?;
        if reason.trim().is_empty() {
            return Err(MyError::BadClientData("a reason is required".to_string()));
        }
        let report = Report {
            id: Uuid::new_v4(),
            event_id: event.id,
            reporter_uid: reporter.uid,
            reason,
            status: ReportStatus::Pending,
            created_at: self.clock.now(),
        };
        self.reports.insert_report(&report).await?;
        warn!("event {} flagged by {}", event.id, reporter.uid);
        Ok(report)
    }

    pub async fn reports(&self, status: Option<ReportStatus>) -> Result<Vec<Report>, MyError> {
        Ok(self.reports.list_reports(status).await?)
    }
}
