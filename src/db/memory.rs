use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{AttendeeStore, EventStore, ReportStore, StoreError, StoreResult, UserStore};
use crate::models::{Attendee, AttendeeStatus, Event, EventStatus, Report, ReportStatus, User};

struct EventDoc {
    event: Event,
    /// Attendee records with the sequence number they were inserted at.
    attendees: HashMap<Uuid, (u64, Attendee)>,
}

impl EventDoc {
    fn ordered_attendees(&self) -> Vec<&(u64, Attendee)> {
        let mut attendees: Vec<_> = self.attendees.values().collect();
        attendees.sort_by_key(|(seq, attendee)| (attendee.joined_at, *seq));
        attendees
    }
}

#[derive(Default)]
struct Collections {
    events: HashMap<Uuid, EventDoc>,
    users: HashMap<Uuid, User>,
    reports: Vec<Report>,
    seq: u64,
}

/// In-process document store used when no database is configured.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Collections>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Corrupt("memory store lock poisoned".to_string()))
    }
}

fn window<T>(items: Vec<T>, limit: i64, offset: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.into_iter().skip(offset).take(limit).collect()
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> StoreResult<()> {
        let mut db = self.lock()?;
        if db.events.contains_key(&event.id) {
            return Err(StoreError::Corrupt(format!("event {} already exists", event.id)));
        }
        db.events.insert(
            event.id,
            EventDoc {
                event: event.clone(),
                attendees: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.lock()?.events.get(&id).map(|doc| doc.event.clone()))
    }

    async fn save_event(&self, event: &Event) -> StoreResult<()> {
        let mut db = self.lock()?;
        if let Some(doc) = db.events.get_mut(&event.id) {
            doc.event = event.clone();
        }
        Ok(())
    }

    async fn upcoming_events(
        &self,
        category: Option<&str>,
        after: DateTime<Utc>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Event>> {
        let db = self.lock()?;
        let mut events: Vec<Event> = db
            .events
            .values()
            .map(|doc| &doc.event)
            .filter(|e| e.status == EventStatus::Active && e.start_time > after)
            .filter(|e| category.map_or(true, |c| e.category == c))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_time);
        Ok(window(events, limit, offset))
    }

    async fn events_by_organizer(&self, organizer_uid: Uuid) -> StoreResult<Vec<Event>> {
        let db = self.lock()?;
        let mut events: Vec<Event> = db
            .events
            .values()
            .map(|doc| &doc.event)
            .filter(|e| e.organizer_uid == organizer_uid)
            .cloned()
            .collect();
        events.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(events)
    }

    async fn all_events(&self) -> StoreResult<Vec<Event>> {
        Ok(self.lock()?.events.values().map(|doc| doc.event.clone()).collect())
    }

    async fn events_for_moderation(
        &self,
        status: Option<EventStatus>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<Event>> {
        let db = self.lock()?;
        let mut events: Vec<Event> = db
            .events
            .values()
            .map(|doc| &doc.event)
            .filter(|e| status.map_or(true, |s| e.status == s))
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(window(events, limit, offset))
    }
}

#[async_trait]
impl AttendeeStore for MemoryStore {
    async fn find_attendee(&self, event_id: Uuid, uid: Uuid) -> StoreResult<Option<Attendee>> {
        let db = self.lock()?;
        Ok(db
            .events
            .get(&event_id)
            .and_then(|doc| doc.attendees.get(&uid))
            .map(|(_, attendee)| attendee.clone()))
    }

    async fn insert_attendee(&self, event_id: Uuid, attendee: &Attendee) -> StoreResult<bool> {
        let mut db = self.lock()?;
        db.seq += 1;
        let seq = db.seq;
        let doc = db
            .events
            .get_mut(&event_id)
            .ok_or_else(|| StoreError::Corrupt(format!("event {event_id} does not exist")))?;
        if doc.attendees.contains_key(&attendee.uid) {
            return Ok(false);
        }
        doc.attendees.insert(attendee.uid, (seq, attendee.clone()));
        Ok(true)
    }

    async fn delete_attendee(&self, event_id: Uuid, uid: Uuid) -> StoreResult<bool> {
        let mut db = self.lock()?;
        Ok(db
            .events
            .get_mut(&event_id)
            .and_then(|doc| doc.attendees.remove(&uid))
            .is_some())
    }

    async fn count_by_status(&self, event_id: Uuid, status: AttendeeStatus) -> StoreResult<u32> {
        let db = self.lock()?;
        let count = db.events.get(&event_id).map_or(0, |doc| {
            doc.attendees
                .values()
                .filter(|(_, a)| a.status == status)
                .count()
        });
        u32::try_from(count).map_err(|_| StoreError::Corrupt(format!("attendee count {count}")))
    }

    async fn first_by_status(
        &self,
        event_id: Uuid,
        status: AttendeeStatus,
    ) -> StoreResult<Option<Attendee>> {
        let db = self.lock()?;
        Ok(db.events.get(&event_id).and_then(|doc| {
            doc.ordered_attendees()
                .into_iter()
                .find(|(_, a)| a.status == status)
                .map(|(_, a)| a.clone())
        }))
    }

    async fn promote(&self, event_id: Uuid, uid: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        let mut db = self.lock()?;
        if let Some((_, attendee)) = db
            .events
            .get_mut(&event_id)
            .and_then(|doc| doc.attendees.get_mut(&uid))
        {
            attendee.status = AttendeeStatus::Going;
            attendee.promoted_at = Some(at);
        }
        Ok(())
    }

    async fn list_attendees(&self, event_id: Uuid) -> StoreResult<Vec<Attendee>> {
        let db = self.lock()?;
        Ok(db.events.get(&event_id).map_or_else(Vec::new, |doc| {
            doc.ordered_attendees()
                .into_iter()
                .map(|(_, a)| a.clone())
                .collect()
        }))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut db = self.lock()?;
        if db.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Corrupt(format!("email {} already taken", user.email)));
        }
        db.users.insert(user.uid, user.clone());
        Ok(())
    }

    async fn find_user(&self, uid: Uuid) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&uid).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.lock()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn save_user(&self, user: &User) -> StoreResult<()> {
        let mut db = self.lock()?;
        if let Some(stored) = db.users.get_mut(&user.uid) {
            *stored = user.clone();
        }
        Ok(())
    }

    async fn list_users(&self, limit: i64, offset: i64) -> StoreResult<Vec<User>> {
        let db = self.lock()?;
        let mut users: Vec<User> = db.users.values().filter(|u| !u.deleted).cloned().collect();
        users.sort_by(|a, b| b.joined_at.cmp(&a.joined_at));
        Ok(window(users, limit, offset))
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn insert_report(&self, report: &Report) -> StoreResult<()> {
        self.lock()?.reports.push(report.clone());
        Ok(())
    }

    async fn list_reports(&self, status: Option<ReportStatus>) -> StoreResult<Vec<Report>> {
        let db = self.lock()?;
        let mut reports: Vec<Report> = db
            .reports
            .iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .cloned()
            .collect();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reports)
    }
}
