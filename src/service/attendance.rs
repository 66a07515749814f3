use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::try_join_all;
use log::{debug, info, warn};
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use super::clock::Clock;
use crate::db::{AttendeeStore, EventStore};
use crate::errors::MyError;
use crate::models::{Attendee, AttendeeStatus, Event, UserEventsMode};

/// Status a newcomer gets given how many attendees are already going.
pub fn admission_status(event: &Event, going: u32) -> AttendeeStatus {
    if event.has_open_seat(going) {
        AttendeeStatus::Going
    } else {
        AttendeeStatus::Waitlist
    }
}

/// One async mutex per event id. Join and leave on the same event take it
/// so the count-then-write sequence cannot interleave inside this process.
#[derive(Default)]
struct EventLocks {
    locks: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl EventLocks {
    async fn acquire(&self, event_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            // the map holds no invariant a panic can break, so a poisoned
            // guard is still usable
            let mut locks = self.locks.lock().unwrap_or_else(|poisoned| {
                warn!("event lock table was poisoned, recovering it");
                poisoned.into_inner()
            });
            // drop entries nobody is holding so the table stays small
            locks.retain(|id, lock| *id == event_id || Arc::strong_count(lock) > 1);
            locks.entry(event_id).or_default().clone()
        };
        lock.lock_owned().await
    }
}

pub struct AttendanceManager {
    events: Arc<dyn EventStore>,
    attendees: Arc<dyn AttendeeStore>,
    clock: Arc<dyn Clock>,
    locks: EventLocks,
}

impl AttendanceManager {
    pub fn new(
        events: Arc<dyn EventStore>,
        attendees: Arc<dyn AttendeeStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            events,
            attendees,
            clock,
            locks: EventLocks::default(),
        }
    }

    async fn event(&self, event_id: Uuid) -> Result<Event, MyError> {
        self.events
            .find_event(event_id)
            .await?
            .ok_or_else(|| MyError::NotFound("event not found".to_string()))
    }

    pub async fn join(&self, event_id: Uuid, uid: Uuid) -> Result<Attendee, MyError> {
        let _guard = self.locks.acquire(event_id).await;
        let event = self.event(event_id).await?;
        if self.attendees.find_attendee(event_id, uid).await?.is_some() {
            return Err(MyError::AlreadyJoined);
        }

        let going = self
            .attendees
            .count_by_status(event_id, AttendeeStatus::Going)
            .await?;
        let attendee = Attendee {
            uid,
            status: admission_status(&event, going),
            joined_at: self.clock.now(),
            promoted_at: None,
        };
        if !self.attendees.insert_attendee(event_id, &attendee).await? {
            return Err(MyError::AlreadyJoined);
        }
        info!(
            "user {} joined event {} as {} ({}/{} going)",
            uid, event_id, attendee.status, going, event.capacity
        );
        Ok(attendee)
    }

    /// Removes the user's record. Returns whoever was promoted into the
    /// vacated seat.
    pub async fn leave(&self, event_id: Uuid, uid: Uuid) -> Result<Vec<Attendee>, MyError> {
        let _guard = self.locks.acquire(event_id).await;
        let event = self.event(event_id).await?;
        let attendee = self
            .attendees
            .find_attendee(event_id, uid)
            .await?
            .ok_or(MyError::NotAttending)?;

        if !self.attendees.delete_attendee(event_id, uid).await? {
            return Err(MyError::NotAttending);
        }
        info!("user {} left event {} (was {})", uid, event_id, attendee.status);

        if attendee.status == AttendeeStatus::Going {
            self.promote_from_waitlist(&event).await
        } else {
            Ok(Vec::new())
        }
    }

    /// Fills open seats after a capacity change.
    pub async fn fill_open_seats(&self, event: &Event) -> Result<Vec<Attendee>, MyError> {
        let _guard = self.locks.acquire(event.id).await;
        self.promote_from_waitlist(event).await
    }

    async fn promote_from_waitlist(&self, event: &Event) -> Result<Vec<Attendee>, MyError> {
        let mut promoted = Vec::new();
        let mut going = self
            .attendees
            .count_by_status(event.id, AttendeeStatus::Going)
            .await?;
        while event.has_open_seat(going) {
            let Some(mut next) = self
                .attendees
                .first_by_status(event.id, AttendeeStatus::Waitlist)
                .await?
            else {
                break;
            };
            let at = self.clock.now();
            self.attendees.promote(event.id, next.uid, at).await?;
            info!("promoted user {} from waitlist on event {}", next.uid, event.id);
            next.status = AttendeeStatus::Going;
            next.promoted_at = Some(at);
            promoted.push(next);
            going += 1;
        }
        if promoted.is_empty() {
            debug!("no waitlist promotion on event {}", event.id);
        }
        Ok(promoted)
    }

    pub async fn attendees(&self, event_id: Uuid) -> Result<Vec<Attendee>, MyError> {
        Ok(self.attendees.list_attendees(event_id).await?)
    }

    #[cfg(test)]
    pub async fn going_count(&self, event_id: Uuid) -> Result<u32, MyError> {
        Ok(self
            .attendees
            .count_by_status(event_id, AttendeeStatus::Going)
            .await?)
    }

    pub async fn user_events(&self, uid: Uuid, mode: UserEventsMode) -> Result<Vec<Event>, MyError> {
        match mode {
            UserEventsMode::Organized => Ok(self.events.events_by_organizer(uid).await?),
            UserEventsMode::Attending => {
                let events = self.events.all_events().await?;
                let probes = events.iter().map(|event| self.attendees.find_attendee(event.id, uid));
                let records = try_join_all(probes).await?;
                let mut attending: Vec<Event> = events
                    .into_iter()
                    .zip(records)
                    .filter(|(_, record)| {
                        matches!(record, Some(a) if a.status == AttendeeStatus::Going)
                    })
                    .map(|(event, _)| event)
                    .collect();
                attending.sort_by_key(|e| e.start_time);
                Ok(attending)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::StoreResult;
    use crate::models::{EventStatus, GeoPoint, Location};
    use crate::service::clock::ManualClock;
    use chrono::{DateTime, Duration, Utc};

    struct Fixture {
        store: MemoryStore,
        manager: AttendanceManager,
        now: DateTime<Utc>,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let now = DateTime::parse_from_rfc3339("2025-06-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = Arc::new(ManualClock::new(now, Duration::seconds(1)));
        let manager = AttendanceManager::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            clock,
        );
        Fixture {
            store,
            manager,
            now,
        }
    }

    async fn seed_event(fx: &Fixture, capacity: u32, start_in: Duration) -> Event {
        let event = Event {
            id: Uuid::new_v4(),
            title: "Concert au Bikini".into(),
            description: "Live music by the canal".into(),
            category: "music".into(),
            location: Location {
                geo_point: GeoPoint {
                    latitude: 43.5593,
                    longitude: 1.4836,
                },
                address: "Rue Hermès, Ramonville".into(),
            },
            capacity,
            start_time: fx.now + start_in,
            end_time: fx.now + start_in + Duration::hours(2),
            organizer_uid: Uuid::new_v4(),
            cover_image: None,
            status: EventStatus::Active,
            created_at: fx.now,
            updated_at: fx.now,
            removed_by: None,
            removal_reason: None,
        };
        fx.store.insert_event(&event).await.unwrap();
        event
    }

    async fn status_of(fx: &Fixture, event_id: Uuid, uid: Uuid) -> Option<AttendeeStatus> {
        fx.store
            .find_attendee(event_id, uid)
            .await
            .unwrap()
            .map(|a| a.status)
    }

    #[actix_rt::test]
    async fn waitlisted_user_is_promoted_when_a_seat_opens() {
        let fx = fixture();
        let event = seed_event(&fx, 2, Duration::days(3)).await;
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(fx.manager.join(event.id, a).await.unwrap().status, AttendeeStatus::Going);
        assert_eq!(fx.manager.join(event.id, b).await.unwrap().status, AttendeeStatus::Going);
        assert_eq!(fx.manager.join(event.id, c).await.unwrap().status, AttendeeStatus::Waitlist);

        let promoted = fx.manager.leave(event.id, a).await.unwrap();
        assert_eq!(promoted.len(), 1);
        assert_eq!(promoted[0].uid, c);
        assert!(promoted[0].promoted_at.is_some());

        assert_eq!(status_of(&fx, event.id, c).await, Some(AttendeeStatus::Going));
        assert_eq!(status_of(&fx, event.id, a).await, None);
        assert_eq!(fx.manager.going_count(event.id).await.unwrap(), 2);
    }

    #[actix_rt::test]
    async fn unlimited_capacity_admits_everyone() {
        let fx = fixture();
        let event = seed_event(&fx, 0, Duration::days(1)).await;
        for _ in 0..50 {
            let attendee = fx.manager.join(event.id, Uuid::new_v4()).await.unwrap();
            assert_eq!(attendee.status, AttendeeStatus::Going);
        }
        assert_eq!(fx.manager.going_count(event.id).await.unwrap(), 50);
    }

    #[actix_rt::test]
    async fn joining_twice_fails_without_side_effects() {
        let fx = fixture();
        let event = seed_event(&fx, 1, Duration::days(1)).await;
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        fx.manager.join(event.id, a).await.unwrap();
        fx.manager.join(event.id, b).await.unwrap();
        let before = fx.manager.attendees(event.id).await.unwrap();

        assert_eq!(fx.manager.join(event.id, a).await, Err(MyError::AlreadyJoined));
        assert_eq!(fx.manager.join(event.id, b).await, Err(MyError::AlreadyJoined));
        assert_eq!(fx.manager.attendees(event.id).await.unwrap(), before);
    }

    #[actix_rt::test]
    async fn leaving_the_waitlist_never_promotes() {
        let fx = fixture();
        let event = seed_event(&fx, 1, Duration::days(1)).await;
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        fx.manager.join(event.id, a).await.unwrap();
        fx.manager.join(event.id, b).await.unwrap();
        fx.manager.join(event.id, c).await.unwrap();

        assert!(fx.manager.leave(event.id, b).await.unwrap().is_empty());
        assert_eq!(status_of(&fx, event.id, c).await, Some(AttendeeStatus::Waitlist));
        assert_eq!(fx.manager.going_count(event.id).await.unwrap(), 1);
    }

    #[actix_rt::test]
    async fn promotion_picks_the_earliest_waitlisted() {
        let fx = fixture();
        let event = seed_event(&fx, 1, Duration::days(1)).await;
        let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for uid in &users {
            fx.manager.join(event.id, *uid).await.unwrap();
        }

        let promoted = fx.manager.leave(event.id, users[0]).await.unwrap();
        assert_eq!(promoted.iter().map(|a| a.uid).collect::<Vec<_>>(), vec![users[1]]);
        let promoted = fx.manager.leave(event.id, users[1]).await.unwrap();
        assert_eq!(promoted.iter().map(|a| a.uid).collect::<Vec<_>>(), vec![users[2]]);
        assert_eq!(status_of(&fx, event.id, users[3]).await, Some(AttendeeStatus::Waitlist));
    }

    #[actix_rt::test]
    async fn going_count_stays_within_capacity() {
        let fx = fixture();
        let capacity = 3;
        let event = seed_event(&fx, capacity, Duration::days(1)).await;
        let users: Vec<Uuid> = (0..8).map(|_| Uuid::new_v4()).collect();

        // interleave joins and leaves in a fixed pattern
        for (round, uid) in users.iter().enumerate() {
            fx.manager.join(event.id, *uid).await.unwrap();
            if round % 3 == 2 {
                fx.manager.leave(event.id, users[round - 1]).await.unwrap();
            }
            assert!(fx.manager.going_count(event.id).await.unwrap() <= capacity);
        }
        for uid in users.iter().rev().take(2) {
            let _ = fx.manager.leave(event.id, *uid).await;
            assert!(fx.manager.going_count(event.id).await.unwrap() <= capacity);
        }
    }

    #[actix_rt::test]
    async fn attendees_are_listed_in_join_order() {
        let fx = fixture();
        let event = seed_event(&fx, 2, Duration::days(1)).await;
        for _ in 0..5 {
            fx.manager.join(event.id, Uuid::new_v4()).await.unwrap();
        }
        let attendees = fx.manager.attendees(event.id).await.unwrap();
        assert_eq!(attendees.len(), 5);
        assert!(attendees.windows(2).all(|w| w[0].joined_at < w[1].joined_at));
    }

    #[actix_rt::test]
    async fn unknown_event_and_missing_record_are_reported() {
        let fx = fixture();
        let uid = Uuid::new_v4();
        assert!(matches!(
            fx.manager.join(Uuid::new_v4(), uid).await,
            Err(MyError::NotFound(_))
        ));
        let event = seed_event(&fx, 0, Duration::days(1)).await;
        assert_eq!(fx.manager.leave(event.id, uid).await, Err(MyError::NotAttending));
        assert!(fx.manager.attendees(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn raising_capacity_fills_seats_from_the_waitlist() {
        let fx = fixture();
        let mut event = seed_event(&fx, 1, Duration::days(1)).await;
        let users: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for uid in &users {
            fx.manager.join(event.id, *uid).await.unwrap();
        }

        event.capacity = 3;
        fx.store.save_event(&event).await.unwrap();
        let promoted = fx.manager.fill_open_seats(&event).await.unwrap();
        assert_eq!(
            promoted.iter().map(|a| a.uid).collect::<Vec<_>>(),
            vec![users[1], users[2]]
        );
        assert_eq!(status_of(&fx, event.id, users[3]).await, Some(AttendeeStatus::Waitlist));
    }

    #[actix_rt::test]
    async fn user_events_by_mode() {
        let fx = fixture();
        let uid = Uuid::new_v4();
        let later = seed_event(&fx, 1, Duration::days(5)).await;
        let sooner = seed_event(&fx, 1, Duration::days(2)).await;
        let full = seed_event(&fx, 1, Duration::days(3)).await;

        fx.manager.join(later.id, uid).await.unwrap();
        fx.manager.join(sooner.id, uid).await.unwrap();
        fx.manager.join(full.id, Uuid::new_v4()).await.unwrap();
        fx.manager.join(full.id, uid).await.unwrap();

        let attending = fx
            .manager
            .user_events(uid, UserEventsMode::Attending)
            .await
            .unwrap();
        assert_eq!(
            attending.iter().map(|e| e.id).collect::<Vec<_>>(),
            vec![sooner.id, later.id]
        );

        let organized = fx
            .manager
            .user_events(later.organizer_uid, UserEventsMode::Organized)
            .await
            .unwrap();
        assert_eq!(organized.iter().map(|e| e.id).collect::<Vec<_>>(), vec![later.id]);
    }

    #[actix_rt::test]
    async fn concurrent_joins_on_one_event_respect_capacity() {
        let fx = fixture();
        let event = seed_event(&fx, 5, Duration::days(1)).await;
        let joins = (0..20).map(|_| fx.manager.join(event.id, Uuid::new_v4()));
        let results = futures::future::join_all(joins).await;
        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(fx.manager.going_count(event.id).await.unwrap(), 5);
    }

    /// Attendee store that never sees an existing record on lookup, like a
    /// second process racing the same join.
    struct BlindLookup(MemoryStore);

    #[async_trait::async_trait]
    impl AttendeeStore for BlindLookup {
        async fn find_attendee(&self, _: Uuid, _: Uuid) -> StoreResult<Option<Attendee>> {
            Ok(None)
        }
        async fn insert_attendee(&self, event_id: Uuid, attendee: &Attendee) -> StoreResult<bool> {
            self.0.insert_attendee(event_id, attendee).await
        }
        async fn delete_attendee(&self, event_id: Uuid, uid: Uuid) -> StoreResult<bool> {
            self.0.delete_attendee(event_id, uid).await
        }
        async fn count_by_status(&self, event_id: Uuid, status: AttendeeStatus) -> StoreResult<u32> {
            self.0.count_by_status(event_id, status).await
        }
        async fn first_by_status(
            &self,
            event_id: Uuid,
            status: AttendeeStatus,
        ) -> StoreResult<Option<Attendee>> {
            self.0.first_by_status(event_id, status).await
        }
        async fn promote(&self, event_id: Uuid, uid: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
            self.0.promote(event_id, uid, at).await
        }
        async fn list_attendees(&self, event_id: Uuid) -> StoreResult<Vec<Attendee>> {
            self.0.list_attendees(event_id).await
        }
    }

    #[actix_rt::test]
    async fn duplicate_insert_is_reported_as_already_joined() {
        let fx = fixture();
        let event = seed_event(&fx, 3, Duration::days(1)).await;
        let racing = AttendanceManager::new(
            Arc::new(fx.store.clone()),
            Arc::new(BlindLookup(fx.store.clone())),
            Arc::new(ManualClock::fixed(fx.now)),
        );
        let uid = Uuid::new_v4();
        racing.join(event.id, uid).await.unwrap();
        assert_eq!(racing.join(event.id, uid).await, Err(MyError::AlreadyJoined));
        assert_eq!(fx.manager.going_count(event.id).await.unwrap(), 1);
    }

    #[actix_rt::test]
    async fn poisoned_lock_table_still_serializes() {
        let locks = Arc::new(EventLocks::default());
        let poisoner = locks.clone();
        let _ = std::thread::spawn(move || {
            let _held = poisoner.locks.lock().unwrap();
            panic!("worker died holding the lock table");
        })
        .join();
        assert!(locks.locks.is_poisoned());

        let event_id = Uuid::new_v4();
        let held = locks.acquire(event_id).await;
        let second = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            locks.acquire(event_id),
        )
        .await;
        assert!(second.is_err());
        drop(held);
        let _again = locks.acquire(event_id).await;
    }
}
