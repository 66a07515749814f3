pub mod attendance;
pub mod auth;
pub mod clock;
pub mod crypto;
pub mod event;
pub mod log;
pub mod user;

use std::sync::Arc;

use crate::db::{AttendeeStore, EventStore, ReportStore, UserStore};

use self::attendance::AttendanceManager;
use self::clock::Clock;
use self::event::EventDirectory;
use self::user::{TokenSettings, UserService};

/// Services shared by every worker through `web::Data`.
pub struct AppState {
    pub attendance: Arc<AttendanceManager>,
    pub events: EventDirectory,
    pub users: UserService,
}

impl AppState {
    pub fn new<S>(store: S, tokens: TokenSettings, clock: Arc<dyn Clock>) -> Self
    where
        S: EventStore + AttendeeStore + UserStore + ReportStore + Clone + 'static,
    {
        let events: Arc<dyn EventStore> = Arc::new(store.clone());
        let attendees: Arc<dyn AttendeeStore> = Arc::new(store.clone());
        let reports: Arc<dyn ReportStore> = Arc::new(store.clone());
        let users: Arc<dyn UserStore> = Arc::new(store);

        let attendance = Arc::new(AttendanceManager::new(
            events.clone(),
            attendees,
            clock.clone(),
        ));
        Self {
            events: EventDirectory::new(events, reports, attendance.clone(), clock.clone()),
            attendance,
            users: UserService::new(users, tokens, clock),
        }
    }
}
