use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::MyError;
use crate::models::{EventStatus, Location, User, UserEventsMode};

pub const MAX_TITLE_LEN: usize = 80;
pub const MAX_DESCRIPTION_LEN: usize = 4000;
pub const MAX_CAPACITY: u32 = 500;
pub const MAX_BIO_LEN: usize = 500;

fn bad(msg: &str) -> MyError {
    MyError::BadClientData(msg.to_string())
}

fn check_title(title: &str) -> Result<(), MyError> {
    let len = title.trim().chars().count();
    if len == 0 || len > MAX_TITLE_LEN {
        return Err(bad("title must be between 1 and 80 characters"));
    }
    Ok(())
}

fn check_description(description: &str) -> Result<(), MyError> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(bad("description must be at most 4000 characters"));
    }
    Ok(())
}

fn check_category(category: &str) -> Result<(), MyError> {
    if category.trim().is_empty() {
        return Err(bad("category is required"));
    }
    Ok(())
}

fn check_location(location: &Location) -> Result<(), MyError> {
    let point = location.geo_point;
    if !(-90.0..=90.0).contains(&point.latitude) {
        return Err(bad("latitude must be between -90 and 90"));
    }
    if !(-180.0..=180.0).contains(&point.longitude) {
        return Err(bad("longitude must be between -180 and 180"));
    }
    if location.address.trim().is_empty() {
        return Err(bad("address is required"));
    }
    Ok(())
}

fn check_capacity(capacity: u32) -> Result<(), MyError> {
    if capacity > MAX_CAPACITY {
        return Err(bad("capacity must be between 0 and 500"));
    }
    Ok(())
}

pub fn check_schedule(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), MyError> {
    if end <= start {
        return Err(bad("end time must be after start time"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewEventDto {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: Location,
    pub capacity: u32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub cover_image: Option<String>,
}

impl NewEventDto {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), MyError> {
        check_title(&self.title)?;
        check_description(&self.description)?;
        check_category(&self.category)?;
        check_location(&self.location)?;
        check_capacity(self.capacity)?;
        check_schedule(self.start_time, self.end_time)?;
        if self.start_time <= now {
            return Err(bad("event cannot be scheduled in the past"));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventDto {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<Location>,
    pub capacity: Option<u32>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub cover_image: Option<String>,
    pub status: Option<EventStatus>,
}

impl UpdateEventDto {
    pub fn is_cancellation(&self) -> bool {
        self.status == Some(EventStatus::Cancelled)
    }

    /// Checks the fields that are present; the merged schedule is checked
    /// by the caller.
    pub fn validate(&self) -> Result<(), MyError> {
        if let Some(v) = &self.title {
            check_title(v)?;
        }
        if let Some(v) = &self.description {
            check_description(v)?;
        }
        if let Some(v) = &self.category {
            check_category(v)?;
        }
        if let Some(v) = &self.location {
            check_location(v)?;
        }
        if let Some(v) = self.capacity {
            check_capacity(v)?;
        }
        Ok(())
    }
}

fn default_limit() -> i64 {
    20
}

fn default_moderation_limit() -> i64 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct EventQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModerationQuery {
    pub status: Option<String>,
    #[serde(default = "default_moderation_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ReportQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct UsersQuery {
    #[serde(default = "default_moderation_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UserEventsQuery {
    #[serde(rename = "type", default)]
    pub mode: UserEventsMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FlagEventDto {
    pub reason: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RemoveEventDto {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SuspendUserDto {
    pub reason: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NewUserDto {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

impl NewUserDto {
    pub fn validate(&self) -> Result<(), MyError> {
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => {}
            _ => return Err(bad("a valid email is required")),
        }
        if self.password.chars().count() < 6 {
            return Err(bad("password must be at least 6 characters"));
        }
        let name_len = self.display_name.trim().chars().count();
        if !(2..=50).contains(&name_len) {
            return Err(bad("display name must be between 2 and 50 characters"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoginUserRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileDto {
    pub display_name: Option<String>,
    pub bio: Option<String>,
}

impl UpdateProfileDto {
    pub fn validate(&self) -> Result<(), MyError> {
        if let Some(name) = &self.display_name {
            let len = name.trim().chars().count();
            if !(2..=50).contains(&len) {
                return Err(bad("display name must be between 2 and 50 characters"));
            }
        }
        if let Some(bio) = &self.bio {
            if bio.chars().count() > MAX_BIO_LEN {
                return Err(bad("bio must be at most 500 characters"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct AuthUserResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub uid: Uuid,
    pub email: String,
    pub is_admin: bool,
    pub exp: usize,
}

impl Claims {
    pub fn new(uid: Uuid, email: &str, is_admin: bool, exp: usize) -> Self {
        Self {
            uid,
            email: email.to_string(),
            is_admin,
            exp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GeoPoint;
    use chrono::Duration;

    fn new_event(now: DateTime<Utc>) -> NewEventDto {
        NewEventDto {
            title: "Marché Victor Hugo".into(),
            description: "Saturday market tour".into(),
            category: "food".into(),
            location: Location {
                geo_point: GeoPoint {
                    latitude: 43.6047,
                    longitude: 1.4489,
                },
                address: "Place Victor Hugo".into(),
            },
            capacity: 20,
            start_time: now + Duration::days(1),
            end_time: now + Duration::days(1) + Duration::hours(2),
            cover_image: None,
        }
    }

    #[test]
    fn new_event_rules() {
        let now = Utc::now();
        assert!(new_event(now).validate(now).is_ok());

        let mut dto = new_event(now);
        dto.title = " ".into();
        assert!(dto.validate(now).is_err());

        let mut dto = new_event(now);
        dto.capacity = 501;
        assert!(dto.validate(now).is_err());

        let mut dto = new_event(now);
        dto.location.geo_point.latitude = 91.0;
        assert!(dto.validate(now).is_err());

        let mut dto = new_event(now);
        dto.end_time = dto.start_time;
        assert!(dto.validate(now).is_err());

        let mut dto = new_event(now);
        dto.start_time = now - Duration::minutes(1);
        assert!(dto.validate(now).is_err());
    }

    #[test]
    fn user_events_mode_defaults_to_attending() {
        let query: UserEventsQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.mode, UserEventsMode::Attending);
        let query: UserEventsQuery = serde_json::from_str(r#"{"type":"organized"}"#).unwrap();
        assert_eq!(query.mode, UserEventsMode::Organized);
    }

    #[test]
    fn sign_up_rules() {
        let dto = NewUserDto {
            email: "lea@tolosa.fr".into(),
            password: "capitole".into(),
            display_name: "Léa".into(),
        };
        assert!(dto.validate().is_ok());
        assert!(NewUserDto { email: "nope".into(), ..dto.clone() }.validate().is_err());
        assert!(NewUserDto { password: "short".into(), ..dto.clone() }.validate().is_err());
        assert!(NewUserDto { display_name: "L".into(), ..dto }.validate().is_err());
    }
}
