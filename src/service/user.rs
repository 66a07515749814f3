use std::sync::Arc;

use log::{error, info, warn};
use uuid::Uuid;

use super::auth::jwt;
use super::clock::Clock;
use super::crypto;
use crate::db::UserStore;
use crate::dto::{AuthUserResponse, LoginUserRequest, NewUserDto, UpdateProfileDto};
use crate::errors::MyError;
use crate::models::User;

#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub ttl_secs: u64,
}

pub struct UserService {
    users: Arc<dyn UserStore>,
    tokens: TokenSettings,
    clock: Arc<dyn Clock>,
}

impl UserService {
    pub fn new(users: Arc<dyn UserStore>, tokens: TokenSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            tokens,
            clock,
        }
    }

    fn issue_token(&self, user: &User) -> Result<String, MyError> {
        jwt::create(
            user.uid,
            &user.email,
            user.is_admin,
            &self.tokens.secret,
            self.tokens.ttl_secs,
        )
        .map_err(|err| {
            error!("failed to sign token for {}: {}", user.uid, err);
            MyError::InternalError
        })
    }

    pub async fn create(&self, dto: NewUserDto) -> Result<AuthUserResponse, MyError> {
        dto.validate()?;
        let email = dto.email.trim().to_lowercase();
        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(MyError::Conflict("user with this email already exists".to_string()));
        }
        let user = User {
            uid: Uuid::new_v4(),
            email,
            display_name: dto.display_name.trim().to_string(),
            pwd_hash: crypto::hash_password(&dto.password),
            photo_url: None,
            bio: None,
            joined_at: self.clock.now(),
            is_admin: false,
            suspended: false,
            suspension_reason: None,
            deleted: false,
        };
        self.users.insert_user(&user).await?;
        info!("user {} registered", user.uid);
        let token = self.issue_token(&user)?;
        Ok(AuthUserResponse { user, token })
    }

    pub async fn login(&self, req: LoginUserRequest) -> Result<AuthUserResponse, MyError> {
        let email = req.email.trim().to_lowercase();
        let user = match self.users.find_user_by_email(&email).await? {
            Some(user) if !user.deleted && crypto::verify_password(&req.password, &user.pwd_hash) => {
                user
            }
            _ => return Err(MyError::AuthError),
        };
        if user.suspended {
            warn!("suspended user {} tried to sign in", user.uid);
            return Err(MyError::Unauthorized);
        }
        let token = self.issue_token(&user)?;
        Ok(AuthUserResponse { user, token })
    }

    pub async fn get_by_id(&self, uid: Uuid) -> Result<User, MyError> {
        match self.users.find_user(uid).await? {
            Some(user) if !user.deleted => Ok(user),
            _ => Err(MyError::NotFound("user not found".to_string())),
        }
    }

    pub async fn update_profile(&self, uid: Uuid, dto: UpdateProfileDto) -> Result<User, MyError> {
        dto.validate()?;
        let mut user = self.get_by_id(uid).await?;
        if let Some(name) = dto.display_name {
            user.display_name = name.trim().to_string();
        }
        if let Some(bio) = dto.bio {
            user.bio = Some(bio);
        }
        self.users.save_user(&user).await?;
        Ok(user)
    }

    pub async fn delete_account(&self, uid: Uuid) -> Result<(), MyError> {
        let mut user = self.get_by_id(uid).await?;
        user.deleted = true;
        self.users.save_user(&user).await?;
        info!("user {} deleted their account", uid);
        Ok(())
    }

    pub async fn get_all(&self, limit: i64, offset: i64) -> Result<Vec<User>, MyError> {
        Ok(self.users.list_users(limit.max(0), offset.max(0)).await?)
    }

    pub async fn set_admin(&self, uid: Uuid, is_admin: bool) -> Result<User, MyError> {
        let mut user = self.get_by_id(uid).await?;
        user.is_admin = is_admin;
        self.users.save_user(&user).await?;
        warn!("user {} admin flag set to {}", uid, is_admin);
        Ok(user)
    }

    pub async fn suspend(&self, uid: Uuid, reason: String) -> Result<User, MyError> {
        let mut user = self.get_by_id(uid).await?;
        user.suspended = true;
        user.suspension_reason = Some(reason);
        self.users.save_user(&user).await?;
        warn!("user {} suspended", uid);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::service::clock::SystemClock;

    fn service() -> UserService {
        UserService::new(
            Arc::new(MemoryStore::new()),
            TokenSettings {
                secret: "users-secret".into(),
                ttl_secs: 3600,
            },
            Arc::new(SystemClock),
        )
    }

    fn sign_up(email: &str) -> NewUserDto {
        NewUserDto {
            email: email.into(),
            password: "minimes31".into(),
            display_name: "Camille".into(),
        }
    }

    fn login(email: &str, password: &str) -> LoginUserRequest {
        LoginUserRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[actix_rt::test]
    async fn sign_up_then_sign_in() {
        let users = service();
        let created = users.create(sign_up("Camille@Tolosa.fr")).await.unwrap();
        assert_eq!(created.user.email, "camille@tolosa.fr");
        let claims = jwt::decode_claims(&created.token, "users-secret").unwrap();
        assert_eq!(claims.uid, created.user.uid);

        let session = users.login(login("camille@tolosa.fr", "minimes31")).await.unwrap();
        assert_eq!(session.user.uid, created.user.uid);
        assert_eq!(
            users.login(login("camille@tolosa.fr", "wrong-pass")).await.unwrap_err(),
            MyError::AuthError
        );
    }

    #[actix_rt::test]
    async fn duplicate_email_conflicts() {
        let users = service();
        users.create(sign_up("dup@tolosa.fr")).await.unwrap();
        assert!(matches!(
            users.create(sign_up("dup@tolosa.fr")).await,
            Err(MyError::Conflict(_))
        ));
    }

    #[actix_rt::test]
    async fn suspended_and_deleted_users_cannot_sign_in() {
        let users = service();
        let a = users.create(sign_up("a@tolosa.fr")).await.unwrap().user;
        let b = users.create(sign_up("b@tolosa.fr")).await.unwrap().user;

        users.suspend(a.uid, "spam".into()).await.unwrap();
        assert_eq!(
            users.login(login("a@tolosa.fr", "minimes31")).await.unwrap_err(),
            MyError::Unauthorized
        );

        users.delete_account(b.uid).await.unwrap();
        assert_eq!(
            users.login(login("b@tolosa.fr", "minimes31")).await.unwrap_err(),
            MyError::AuthError
        );
        let listed = users.get_all(50, 0).await.unwrap();
        assert_eq!(listed.iter().map(|u| u.uid).collect::<Vec<_>>(), vec![a.uid]);
    }

    #[actix_rt::test]
    async fn profile_updates_and_admin_flag() {
        let users = service();
        let user = users.create(sign_up("p@tolosa.fr")).await.unwrap().user;
        let dto = UpdateProfileDto {
            display_name: None,
            bio: Some("Rugby et cassoulet".into()),
        };
        let updated = users.update_profile(user.uid, dto).await.unwrap();
        assert_eq!(updated.bio.as_deref(), Some("Rugby et cassoulet"));

        assert!(users.set_admin(user.uid, true).await.unwrap().is_admin);
        assert!(matches!(
            users.set_admin(Uuid::new_v4(), true).await,
            Err(MyError::NotFound(_))
        ));
    }
}
