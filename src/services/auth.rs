//! Authentication and account service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{
        LoginRequest, MembershipType, RegisterRequest, UpdateProfile, User, UserClaims, UserPublic,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Register a new account and log it in
    pub async fn register(&self, request: RegisterRequest) -> AppResult<(String, UserPublic)> {
        let membership_type = request.membership_type.unwrap_or(MembershipType::Standard);
        if membership_type == MembershipType::Admin {
            return Err(AppError::Validation(
                "membership_type: admin accounts cannot be self-registered".to_string(),
            ));
        }

        if self.repository.users.email_exists(&request.email).await? {
            return Err(AppError::Conflict(
                "User with this email already exists".to_string(),
            ));
        }

        let password_hash = self.hash_password(&request.password)?;
        let user = self
            .repository
            .users
            .create(&request, &password_hash, membership_type)
            .await?;

        tracing::info!(user_id = user.id, "registered new user");

        let token = self.issue_token(&user)?;
        Ok((token, user.public()))
    }

    /// Authenticate by email and password. Absent, inactive and
    /// wrong-password cases are indistinguishable to the caller.
    pub async fn login(&self, request: LoginRequest) -> AppResult<(String, UserPublic)> {
        let user = self
            .repository
            .users
            .get_by_email(&request.email)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| AppError::Authentication("Invalid credentials".to_string()))?;

        if !self.verify_password(&user, &request.password)? {
            return Err(AppError::Authentication("Invalid credentials".to_string()));
        }

        let token = self.issue_token(&user)?;
        Ok((token, user.public()))
    }

    /// Resolve verified claims to an active user. Used by the bearer
    /// extractor; a deactivated account invalidates its tokens.
    pub async fn resolve_claims(&self, claims: &UserClaims) -> AppResult<User> {
        let user = match self.repository.users.get_by_id(claims.user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Authentication(
                    "Invalid or inactive user".to_string(),
                ))
            }
            Err(e) => return Err(e),
        };

        if !user.is_active {
            return Err(AppError::Authentication(
                "Invalid or inactive user".to_string(),
            ));
        }

        Ok(user)
    }

    /// Current user's public profile
    pub async fn profile(&self, user_id: i32) -> AppResult<UserPublic> {
        let user = self.repository.users.get_by_id(user_id).await?;
        Ok(user.public())
    }

    /// Update the caller's own profile; password changes require the
    /// current password.
    pub async fn update_profile(
        &self,
        user_id: i32,
        profile: UpdateProfile,
    ) -> AppResult<UserPublic> {
        let user = self.repository.users.get_by_id(user_id).await?;

        if profile.new_password.is_some() {
            let current_password = profile.current_password.as_ref().ok_or_else(|| {
                AppError::Validation(
                    "current_password: required to change password".to_string(),
                )
            })?;

            if !self.verify_password(&user, current_password)? {
                return Err(AppError::Authentication(
                    "Current password is incorrect".to_string(),
                ));
            }
        }

        let password_hash = match profile.new_password {
            Some(ref new_password) => Some(self.hash_password(new_password)?),
            None => None,
        };

        let updated = self
            .repository
            .users
            .update_profile(user_id, &profile, password_hash)
            .await?;

        Ok(updated.public())
    }

    /// Create a JWT token for a user
    fn issue_token(&self, user: &User) -> AppResult<String> {
        let claims = UserClaims::new(user, Utc::now().timestamp(), self.config.jwt_expiration_hours);
        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Verify a user's password against the stored hash
    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }
}
