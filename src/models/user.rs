//! User model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

/// Membership tiers. Staff and admin gate inventory management and
/// access to other members' borrowing history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MembershipType {
    Standard,
    Premium,
    Student,
    Staff,
    Admin,
}

impl MembershipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipType::Standard => "standard",
            MembershipType::Premium => "premium",
            MembershipType::Student => "student",
            MembershipType::Staff => "staff",
            MembershipType::Admin => "admin",
        }
    }

    /// Staff and admin accounts manage inventory and may read any
    /// member's borrowing history.
    pub fn is_staff(&self) -> bool {
        matches!(self, MembershipType::Staff | MembershipType::Admin)
    }
}

impl std::fmt::Display for MembershipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MembershipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(MembershipType::Standard),
            "premium" => Ok(MembershipType::Premium),
            "student" => Ok(MembershipType::Student),
            "staff" => Ok(MembershipType::Staff),
            "admin" => Ok(MembershipType::Admin),
            _ => Err(format!("Invalid membership type: {}", s)),
        }
    }
}

// SQLx conversion for MembershipType (stored as TEXT)
impl sqlx::Type<Postgres> for MembershipType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for MembershipType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for MembershipType {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        let s: String = self.as_str().to_string();
        <String as Encode<Postgres>>::encode(s, buf)
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub membership_type: MembershipType,
    pub is_active: bool,
    pub membership_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            membership_type: self.membership_type,
            is_active: self.is_active,
            membership_date: self.membership_date,
            created_at: self.created_at,
        }
    }
}

/// Public user fields, safe to return to clients
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserPublic {
    pub id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub membership_type: MembershipType,
    pub is_active: bool,
    pub membership_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Borrower fields embedded in borrow records and book details
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BorrowerSummary {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Registration request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 2, max = 50, message = "First name must be 2-50 characters"))]
    pub first_name: String,
    #[validate(length(min = 2, max = 50, message = "Last name must be 2-50 characters"))]
    pub last_name: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Defaults to standard; admin accounts cannot be self-registered.
    pub membership_type: Option<MembershipType>,
}

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Update own profile request (for authenticated users)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfile {
    #[validate(length(min = 2, max = 50, message = "First name must be 2-50 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 2, max = 50, message = "Last name must be 2-50 characters"))]
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Current password (required to change password)
    pub current_password: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub new_password: Option<String>,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub membership_type: MembershipType,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    pub fn new(user: &User, now: i64, expiration_hours: u64) -> Self {
        Self {
            sub: user.email.clone(),
            user_id: user.id,
            membership_type: user.membership_type,
            exp: now + (expiration_hours as i64 * 3600),
            iat: now,
        }
    }

    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_staff(&self) -> bool {
        self.membership_type.is_staff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: 7,
            email: "jane.smith@example.com".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Smith".to_string(),
            phone: None,
            address: None,
            membership_type: MembershipType::Staff,
            is_active: true,
            membership_date: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn membership_type_round_trip() {
        for slug in ["standard", "premium", "student", "staff", "admin"] {
            let parsed: MembershipType = slug.parse().unwrap();
            assert_eq!(parsed.as_str(), slug);
        }
        assert!("librarian".parse::<MembershipType>().is_err());
    }

    #[test]
    fn staff_and_admin_are_staff() {
        assert!(MembershipType::Staff.is_staff());
        assert!(MembershipType::Admin.is_staff());
        assert!(!MembershipType::Standard.is_staff());
        assert!(!MembershipType::Premium.is_staff());
        assert!(!MembershipType::Student.is_staff());
    }

    #[test]
    fn token_round_trip() {
        let user = sample_user();
        let claims = UserClaims::new(&user, Utc::now().timestamp(), 24);
        let token = claims.create_token("secret").unwrap();

        let decoded = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.sub, "jane.smith@example.com");
        assert_eq!(decoded.membership_type, MembershipType::Staff);

        assert!(UserClaims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let user = sample_user();
        // Issued two days ago with a 24h lifetime, well past the leeway.
        let issued = Utc::now().timestamp() - 48 * 3600;
        let claims = UserClaims::new(&user, issued, 24);
        let token = claims.create_token("secret").unwrap();

        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn claims_carry_the_membership_tier() {
        let mut user = sample_user();
        user.membership_type = MembershipType::Standard;
        let claims = UserClaims::new(&user, Utc::now().timestamp(), 24);
        assert!(!claims.is_staff());
    }
}
