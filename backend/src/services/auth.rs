//! Account service: registration, login, profile and password management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{validate_password_change, Account, DEFAULT_FORECAST_DAYS};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Input for registering a new farmer account
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 150, message = "Username must be 3-150 characters"))]
    pub username: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 150))]
    pub name: Option<String>,
    #[validate(length(max = 15, message = "Phone number must be at most 15 characters"))]
    pub phone_number: Option<String>,
    #[validate(length(max = 200, message = "Farm location must be at most 200 characters"))]
    pub farm_location: Option<String>,
    #[validate(range(min = 1, max = 14, message = "Days must be between 1 and 14"))]
    pub days: Option<i32>,
}

/// Profile fields a farmer may edit; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateProfileInput {
    #[validate(email(message = "Enter a valid email address"))]
    pub email: Option<String>,
    #[validate(length(max = 150))]
    pub name: Option<String>,
    #[validate(length(max = 15, message = "Phone number must be at most 15 characters"))]
    pub phone_number: Option<String>,
    #[validate(length(max = 200, message = "Farm location must be at most 200 characters"))]
    pub farm_location: Option<String>,
    #[validate(range(min = 1, max = 14, message = "Days must be between 1 and 14"))]
    pub days: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordInput {
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Response after successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub account: Account,
    #[serde(flatten)]
    pub tokens: AuthTokens,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Farmer ID
    pub username: String,
    pub exp: i64,
    pub iat: i64,
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Farmer row from database
#[derive(Debug, sqlx::FromRow)]
struct FarmerRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    name: Option<String>,
    phone_number: Option<String>,
    farm_location: Option<String>,
    days: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<FarmerRow> for Account {
    fn from(row: FarmerRow) -> Self {
        Account {
            id: row.id,
            username: row.username,
            email: row.email,
            name: row.name,
            phone_number: row.phone_number,
            farm_location: row.farm_location,
            days: row.days,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Postgres `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";

/// A concurrent registration that lost the race on the username constraint
/// reports a duplicate like the up-front check does
fn registration_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return AppError::DuplicateEntry("username".to_string());
        }
    }
    e.into()
}

const FARMER_COLUMNS: &str = "id, username, email, password_hash, name, phone_number, \
farm_location, days, created_at, updated_at";

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Register a new farmer account
    pub async fn register(&self, input: RegisterInput) -> AppResult<RegisterResponse> {
        input.validate()?;

        let existing =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM farmers WHERE username = $1")
                .bind(&input.username)
                .fetch_one(&self.db)
                .await?;

        if existing > 0 {
            return Err(AppError::DuplicateEntry("username".to_string()));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let row = sqlx::query_as::<_, FarmerRow>(&format!(
            r#"
            INSERT INTO farmers (username, email, password_hash, name, phone_number, farm_location, days)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            FARMER_COLUMNS
        ))
        .bind(&input.username)
        .bind(&input.email)
        .bind(&password_hash)
        .bind(&input.name)
        .bind(&input.phone_number)
        .bind(&input.farm_location)
        .bind(input.days.unwrap_or(DEFAULT_FORECAST_DAYS))
        .fetch_one(&self.db)
        .await
        .map_err(registration_error)?;

        tracing::info!("Registered farmer {}", row.username);

        let tokens = self.issue_token(row.id, &row.username)?;
        Ok(RegisterResponse {
            account: row.into(),
            tokens,
        })
    }

    /// Authenticate a farmer with username and password
    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthTokens> {
        let user = self
            .find_by_username(username)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        self.issue_token(user.id, &user.username)
    }

    /// Validate access token and return claims
    pub fn validate_token(&self, token: &str) -> AppResult<Claims> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    /// Fetch a farmer's profile
    pub async fn get_profile(&self, farmer_id: Uuid) -> AppResult<Account> {
        self.find_by_id(farmer_id)
            .await?
            .map(Account::from)
            .ok_or_else(|| AppError::NotFound("Account".to_string()))
    }

    /// Update a farmer's profile
    pub async fn update_profile(
        &self,
        farmer_id: Uuid,
        input: UpdateProfileInput,
    ) -> AppResult<Account> {
        input.validate()?;

        let row = sqlx::query_as::<_, FarmerRow>(&format!(
            r#"
            UPDATE farmers SET
                email = COALESCE($2, email),
                name = COALESCE($3, name),
                phone_number = COALESCE($4, phone_number),
                farm_location = COALESCE($5, farm_location),
                days = COALESCE($6, days),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            FARMER_COLUMNS
        ))
        .bind(farmer_id)
        .bind(&input.email)
        .bind(&input.name)
        .bind(&input.phone_number)
        .bind(&input.farm_location)
        .bind(input.days)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Account".to_string()))?;

        Ok(row.into())
    }

    /// Change a farmer's password after verifying the old one
    pub async fn change_password(
        &self,
        farmer_id: Uuid,
        input: ChangePasswordInput,
    ) -> AppResult<()> {
        validate_password_change(&input.new_password, &input.confirm_password)
            .map_err(|msg| AppError::field("new_password", msg))?;

        let user = self
            .find_by_id(farmer_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Account".to_string()))?;

        let valid = verify(&input.old_password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::field("old_password", "Old password is incorrect"));
        }

        let password_hash = hash(&input.new_password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        sqlx::query("UPDATE farmers SET password_hash = $2, updated_at = NOW() WHERE id = $1")
            .bind(farmer_id)
            .bind(&password_hash)
            .execute(&self.db)
            .await?;

        tracing::info!("Password changed for farmer {}", farmer_id);
        Ok(())
    }

    /// Sign an access token for a farmer
    pub fn issue_token(&self, farmer_id: Uuid, username: &str) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expiry);

        let claims = Claims {
            sub: farmer_id.to_string(),
            username: username.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        let access_token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))?;

        Ok(AuthTokens {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    async fn find_by_id(&self, farmer_id: Uuid) -> AppResult<Option<FarmerRow>> {
        let row = sqlx::query_as::<_, FarmerRow>(&format!(
            "SELECT {} FROM farmers WHERE id = $1",
            FARMER_COLUMNS
        ))
        .bind(farmer_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<FarmerRow>> {
        let row = sqlx::query_as::<_, FarmerRow>(&format!(
            "SELECT {} FROM farmers WHERE username = $1",
            FARMER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn service() -> AuthService {
        let db = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/cropwatch_test")
            .unwrap();
        AuthService {
            db,
            jwt_secret: "test-secret".to_string(),
            access_token_expiry: 3600,
        }
    }

    fn register_input() -> RegisterInput {
        RegisterInput {
            username: "farmer1".to_string(),
            email: "farmer1@example.com".to_string(),
            password: "correct horse".to_string(),
            name: None,
            phone_number: None,
            farm_location: None,
            days: None,
        }
    }

    #[tokio::test]
    async fn test_issued_token_validates() {
        let auth = service();
        let id = Uuid::new_v4();
        let tokens = auth.issue_token(id, "farmer1").unwrap();

        assert_eq!(tokens.token_type, "Bearer");
        let claims = auth.validate_token(&tokens.access_token).unwrap();
        assert_eq!(claims.sub, id.to_string());
        assert_eq!(claims.username, "farmer1");
    }

    #[tokio::test]
    async fn test_token_signed_with_other_secret_is_rejected() {
        let auth = service();
        let mut other = service();
        other.jwt_secret = "another-secret".to_string();

        let tokens = other.issue_token(Uuid::new_v4(), "farmer1").unwrap();
        assert!(matches!(
            auth.validate_token(&tokens.access_token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_register_input_validation() {
        assert!(register_input().validate().is_ok());

        let mut input = register_input();
        input.username = "ab".to_string();
        assert!(input.validate().is_err());

        let mut input = register_input();
        input.email = "not-an-email".to_string();
        assert!(input.validate().is_err());

        let mut input = register_input();
        input.days = Some(15);
        assert!(input.validate().is_err());

        let mut input = register_input();
        input.phone_number = Some("1".repeat(16));
        assert!(input.validate().is_err());
    }

    #[derive(Debug)]
    struct PgError(&'static str);

    impl std::fmt::Display for PgError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "database error {}", self.0)
        }
    }

    impl std::error::Error for PgError {}

    impl sqlx::error::DatabaseError for PgError {
        fn message(&self) -> &str {
            "database error"
        }

        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(std::borrow::Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            if self.0 == UNIQUE_VIOLATION {
                sqlx::error::ErrorKind::UniqueViolation
            } else {
                sqlx::error::ErrorKind::Other
            }
        }
    }

    #[test]
    fn test_username_race_is_a_duplicate() {
        let err = registration_error(sqlx::Error::Database(Box::new(PgError("23505"))));
        assert!(matches!(err, AppError::DuplicateEntry(ref field) if field == "username"));

        let err = registration_error(sqlx::Error::Database(Box::new(PgError("23514"))));
        assert!(matches!(err, AppError::DatabaseError(_)));

        let err = registration_error(sqlx::Error::RowNotFound);
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[test]
    fn test_update_profile_validation() {
        assert!(UpdateProfileInput::default().validate().is_ok());

        let input = UpdateProfileInput {
            days: Some(0),
            ..Default::default()
        };
        assert!(input.validate().is_err());
    }
}
