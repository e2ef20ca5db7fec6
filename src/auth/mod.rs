//! Authentication and authorization.
//!
//! Identity is established from a bearer JWT; a role check gates admin-only
//! operations. The two failure modes stay distinct end to end:
//! missing/invalid credential is 401, valid identity without the admin role
//! is 403. Password login and one-time email codes both resolve to the same
//! JWT claims.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, SaltString},
    Argon2, PasswordHasher, PasswordVerifier,
};
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{user, User, UserModel, UserRole},
    events::{Event, EventSender},
};

/// JWT claim set.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    /// Account role
    pub role: String,
    /// Token id
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Identity attached to request extensions by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Authentication settings.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub otp_ttl: Duration,
}

impl AuthConfig {
    pub fn new(jwt_secret: String, token_ttl: Duration, otp_ttl: Duration) -> Self {
        Self {
            jwt_secret,
            token_ttl,
            otp_ttl,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Missing authentication credential")]
    MissingAuth,
    #[error("Invalid authentication token")]
    InvalidToken,
    #[error("Authentication token has expired")]
    TokenExpired,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Invalid or expired one-time code")]
    InvalidOtp,
    #[error("Admin role required")]
    InsufficientRole,
    #[error("Email is already registered")]
    EmailTaken,
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::error::DbErr),
    #[error("Internal auth error: {0}")]
    Internal(String),
}

impl AuthError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingAuth
            | Self::InvalidToken
            | Self::TokenExpired
            | Self::InvalidCredentials
            | Self::InvalidOtp => StatusCode::UNAUTHORIZED,
            Self::InsufficientRole => StatusCode::FORBIDDEN,
            Self::EmailTaken => StatusCode::CONFLICT,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn response_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = serde_json::json!({
            "success": false,
            "message": self.response_message(),
            "error": match status {
                StatusCode::UNAUTHORIZED => "unauthenticated",
                StatusCode::FORBIDDEN => "forbidden",
                StatusCode::CONFLICT => "conflict",
                StatusCode::BAD_REQUEST => "validation_error",
                _ => "internal_error",
            },
        });
        (status, Json(body)).into_response()
    }
}

/// Issues and validates credentials against the user table.
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl AuthService {
    pub fn new(config: AuthConfig, db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self {
            config,
            db,
            event_sender,
        }
    }

    /// Registers a new customer account.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn register(&self, input: RegisterInput) -> Result<UserModel, AuthError> {
        input
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        let existing = User::find()
            .filter(user::Column::Email.eq(input.email.clone()))
            .one(&*self.db)
            .await?;
        if existing.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(input.password.as_bytes(), &salt)
            .map_err(|e| AuthError::Internal(format!("password hashing failed: {e}")))?
            .to_string();

        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let model = user::ActiveModel {
            id: Set(user_id),
            email: Set(input.email),
            password_hash: Set(password_hash),
            role: Set(UserRole::Customer),
            otp_hash: Set(None),
            otp_expires_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let created = model.insert(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::UserRegistered(user_id))
            .await;
        info!(user_id = %user_id, "user registered");
        Ok(created)
    }

    /// Password login; returns a bearer token on success.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<TokenResponse, AuthError> {
        let user = User::find()
            .filter(user::Column::Email.eq(input.email.clone()))
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let parsed = PasswordHash::new(&user.password_hash)
            .map_err(|e| AuthError::Internal(format!("stored hash unreadable: {e}")))?;
        Argon2::default()
            .verify_password(input.password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)?;

        self.issue_token(&user)
    }

    /// Issues a one-time login code for the given email.
    ///
    /// Always reports success so the endpoint cannot be used to probe which
    /// addresses have accounts. Delivery rides the event channel and can
    /// never fail the request.
    #[instrument(skip(self))]
    pub async fn request_otp(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = User::find()
            .filter(user::Column::Email.eq(email.to_string()))
            .one(&*self.db)
            .await?
        else {
            debug!("one-time code requested for unknown email");
            return Ok(());
        };

        let code = format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32));
        let code_hash = hex::encode(Sha256::digest(code.as_bytes()));
        let expires_at = Utc::now()
            + ChronoDuration::from_std(self.config.otp_ttl)
                .map_err(|e| AuthError::Internal(format!("invalid otp ttl: {e}")))?;

        let mut active: user::ActiveModel = user.into();
        active.otp_hash = Set(Some(code_hash));
        active.otp_expires_at = Set(Some(expires_at));
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OtpIssued {
                email: email.to_string(),
                code,
            })
            .await;
        Ok(())
    }

    /// Exchanges a valid one-time code for a bearer token. Codes are single
    /// use; the stored hash is cleared on success.
    #[instrument(skip(self, code))]
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<TokenResponse, AuthError> {
        let user = User::find()
            .filter(user::Column::Email.eq(email.to_string()))
            .one(&*self.db)
            .await?
            .ok_or(AuthError::InvalidOtp)?;

        let (Some(stored_hash), Some(expires_at)) = (&user.otp_hash, user.otp_expires_at) else {
            return Err(AuthError::InvalidOtp);
        };
        if expires_at < Utc::now() {
            return Err(AuthError::InvalidOtp);
        }
        let code_hash = hex::encode(Sha256::digest(code.as_bytes()));
        if &code_hash != stored_hash {
            warn!(email = %email, "one-time code mismatch");
            return Err(AuthError::InvalidOtp);
        }

        let token = self.issue_token(&user)?;

        let mut active: user::ActiveModel = user.into();
        active.otp_hash = Set(None);
        active.otp_expires_at = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&*self.db).await?;

        Ok(token)
    }

    fn issue_token(&self, user: &UserModel) -> Result<TokenResponse, AuthError> {
        let now = Utc::now();
        let ttl = self.config.token_ttl.as_secs() as i64;
        let claims = Claims {
            sub: user.id.to_string(),
            role: user.role.as_str().to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: now.timestamp() + ttl,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::Internal(format!("token encoding failed: {e}")))?;

        Ok(TokenResponse {
            access_token: token,
            token_type: "bearer".to_string(),
            expires_in: ttl,
        })
    }

    /// Validates a bearer token and resolves it to an [`AuthUser`].
    pub fn validate_token(&self, token: &str) -> Result<AuthUser, AuthError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?;

        let user_id = Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)?;
        let role = UserRole::parse(&data.claims.role).ok_or(AuthError::InvalidToken)?;
        Ok(AuthUser { user_id, role })
    }
}

/// Extracts and validates the bearer credential, attaching [`AuthUser`] to
/// request extensions. Requests without a valid credential are rejected
/// with 401 before reaching any handler.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return AuthError::Internal("auth service not available".to_string()).into_response()
        }
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token else {
        return AuthError::MissingAuth.into_response();
    };

    match auth_service.validate_token(token) {
        Ok(user) => {
            let mut request = request;
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Gate for admin-only routes. Runs after [`auth_middleware`], so a missing
/// identity here is still 401; a present non-admin identity is 403.
pub async fn require_admin(request: Request, next: Next) -> Response {
    match request.extensions().get::<AuthUser>() {
        None => AuthError::MissingAuth.into_response(),
        Some(user) if !user.is_admin() => AuthError::InsufficientRole.into_response(),
        Some(_) => next.run(request).await,
    }
}

// Request/response types for the auth endpoints

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OtpRequestInput {
    #[validate(email)]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpVerifyInput {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Router for the public auth endpoints.
pub fn auth_routes() -> Router<Arc<AuthService>> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/otp/request", post(otp_request_handler))
        .route("/otp/verify", post(otp_verify_handler))
}

async fn register_handler(
    State(auth): State<Arc<AuthService>>,
    Json(input): Json<RegisterInput>,
) -> Result<impl IntoResponse, AuthError> {
    let user = auth.register(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "success": true,
            "data": { "id": user.id, "email": user.email, "role": user.role },
        })),
    ))
}

async fn login_handler(
    State(auth): State<Arc<AuthService>>,
    Json(input): Json<LoginInput>,
) -> Result<impl IntoResponse, AuthError> {
    let token = auth.login(input).await?;
    Ok(Json(serde_json::json!({ "success": true, "data": token })))
}

async fn otp_request_handler(
    State(auth): State<Arc<AuthService>>,
    Json(input): Json<OtpRequestInput>,
) -> Result<impl IntoResponse, AuthError> {
    input
        .validate()
        .map_err(|e| AuthError::Validation(e.to_string()))?;
    auth.request_otp(&input.email).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "If the address is registered, a code has been sent",
    })))
}

async fn otp_verify_handler(
    State(auth): State<Arc<AuthService>>,
    Json(input): Json<OtpVerifyInput>,
) -> Result<impl IntoResponse, AuthError> {
    let token = auth.verify_otp(&input.email, &input.code).await?;
    Ok(Json(serde_json::json!({ "success": true, "data": token })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service_without_db() -> AuthService {
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        AuthService::new(
            AuthConfig::new(
                "unit_test_secret_key_that_is_long_enough".to_string(),
                Duration::from_secs(3600),
                Duration::from_secs(300),
            ),
            Arc::new(DatabaseConnection::Disconnected),
            EventSender::new(tx),
        )
    }

    fn sample_user(role: UserRole) -> UserModel {
        let now = Utc::now();
        UserModel {
            id: Uuid::new_v4(),
            email: "user@example.com".to_string(),
            password_hash: String::new(),
            role,
            otp_hash: None,
            otp_expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_validates_back_to_same_identity() {
        let service = service_without_db();
        let user = sample_user(UserRole::Admin);
        let token = service.issue_token(&user).unwrap();
        let auth_user = service.validate_token(&token.access_token).unwrap();
        assert_eq!(auth_user.user_id, user.id);
        assert!(auth_user.is_admin());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let service = service_without_db();
        assert!(matches!(
            service.validate_token("not.a.token"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let service = service_without_db();
        let (tx, _rx) = tokio::sync::mpsc::channel(1);
        let other = AuthService::new(
            AuthConfig::new(
                "a_completely_different_secret_keyxxxxxxx".to_string(),
                Duration::from_secs(3600),
                Duration::from_secs(300),
            ),
            Arc::new(DatabaseConnection::Disconnected),
            EventSender::new(tx),
        );
        let token = other.issue_token(&sample_user(UserRole::Customer)).unwrap();
        assert!(service.validate_token(&token.access_token).is_err());
    }

    #[test]
    fn customer_is_not_admin() {
        let service = service_without_db();
        let token = service.issue_token(&sample_user(UserRole::Customer)).unwrap();
        let auth_user = service.validate_token(&token.access_token).unwrap();
        assert!(!auth_user.is_admin());
    }

    #[test]
    fn unauthenticated_and_forbidden_statuses_differ() {
        assert_eq!(AuthError::MissingAuth.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AuthError::InsufficientRole.status_code(),
            StatusCode::FORBIDDEN
        );
    }
}
