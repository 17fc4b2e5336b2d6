//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{Duration, Utc};
use validator::Validate;

use crate::{AppState, AppError, AppResult};
use crate::config::Config;
use crate::middleware::auth::UserContext;
use crate::models::{TokenRequest, TokenResponse, User, UserInfo};

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,         // User ID
    pub username: String,
    pub token_type: String,  // "access" or "refresh"
    pub exp: usize,          // Expiration timestamp
    pub iat: usize,          // Issued at
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    pub username: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub password2: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Register a new user
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserInfo>)> {
    let username = req.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::ValidationError("Username is required".to_string()));
    }

    if let Some(password2) = &req.password2 {
        if *password2 != req.password {
            return Err(AppError::ValidationError("Passwords do not match".to_string()));
        }
    }

    req.validate()
        .map_err(|errs| AppError::ValidationError(validation_message(&errs)))?;
    validate_password(&req.password, &username)?;

    if User::find_by_username(&state.pool, &username).await?.is_some() {
        return Err(AppError::ValidationError("Username already exists".to_string()));
    }

    // Hash password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .to_string();

    let user = User::create(&state.pool, &username, &password_hash).await?;

    tracing::info!("New user registered: {} ({})", user.username, user.id);

    Ok((StatusCode::CREATED, Json(user.to_info())))
}

/// Obtain an access/refresh token pair
pub async fn token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> AppResult<Json<TokenResponse>> {
    let user = User::find_by_username(&state.pool, &req.username)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password_hash)
        .map_err(|_| AppError::InternalError("Invalid password hash".to_string()))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| AppError::InvalidCredentials)?;

    User::update_last_login(&state.pool, user.id).await?;

    let access = generate_token(&user, &state.config, TOKEN_TYPE_ACCESS)?;
    let refresh = generate_token(&user, &state.config, TOKEN_TYPE_REFRESH)?;

    Ok(Json(TokenResponse { access, refresh }))
}

/// Exchange a refresh token for a fresh access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> AppResult<Json<RefreshResponse>> {
    let token_data = decode::<Claims>(
        &req.refresh,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )?;

    let claims = token_data.claims;
    if claims.token_type != TOKEN_TYPE_REFRESH {
        return Err(AppError::TokenInvalid);
    }

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::TokenInvalid)?;
    let user = User::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    let access = generate_token(&user, &state.config, TOKEN_TYPE_ACCESS)?;

    Ok(Json(RefreshResponse { access }))
}

/// Current authenticated user
pub async fn me(
    State(state): State<AppState>,
    user_ctx: UserContext,
) -> AppResult<Json<UserInfo>> {
    tracing::debug!("Profile lookup for {}", user_ctx.username);

    let user = User::find_by_id(&state.pool, user_ctx.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    Ok(Json(user.to_info()))
}

/// Generate a JWT of the given type for a user
pub fn generate_token(user: &User, config: &Config, token_type: &str) -> AppResult<String> {
    let now = Utc::now();
    let lifetime = match token_type {
        TOKEN_TYPE_REFRESH => Duration::hours(config.jwt_refresh_ttl_hours as i64),
        _ => Duration::minutes(config.jwt_access_ttl_minutes as i64),
    };
    let exp = now + lifetime;

    let claims = Claims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        token_type: token_type.to_string(),
        exp: exp.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    ).map_err(|e| AppError::InternalError(e.to_string()))
}

/// Password policy: length is covered by the request validator; here we
/// reject entirely-numeric passwords and passwords containing the username.
fn validate_password(password: &str, username: &str) -> Result<(), AppError> {
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::ValidationError(
            "Password cannot be entirely numeric".to_string(),
        ));
    }

    if username.len() >= 3
        && password.to_lowercase().contains(&username.to_lowercase())
    {
        return Err(AppError::ValidationError(
            "Password is too similar to the username".to_string(),
        ));
    }

    Ok(())
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    let messages: Vec<String> = errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .filter_map(|err| err.message.as_ref().map(|m| m.to_string()))
        .collect();

    if messages.is_empty() {
        "Invalid input".to_string()
    } else {
        messages.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "tester".to_string(),
            password_hash: String::new(),
            is_active: true,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn test_config() -> Config {
        let mut config = Config::from_env();
        config.jwt_secret = "test-secret".to_string();
        config
    }

    #[test]
    fn password_policy_rejects_numeric_and_similar() {
        assert!(validate_password("12345678", "alice").is_err());
        assert!(validate_password("my-alice-pass", "alice").is_err());
        assert!(validate_password("correct horse battery", "alice").is_ok());
    }

    #[test]
    fn register_request_rejects_short_password() {
        let req = RegisterRequest {
            username: "alice".to_string(),
            password: "short".to_string(),
            password2: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn access_token_round_trips() {
        let config = test_config();
        let user = test_user();

        let token = generate_token(&user, &config, TOKEN_TYPE_ACCESS).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.sub, user.id.to_string());
        assert_eq!(data.claims.username, "tester");
        assert_eq!(data.claims.token_type, TOKEN_TYPE_ACCESS);
    }

    #[test]
    fn refresh_token_carries_its_type() {
        let config = test_config();
        let user = test_user();

        let token = generate_token(&user, &config, TOKEN_TYPE_REFRESH).unwrap();
        let data = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap();

        assert_eq!(data.claims.token_type, TOKEN_TYPE_REFRESH);
    }
}
