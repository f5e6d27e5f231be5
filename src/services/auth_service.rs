use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::{info, warn};

use crate::db::models::{NewUser, User, UserChanges};
use crate::db::{Storage, StoreError};
use crate::server::config::ServerConfig;
use crate::web::error::AppError;
use crate::web::models::{
    AuthResponse, AuthenticatedUser, Claims, LoginRequest, RegisterRequest, UpdateProfileRequest,
    UserResponse,
};

const MIN_PASSWORD_LEN: usize = 6;
const MIN_NAME_LEN: usize = 2;

/// Parses token lifetimes such as `24h`, `30m`, `7d`, `45s` or a bare number of seconds.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    let (number, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], Some(c)),
        _ => (value, None),
    };
    let amount: i64 = number.trim().parse().ok().filter(|n| *n > 0)?;
    match unit {
        None | Some('s') => Duration::try_seconds(amount),
        Some('m') => Duration::try_minutes(amount),
        Some('h') => Duration::try_hours(amount),
        Some('d') => Duration::try_days(amount),
        _ => None,
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation("A valid email address is required".to_string()))
    }
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.chars().count() < MIN_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Name must be at least {MIN_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::PasswordHashingError(e.to_string()))
}

pub async fn register_user(
    store: &dyn Storage,
    config: &ServerConfig,
    req: RegisterRequest,
) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email);
    validate_email(&email)?;
    validate_password(&req.password)?;
    let name = validate_name(&req.name)?;

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::UserAlreadyExists(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password, config.bcrypt_cost)?;
    let user = store
        .create_user(NewUser {
            email,
            name,
            password_hash,
        })
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration.
            StoreError::Conflict(_) => AppError::UserAlreadyExists(
                "An account with this email already exists".to_string(),
            ),
            other => other.into(),
        })?;

    info!(user_id = user.id, "User registered.");
    let token = create_jwt_for_user(&user, config)?;
    Ok(AuthResponse {
        message: "User registered successfully".to_string(),
        user: UserResponse::from(&user),
        token,
    })
}

pub async fn login_user(
    store: &dyn Storage,
    config: &ServerConfig,
    req: LoginRequest,
) -> Result<AuthResponse, AppError> {
    let email = normalize_email(&req.email);
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let user = store
        .find_user_by_email(&email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let valid_password = verify(&req.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Password verification failed: {e}")))?;
    if !valid_password {
        warn!(user_id = user.id, "Login rejected: wrong password.");
        return Err(AppError::InvalidCredentials);
    }

    let token = create_jwt_for_user(&user, config)?;
    Ok(AuthResponse {
        message: "Login successful".to_string(),
        user: UserResponse::from(&user),
        token,
    })
}

pub fn create_jwt_for_user(user: &User, config: &ServerConfig) -> Result<String, AppError> {
    let lifetime = parse_duration(&config.jwt_expires_in).unwrap_or_else(|| Duration::hours(24));
    let expiration = (Utc::now() + lifetime).timestamp().max(0) as usize;

    let claims = Claims {
        sub: user.email.clone(),
        user_id: user.id,
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::TokenCreationError(e.to_string()))
}

/// Decodes the bearer token and confirms the account still exists.
pub async fn authenticate(
    store: &dyn Storage,
    jwt_secret: &str,
    token: &str,
) -> Result<AuthenticatedUser, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        warn!(error = ?e, "JWT decoding error during auth middleware.");
        AppError::InvalidToken
    })?;

    let user = store
        .find_user(token_data.claims.user_id)
        .await?
        .filter(|u| u.email == token_data.claims.sub)
        .ok_or(AppError::UserNotFound)?;

    Ok(AuthenticatedUser {
        id: user.id,
        email: user.email,
        name: user.name,
    })
}

pub async fn profile(store: &dyn Storage, user: &AuthenticatedUser) -> Result<User, AppError> {
    store
        .find_user(user.id)
        .await?
        .ok_or(AppError::UserNotFound)
}

pub async fn update_profile(
    store: &dyn Storage,
    config: &ServerConfig,
    user: &AuthenticatedUser,
    req: UpdateProfileRequest,
) -> Result<User, AppError> {
    let mut changes = UserChanges::default();
    if let Some(name) = req.name {
        changes.name = Some(validate_name(&name)?);
    }
    if let Some(password) = req.password {
        validate_password(&password)?;
        changes.password_hash = Some(hash_password(&password, config.bcrypt_cost)?);
    }
    if changes.is_empty() {
        return Err(AppError::Validation("No fields to update".to_string()));
    }

    Ok(store.update_user(user.id, changes).await?)
}

/// Creates the configured admin account unless it already exists.
pub async fn ensure_admin(store: &dyn Storage, config: &ServerConfig) -> Result<(), AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(());
    };
    let email = normalize_email(email);
    if store.find_user_by_email(&email).await?.is_some() {
        return Ok(());
    }

    let user = store
        .create_user(NewUser {
            email,
            name: config.admin_name.clone(),
            password_hash: hash_password(password, config.bcrypt_cost)?,
        })
        .await?;
    info!(user_id = user.id, "Bootstrap admin account created.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "secret1".to_string(),
            name: "Alice".to_string(),
        }
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration("24h"), Some(Duration::hours(24)));
        assert_eq!(parse_duration("30m"), Some(Duration::minutes(30)));
        assert_eq!(parse_duration("7d"), Some(Duration::days(7)));
        assert_eq!(parse_duration("45s"), Some(Duration::seconds(45)));
        assert_eq!(parse_duration("3600"), Some(Duration::seconds(3600)));
        assert_eq!(parse_duration("0h"), None);
        assert_eq!(parse_duration("12w"), None);
        assert_eq!(parse_duration(""), None);
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let store = MemoryStore::new();
        let config = ServerConfig::for_tests();

        let registered = register_user(&store, &config, register_request(" Alice@Example.com "))
            .await
            .unwrap();
        assert_eq!(registered.user.email, "alice@example.com");

        let logged_in = login_user(
            &store,
            &config,
            LoginRequest {
                email: "alice@example.com".to_string(),
                password: "secret1".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let user = authenticate(&store, &config.jwt_secret, &logged_in.token)
            .await
            .unwrap();
        assert_eq!(user.id, registered.user.id);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let store = MemoryStore::new();
        let config = ServerConfig::for_tests();
        register_user(&store, &config, register_request("a@example.com"))
            .await
            .unwrap();

        let err = register_user(&store, &config, register_request("A@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UserAlreadyExists(_)));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let store = MemoryStore::new();
        let config = ServerConfig::for_tests();
        register_user(&store, &config, register_request("a@example.com"))
            .await
            .unwrap();

        for (email, password) in [("a@example.com", "wrong-pass"), ("b@example.com", "secret1")] {
            let err = login_user(
                &store,
                &config,
                LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn register_validates_input() {
        let store = MemoryStore::new();
        let config = ServerConfig::for_tests();

        let mut short_password = register_request("a@example.com");
        short_password.password = "12345".to_string();
        let mut short_name = register_request("a@example.com");
        short_name.name = " A ".to_string();

        for req in [register_request("not-an-email"), short_password, short_name] {
            let err = register_user(&store, &config, req).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let store = MemoryStore::new();
        let err = authenticate(&store, "test-secret", "not.a.jwt").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidToken));
    }

    #[tokio::test]
    async fn empty_profile_update_is_rejected() {
        let store = MemoryStore::new();
        let config = ServerConfig::for_tests();
        let registered = register_user(&store, &config, register_request("a@example.com"))
            .await
            .unwrap();
        let user = AuthenticatedUser {
            id: registered.user.id,
            email: registered.user.email,
            name: registered.user.name,
        };

        let err = update_profile(&store, &config, &user, UpdateProfileRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let updated = update_profile(
            &store,
            &config,
            &user,
            UpdateProfileRequest {
                name: Some("  Alicia ".to_string()),
                password: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.name, "Alicia");
    }

    #[tokio::test]
    async fn admin_bootstrap_is_idempotent() {
        let store = MemoryStore::new();
        let mut config = ServerConfig::for_tests();
        config.admin_email = Some("admin@example.com".to_string());
        config.admin_password = Some("adminpass".to_string());

        ensure_admin(&store, &config).await.unwrap();
        ensure_admin(&store, &config).await.unwrap();
        assert_eq!(store.counts().await.unwrap().users, 1);
    }
}
