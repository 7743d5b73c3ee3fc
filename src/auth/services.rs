use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::auth::{
    password::{generate_token_key, hash_password, MIN_PASSWORD_LEN},
    repo::{TokenRepo, UserRepo},
    repo_types::{NewUser, User, UserChanges},
};
use crate::error::AppError;

pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 255;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Store-level factory: requires an email, normalizes it and hashes the password.
/// Password strength is checked at the API boundary, not here.
pub async fn create_user(
    users: &dyn UserRepo,
    email: Option<&str>,
    password: &str,
    name: &str,
) -> Result<User, AppError> {
    insert_user(users, email, password, name, false).await
}

pub async fn create_superuser(
    users: &dyn UserRepo,
    email: Option<&str>,
    password: &str,
) -> Result<User, AppError> {
    insert_user(users, email, password, "", true).await
}

async fn insert_user(
    users: &dyn UserRepo,
    email: Option<&str>,
    password: &str,
    name: &str,
    superuser: bool,
) -> Result<User, AppError> {
    let email = email
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::validation("email", "users must have an email address"))?;
    check_max_len("email", &email, MAX_EMAIL_LEN)?;
    let name = name.trim();
    check_max_len("name", name, MAX_NAME_LEN)?;

    let password_hash = hash_password(password)?;
    let user = users
        .insert(NewUser {
            email,
            name: name.to_string(),
            password_hash,
            is_staff: superuser,
            is_superuser: superuser,
        })
        .await?
        .ok_or_else(|| AppError::validation("email", "user with this email already exists"))?;

    info!(user_id = %user.id, email = %user.email, superuser, "user created");
    Ok(user)
}

fn check_max_len(field: &'static str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::validation(
            field,
            format!("ensure this field has no more than {max} characters"),
        ));
    }
    Ok(())
}

fn check_password_strength(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "password",
            format!("ensure this field has at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

fn check_email_format(email: &str) -> Result<(), AppError> {
    if !is_valid_email(&normalize_email(email)) {
        return Err(AppError::validation("email", "enter a valid email address"));
    }
    Ok(())
}

/// API-level registration: format and strength checks on top of [`create_user`].
pub async fn register(
    users: &dyn UserRepo,
    email: Option<&str>,
    password: Option<&str>,
    name: Option<&str>,
) -> Result<User, AppError> {
    let email = email
        .filter(|e| !e.trim().is_empty())
        .ok_or_else(|| AppError::validation("email", "this field may not be blank"))?;
    check_email_format(email)?;
    let password = password.unwrap_or_default();
    check_password_strength(password)?;

    create_user(users, Some(email), password, name.unwrap_or_default()).await
}

/// Exchanges credentials for the user's bearer token, creating it on first login.
pub async fn issue_token(
    users: &dyn UserRepo,
    tokens: &dyn TokenRepo,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<String, AppError> {
    let email = email
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::validation("email", "this field may not be blank"))?;
    let password = password
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::validation("password", "this field may not be blank"))?;

    let Some(user) = users.find_by_email(&email).await? else {
        warn!(email = %email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !user.check_password(password) {
        warn!(email = %email, user_id = %user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }
    if !user.is_active {
        warn!(user_id = %user.id, "login by inactive user");
        return Err(AppError::InvalidCredentials);
    }

    let token = tokens.get_or_create(user.id, &generate_token_key()).await?;
    info!(user_id = %token.user_id, "token issued");
    Ok(token.key)
}

/// Resolves a bearer token to an active user.
pub async fn authenticate(tokens: &dyn TokenRepo, key: &str) -> Result<User, AppError> {
    let user = tokens
        .find_user(key)
        .await?
        .ok_or(AppError::InvalidToken)?;
    if !user.is_active {
        debug!(user_id = %user.id, "token of inactive user");
        return Err(AppError::InvalidToken);
    }
    Ok(user)
}

pub async fn update_profile(
    users: &dyn UserRepo,
    user: &User,
    email: Option<&str>,
    name: Option<&str>,
    password: Option<&str>,
) -> Result<User, AppError> {
    let mut changes = UserChanges::default();
    if let Some(email) = email {
        check_email_format(email)?;
        let email = normalize_email(email);
        check_max_len("email", &email, MAX_EMAIL_LEN)?;
        changes.email = Some(email);
    }
    if let Some(name) = name {
        let name = name.trim();
        check_max_len("name", name, MAX_NAME_LEN)?;
        changes.name = Some(name.to_string());
    }
    if let Some(password) = password {
        check_password_strength(password)?;
        changes.password_hash = Some(hash_password(password)?);
    }

    let updated = users
        .update(user.id, changes)
        .await?
        .ok_or_else(|| AppError::validation("email", "user with this email already exists"))?;
    info!(user_id = %updated.id, "profile updated");
    Ok(updated)
}
