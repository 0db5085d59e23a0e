use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::password::{check_length_policy, hash_password, verify_against_dummy, verify_password};
use super::repo::UserStore;
use super::repo_types::User;
use crate::error::{AppError, StoreError};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Creates a user and returns its id. The plaintext only ever reaches the hasher.
pub async fn register(users: &dyn UserStore, email: &str, password: &str) -> Result<Uuid, AppError> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("Invalid email".into()));
    }
    check_length_policy(password).map_err(AppError::Validation)?;

    let hash = hash_password(password)?;
    match users.create(&email, &hash).await {
        Ok(user) => {
            info!(user_id = %user.id, email = %user.email, "user registered");
            Ok(user.id)
        }
        Err(StoreError::Duplicate) => {
            warn!(email = %email, "email already registered");
            Err(AppError::Duplicate("Email already registered".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Unknown email and wrong password both come back as `AuthFailure`.
pub async fn verify_credentials(
    users: &dyn UserStore,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let email = normalize_email(email);
    let Some(user) = users.find_by_email(&email).await? else {
        verify_against_dummy(password);
        debug!("login unknown email");
        return Err(AppError::AuthFailure);
    };

    if !verify_password(password, &user.password_hash)? {
        debug!(user_id = %user.id, "login invalid password");
        return Err(AppError::AuthFailure);
    }
    Ok(user)
}

pub async fn rotate_password(
    users: &dyn UserStore,
    user_id: Uuid,
    current: &str,
    new: &str,
) -> Result<(), AppError> {
    check_length_policy(new).map_err(AppError::Validation)?;
    let user = users.find_by_id(user_id).await?.ok_or(AppError::NotFound)?;
    if !verify_password(current, &user.password_hash)? {
        return Err(AppError::AuthFailure);
    }
    let hash = hash_password(new)?;
    if !users.update_password(user_id, &hash).await? {
        return Err(AppError::NotFound);
    }
    info!(user_id = %user_id, "password rotated");
    Ok(())
}
