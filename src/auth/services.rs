use lazy_static::lazy_static;
use regex::Regex;

use super::dto::{LoginRequest, RegisterRequest};
use crate::error::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims name and email in place and checks the registration rules.
pub(crate) fn validate_register(req: &mut RegisterRequest) -> Result<(), AppError> {
    req.name = req.name.trim().to_string();
    req.email = req.email.trim().to_string();

    if req.name.is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation("invalid email".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub(crate) fn validate_login(req: &mut LoginRequest) -> Result<(), AppError> {
    req.email = req.email.trim().to_string();

    if req.email.is_empty() || req.password.is_empty() {
        return Err(AppError::Validation("email and password are required".into()));
    }
    if !is_valid_email(&req.email) {
        return Err(AppError::Validation("invalid email".into()));
    }
    Ok(())
}
