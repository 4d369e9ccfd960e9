use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date};

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        repo_types::NewUser,
    },
    error::AppError,
};

pub const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn parse_dob(raw: &str) -> Option<Date> {
    Date::parse(raw, format_description!("[year]-[month]-[day]")).ok()
}

/// Registration input after validation, password still in plain text.
#[derive(Debug)]
pub struct ValidRegistration {
    pub full_name: String,
    pub dob: Date,
    pub email: String,
    pub username: String,
    pub password: String,
}

impl ValidRegistration {
    pub fn into_new_user(self, password_hash: String) -> NewUser {
        NewUser {
            full_name: self.full_name,
            dob: self.dob,
            email: self.email,
            username: self.username,
            password_hash,
        }
    }
}

pub fn validate_registration(req: RegisterRequest) -> Result<ValidRegistration, AppError> {
    let full_name = req.full_name.trim().to_string();
    let dob = req.dob.trim().to_string();
    let email = req.email.trim().to_string();
    let username = req.username.trim().to_string();

    if full_name.is_empty()
        || dob.is_empty()
        || email.is_empty()
        || username.is_empty()
        || req.password.is_empty()
    {
        return Err(AppError::Validation("All fields are required.".into()));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long."
        )));
    }
    if !is_valid_email(&email) {
        return Err(AppError::Validation("Invalid email address.".into()));
    }
    let dob = parse_dob(&dob)
        .ok_or_else(|| AppError::Validation("Date of birth must be in YYYY-MM-DD format.".into()))?;

    Ok(ValidRegistration {
        full_name,
        dob,
        email,
        username,
        password: req.password,
    })
}

pub fn validate_login(req: &LoginRequest) -> Result<(), AppError> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::Validation(
            "Username and password are required.".into(),
        ));
    }
    Ok(())
}
