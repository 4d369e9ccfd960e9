use serde::{Deserialize, Serialize};

/// Request body for `POST /api/check-user`.
#[derive(Debug, Deserialize)]
pub struct CheckUserRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct CheckUserResponse {
    pub exists: bool,
}

/// Request body for user registration. Missing fields default to empty and are
/// rejected by validation with a 400.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub full_name: String,
    pub dob: String,
    pub email: String,
    pub username: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Response returned after login or register.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: &'static str,
    pub token: String,
}
