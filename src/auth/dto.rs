use serde::Deserialize;

/// Request body for `POST /user/set_password`.
#[derive(Debug, Deserialize)]
pub struct SetPasswordRequest {
    pub id: Option<i64>,
    pub password: Option<String>,
}

/// Request body for `POST /user/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub id: Option<i64>,
    pub password: Option<String>,
}
