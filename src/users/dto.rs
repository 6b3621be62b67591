use serde::{Deserialize, Deserializer, Serialize};

use crate::users::repo_types::User;

/// Request body for `POST /users/`. A password cannot be supplied here.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    pub fullname: Option<String>,
}

/// Request body for `PATCH /users/{id}`.
///
/// Each field is tri-state: absent (leave alone), `null`, or a value. Only
/// `fullname` accepts `null`.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "present")]
    pub username: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub fullname: Option<Option<String>>,
}

/// Marks a field as present even when its value is `null`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct Cleared {
    pub cleared: bool,
}
