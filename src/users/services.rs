use crate::{
    error::ApiError,
    users::{
        dto::{CreateUserRequest, UpdateUserRequest},
        repo_types::{NewUser, UserChanges},
    },
};

/// Explicit ids must be positive and leave room for one more generated id.
fn id(raw: i64) -> Result<i64, ApiError> {
    if raw <= 0 || raw == i64::MAX {
        return Err(ApiError::Validation(format!(
            "id must be between 1 and {}",
            i64::MAX - 1
        )));
    }
    Ok(raw)
}

pub fn new_user(req: CreateUserRequest) -> Result<NewUser, ApiError> {
    Ok(NewUser {
        id: req.id.map(id).transpose()?,
        username: req.username,
        email: req.email,
        fullname: req.fullname,
    })
}

/// Turns a PATCH body into store changes. Ids are immutable, so a body id
/// must match the path.
pub fn user_changes(path_id: i64, req: UpdateUserRequest) -> Result<UserChanges, ApiError> {
    if let Some(body_id) = req.id {
        if body_id != path_id {
            return Err(ApiError::Validation("id cannot be changed".into()));
        }
    }
    let username = match req.username {
        Some(Some(v)) => Some(v),
        Some(None) => return Err(ApiError::Validation("username must not be null".into())),
        None => None,
    };
    let email = match req.email {
        Some(Some(v)) => Some(v),
        Some(None) => return Err(ApiError::Validation("email must not be null".into())),
        None => None,
    };
    Ok(UserChanges {
        username,
        email,
        fullname: req.fullname,
    })
}
