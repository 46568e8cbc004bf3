use serde::{Deserialize, Serialize};

use crate::users::repo_types::User;

/// Request body for creating or replacing a user.
#[derive(Debug, Deserialize)]
pub struct UserForm {
    pub account: String,
    pub password: String,
    pub email: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub account: String,
    pub password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PublicUser {
    pub id: i64,
    pub account: String,
    pub email: String,
}

impl TryFrom<User> for PublicUser {
    type Error = anyhow::Error;

    fn try_from(u: User) -> Result<Self, Self::Error> {
        let id = u
            .id
            .ok_or_else(|| anyhow::anyhow!("user {} has no id", u.account))?;
        Ok(Self {
            id,
            account: u.account,
            email: u.email,
        })
    }
}
