use sqlx::FromRow;

/// User record as handled by callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Option<i64>,  // None until persisted
    pub account: String,
    pub password: String, // stored exactly as supplied
    pub email: String,
}

impl User {
    /// Build a not-yet-persisted user.
    pub fn new(
        account: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            account: account.into(),
            password: password.into(),
            email: email.into(),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

/// Row of the `users` table.
#[derive(Debug, FromRow)]
pub struct UserRow {
    pub id: i64,
    pub account: String,
    pub password: String,
    pub email: String,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: Some(r.id),
            account: r.account,
            password: r.password,
            email: r.email,
        }
    }
}

/// The one failure callers of the repository can observe.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("storage operation failed")]
    Storage(#[from] sqlx::Error),
}
