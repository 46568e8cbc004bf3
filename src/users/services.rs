use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use tracing::error;

use crate::users::{dto::UserForm, repo_types::User};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

impl UserForm {
    /// Trim and lowercase where it matters, then check every field.
    /// Returns the first problem as a human readable message.
    pub(crate) fn normalize(&mut self) -> Result<(), &'static str> {
        self.account = self.account.trim().to_string();
        self.email = self.email.trim().to_lowercase();

        if self.account.is_empty() {
            return Err("Account must not be empty");
        }
        if !is_valid_email(&self.email) {
            return Err("Invalid email");
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err("Password too short");
        }
        Ok(())
    }

    /// Turn the form into a storable user, replacing the plain password
    /// with its argon2 PHC string.
    pub(crate) fn into_user(self) -> anyhow::Result<User> {
        let salt = SaltString::generate(&mut OsRng);
        let hashed = Argon2::default()
            .hash_password(self.password.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, account = %self.account, "password hashing failed");
                anyhow::anyhow!("hash password: {e}")
            })?
            .to_string();
        Ok(User::new(self.account, hashed, self.email))
    }
}

impl User {
    /// Check `plain` against the stored hash. A stored value that is not a
    /// PHC string is an error, not a mismatch.
    pub(crate) fn password_matches(&self, plain: &str) -> anyhow::Result<bool> {
        let stored = PasswordHash::new(&self.password).map_err(|e| {
            error!(error = %e, user_id = ?self.id, "stored password is not a PHC string");
            anyhow::anyhow!("parse stored password: {e}")
        })?;
        Ok(Argon2::default()
            .verify_password(plain.as_bytes(), &stored)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(account: &str, password: &str, email: &str) -> UserForm {
        UserForm {
            account: account.into(),
            password: password.into(),
            email: email.into(),
        }
    }

    #[test]
    fn normalize_trims_account_and_lowercases_email() {
        let mut f = form("  gugu ", "password1", " GUGU@Example.COM ");
        f.normalize().expect("valid form");
        assert_eq!(f.account, "gugu");
        assert_eq!(f.email, "gugu@example.com");
        assert_eq!(f.password, "password1");
    }

    #[test]
    fn normalize_rejects_each_bad_field() {
        assert_eq!(
            form("   ", "password1", "a@b.c").normalize(),
            Err("Account must not be empty")
        );
        assert_eq!(
            form("gugu", "password1", "not-an-email").normalize(),
            Err("Invalid email")
        );
        assert_eq!(
            form("gugu", "short", "a@b.c").normalize(),
            Err("Password too short")
        );
    }

    #[test]
    fn into_user_hashes_password_and_keeps_fields() {
        let user = form("gugu", "Secur3P@ssw0rd!", "gugu@example.com")
            .into_user()
            .expect("hashing should succeed");
        assert_eq!(user.id, None);
        assert_eq!(user.account, "gugu");
        assert_eq!(user.email, "gugu@example.com");
        assert_ne!(user.password, "Secur3P@ssw0rd!");
        assert!(user.password_matches("Secur3P@ssw0rd!").expect("verify should succeed"));
        assert!(!user.password_matches("wrong-password").expect("verify should not error"));
    }

    #[test]
    fn password_matches_errors_on_unhashed_value() {
        let user = User::new("gugu", "not-a-valid-hash", "gugu@example.com");
        assert!(user.password_matches("anything").is_err());
    }
}
