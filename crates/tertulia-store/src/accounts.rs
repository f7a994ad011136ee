//! Local accounts and the persisted session.
//!
//! Passwords are never stored: each account keeps a random salt and the
//! Argon2id hash of the password under that salt.

use argon2::Argon2;
use rusqlite::{params, OptionalExtension};
use subtle::ConstantTimeEq;
use tertulia_shared::constants::{
    CODE_EMAIL_INVALID, CODE_INVALID_CREDENTIALS, CODE_USER_ALREADY_EXISTS, CODE_WEAK_PASSWORD,
};
use tertulia_shared::models::Account;
use tertulia_shared::UserId;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};

/// Length of the stored password hash in bytes.
const PASSWORD_HASH_LEN: usize = 32;

impl Database {
    // ------------------------------------------------------------------
    // Accounts
    // ------------------------------------------------------------------

    /// Create an account after validating email and password.
    pub fn create_account(
        &self,
        email: &str,
        password: &str,
        min_password_len: usize,
    ) -> Result<Account> {
        let email = normalize_email(email)?;

        if password.chars().count() < min_password_len {
            return Err(StoreError::Rejected {
                code: CODE_WEAK_PASSWORD,
                message: format!("Password should be at least {min_password_len} characters"),
            });
        }

        let id = UserId(Uuid::new_v4().to_string());
        let salt: [u8; 16] = rand::random();
        let hash = hash_password(&salt, password)?;

        let inserted = self.conn().execute(
            "INSERT INTO auth_users (id, email, password_hash, salt) VALUES (?1, ?2, ?3, ?4)",
            params![id.as_str(), email, hex::encode(hash), hex::encode(salt)],
        );

        match inserted {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::Rejected {
                    code: CODE_USER_ALREADY_EXISTS,
                    message: "User already registered".into(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %id, "account created");

        Ok(Account { id, email })
    }

    /// Look up an account by email and check its password.
    pub fn verify_credentials(&self, email: &str, password: &str) -> Result<Account> {
        let email = email.trim().to_lowercase();

        let row: Option<(String, String, String)> = self
            .conn()
            .query_row(
                "SELECT id, password_hash, salt FROM auth_users WHERE email = ?1",
                params![email],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let invalid = || StoreError::Rejected {
            code: CODE_INVALID_CREDENTIALS,
            message: "Invalid login credentials".into(),
        };

        let (id, stored_hash, salt_hex) = row.ok_or_else(invalid)?;
        let salt = hex::decode(&salt_hex).map_err(|_| invalid())?;
        let stored = hex::decode(&stored_hash).map_err(|_| invalid())?;

        let candidate = hash_password(&salt, password)?;
        if !bool::from(candidate.as_slice().ct_eq(stored.as_slice())) {
            return Err(invalid());
        }

        Ok(Account {
            id: UserId(id),
            email,
        })
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    pub fn set_session(&self, user_id: &UserId) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO auth_session (id, user_id) VALUES (1, ?1)",
            params![user_id.as_str()],
        )?;
        Ok(())
    }

    pub fn clear_session(&self) -> Result<()> {
        self.conn().execute("DELETE FROM auth_session", [])?;
        Ok(())
    }

    /// The account owning the persisted session, if any.
    pub fn session_account(&self) -> Result<Option<Account>> {
        let account = self
            .conn()
            .query_row(
                "SELECT u.id, u.email
                 FROM auth_session s
                 JOIN auth_users u ON u.id = s.user_id
                 WHERE s.id = 1",
                [],
                |row| {
                    Ok(Account {
                        id: UserId(row.get(0)?),
                        email: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(account)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(email)
    } else {
        Err(StoreError::Rejected {
            code: CODE_EMAIL_INVALID,
            message: format!("Unable to validate email address: {email}"),
        })
    }
}

/// Argon2id with the crate's default cost parameters.
fn hash_password(salt: &[u8], password: &str) -> Result<[u8; PASSWORD_HASH_LEN]> {
    let mut output = [0u8; PASSWORD_HASH_LEN];
    Argon2::default()
        .hash_password_into(password.as_bytes(), salt, &mut output)
        .map_err(|e| StoreError::PasswordHash(e.to_string()))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn code(err: StoreError) -> &'static str {
        match err {
            StoreError::Rejected { code, .. } => code,
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sign_up_then_verify() {
        let db = db();
        let account = db.create_account(" A@X.com ", "secret1", 6).unwrap();
        assert_eq!(account.email, "a@x.com");

        let again = db.verify_credentials("a@x.com", "secret1").unwrap();
        assert_eq!(again, account);

        let wrong = db.verify_credentials("a@x.com", "secret2").unwrap_err();
        assert_eq!(code(wrong), CODE_INVALID_CREDENTIALS);

        let unknown = db.verify_credentials("b@x.com", "secret1").unwrap_err();
        assert_eq!(code(unknown), CODE_INVALID_CREDENTIALS);
    }

    #[test]
    fn test_sign_up_rules() {
        let db = db();
        assert_eq!(
            code(db.create_account("a@x.com", "12345", 6).unwrap_err()),
            CODE_WEAK_PASSWORD
        );
        assert_eq!(
            code(db.create_account("not-an-email", "secret1", 6).unwrap_err()),
            CODE_EMAIL_INVALID
        );

        db.create_account("a@x.com", "secret1", 6).unwrap();
        assert_eq!(
            code(db.create_account("a@x.com", "secret9", 6).unwrap_err()),
            CODE_USER_ALREADY_EXISTS
        );
    }

    #[test]
    fn test_same_password_hashes_differently_per_account() {
        let db = db();
        db.create_account("a@x.com", "secret1", 6).unwrap();
        db.create_account("b@x.com", "secret1", 6).unwrap();

        let hashes: Vec<String> = db
            .conn()
            .prepare("SELECT password_hash FROM auth_users ORDER BY email")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap();

        assert_eq!(hashes[0].len(), PASSWORD_HASH_LEN * 2);
        assert_ne!(hashes[0], hashes[1]);
        assert!(!hashes[0].contains("secret1"));
    }

    #[test]
    fn test_session_round_trip() {
        let db = db();
        assert!(db.session_account().unwrap().is_none());

        let account = db.create_account("a@x.com", "secret1", 6).unwrap();
        db.set_session(&account.id).unwrap();
        assert_eq!(db.session_account().unwrap(), Some(account));

        db.clear_session().unwrap();
        assert!(db.session_account().unwrap().is_none());
    }
}
