//! Email/password accounts and bearer sessions for [`SqliteStore`].
//!
//! Passwords are stored as argon2 PHC strings. Session tokens are random and
//! handed to the caller once; only their SHA-256 digest is persisted.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand_core::{OsRng, RngCore};
use rusqlite::OptionalExtension as _;
use sha2::{Digest, Sha256};
use spoke_core::identity::{Identity, IdentityProvider, Session};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Error, Result, SqliteStore, encode::{RawAccount, encode_dt}};

/// Shortest password accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

const TOKEN_BYTES: usize = 32;

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn normalize_email(email: &str) -> Result<String> {
  let email = email.trim().to_lowercase();
  let valid = match email.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
    }
    None => false,
  };
  if valid { Ok(email) } else { Err(Error::InvalidEmail) }
}

fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

fn verify_password(password: &str, phc: &str) -> Result<()> {
  let parsed = PasswordHash::new(phc).map_err(|e| Error::PasswordHash(e.to_string()))?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| Error::InvalidCredentials)
}

fn new_token() -> String {
  let mut bytes = [0u8; TOKEN_BYTES];
  OsRng.fill_bytes(&mut bytes);
  URL_SAFE_NO_PAD.encode(bytes)
}

fn token_hash(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

fn display_name(name: &str) -> Option<String> {
  let name = name.trim();
  (!name.is_empty()).then(|| name.to_owned())
}

impl SqliteStore {
  /// Persist a fresh session for `identity` and return its token.
  async fn open_session(&self, identity: Identity) -> Result<Session> {
    let token = new_token();
    let hash  = token_hash(&token);
    let uid   = identity.uid.clone();
    let now   = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, uid, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![hash, uid, now],
        )?;
        Ok(())
      })
      .await?;

    Ok(Session { token, identity })
  }
}

// ─── IdentityProvider impl ───────────────────────────────────────────────────

impl IdentityProvider for SqliteStore {
  type Error = Error;

  async fn sign_up(&self, email: &str, password: &str, display: &str) -> Result<Session> {
    let email = normalize_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
      return Err(Error::WeakPassword(MIN_PASSWORD_LEN));
    }

    let identity = Identity {
      uid:          Uuid::new_v4().simple().to_string(),
      display_name: display_name(display),
    };
    let phc = hash_password(password)?;

    let uid_str   = identity.uid.clone();
    let name_str  = identity.display_name.clone();
    let email_str = email.clone();
    let now       = encode_dt(Utc::now());

    let created = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken: bool = tx.query_row(
          "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = ?1)",
          rusqlite::params![email_str],
          |row| row.get(0),
        )?;
        if taken {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO accounts (uid, email, display_name, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![uid_str, email_str, name_str, phc, now],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !created {
      return Err(Error::EmailInUse);
    }

    info!(uid = %identity.uid, "account created");
    self.open_session(identity).await
  }

  async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
    // A malformed address can never match an account.
    let email = normalize_email(email).map_err(|_| Error::InvalidCredentials)?;

    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT uid, display_name, password_hash FROM accounts WHERE email = ?1",
              rusqlite::params![email],
              |row| {
                Ok(RawAccount {
                  uid:           row.get(0)?,
                  display_name:  row.get(1)?,
                  password_hash: row.get(2)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    let raw = raw.ok_or(Error::InvalidCredentials)?;
    verify_password(password, &raw.password_hash)?;

    debug!(uid = %raw.uid, "signed in");
    self
      .open_session(Identity { uid: raw.uid, display_name: raw.display_name })
      .await
  }

  async fn sign_out(&self, token: &str) -> Result<()> {
    let hash = token_hash(token);
    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM sessions WHERE token_hash = ?1", rusqlite::params![hash])?)
      })
      .await?;
    debug!(removed, "signed out");
    Ok(())
  }

  async fn resolve(&self, token: &str) -> Result<Option<Identity>> {
    let hash = token_hash(token);
    let identity = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT a.uid, a.display_name
               FROM sessions s JOIN accounts a ON a.uid = s.uid
               WHERE s.token_hash = ?1",
              rusqlite::params![hash],
              |row| Ok(Identity { uid: row.get(0)?, display_name: row.get(1)? }),
            )
            .optional()?,
        )
      })
      .await?;
    Ok(identity)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn emails_are_normalised_and_checked() {
    assert_eq!(normalize_email("  Rider@Example.COM ").unwrap(), "rider@example.com");
    for bad in ["", "rider", "@example.com", "rider@", "rider@example", "a b@example.com"] {
      assert!(matches!(normalize_email(bad), Err(Error::InvalidEmail)), "{bad:?}");
    }
  }

  #[test]
  fn tokens_are_unique_and_hashed() {
    let a = new_token();
    let b = new_token();
    assert_ne!(a, b);
    assert_eq!(token_hash(&a).len(), 64);
    assert_ne!(token_hash(&a), a);
  }

  #[test]
  fn password_round_trip() {
    let phc = hash_password("chain-lube").unwrap();
    verify_password("chain-lube", &phc).unwrap();
    assert!(matches!(verify_password("wrong", &phc), Err(Error::InvalidCredentials)));
  }
}
