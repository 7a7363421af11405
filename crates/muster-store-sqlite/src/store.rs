//! [`SqliteStore`], the SQLite implementation of [`MemberStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, ToSql, TransactionBehavior};
use uuid::Uuid;

use muster_core::{
  identity::{Identity, NewIdentity},
  role::{NewRole, Role},
  store::{IdentityFilter, Insertion, MemberStore, NewSession},
  validation::FieldError,
};

use crate::{
  Result,
  encode::{IDENTITY_SELECT, ROLE_COLUMNS, RawIdentity, RawRole, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A member store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Fetch at most one identity matching `condition`, which may reference
  /// `?1` bound to `param`.
  async fn fetch_identity<P>(&self, condition: &'static str, param: P) -> Result<Option<Identity>>
  where
    P: ToSql + Send + 'static,
  {
    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("{IDENTITY_SELECT} WHERE {condition}"),
              rusqlite::params![param],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn exists<P>(&self, sql: &'static str, param: P) -> Result<bool>
  where
    P: ToSql + Send + 'static,
  {
    let found: bool = self
      .conn
      .call(move |conn| Ok(conn.query_row(sql, rusqlite::params![param], |r| r.get(0))?))
      .await?;
    Ok(found)
  }
}

// ─── MemberStore impl ────────────────────────────────────────────────────────

impl MemberStore for SqliteStore {
  type Error = crate::Error;

  // ── Roles ─────────────────────────────────────────────────────────────────

  async fn upsert_role(&self, role: NewRole) -> Result<Role> {
    let raw: RawRole = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO roles (name, is_unique, is_staff, role_type, rank)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT(name) DO UPDATE SET
             is_unique = excluded.is_unique,
             is_staff  = excluded.is_staff,
             role_type = excluded.role_type,
             rank      = excluded.rank",
          rusqlite::params![
            role.name,
            role.is_unique,
            role.is_staff,
            role.role_type.as_str(),
            i64::from(role.rank),
          ],
        )?;
        Ok(conn.query_row(
          &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = ?1"),
          rusqlite::params![role.name],
          RawRole::from_row,
        )?)
      })
      .await?;

    raw.into_role()
  }

  async fn get_role(&self, role_id: i64) -> Result<Option<Role>> {
    let raw: Option<RawRole> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {ROLE_COLUMNS} FROM roles WHERE role_id = ?1"),
              rusqlite::params![role_id],
              RawRole::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawRole::into_role).transpose()
  }

  async fn list_roles(&self) -> Result<Vec<Role>> {
    let raws: Vec<RawRole> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ROLE_COLUMNS} FROM roles ORDER BY role_type, rank, name"
        ))?;
        let rows = stmt
          .query_map([], RawRole::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRole::into_role).collect()
  }

  async fn role_has_active_holder(&self, role_id: i64) -> Result<bool> {
    self
      .exists(
        "SELECT EXISTS(SELECT 1 FROM identities WHERE role_id = ?1 AND active = 1)",
        role_id,
      )
      .await
  }

  // ── Identities ────────────────────────────────────────────────────────────

  async fn create_identity(&self, input: NewIdentity) -> Result<Insertion> {
    let public_id = encode_uuid(Uuid::new_v4());
    let joined = encode_dt(Utc::now());

    let outcome: std::result::Result<RawIdentity, Vec<FieldError>> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut rejected = Vec::new();

        let email_taken: bool = tx.query_row(
          "SELECT EXISTS(SELECT 1 FROM identities WHERE email = ?1)",
          rusqlite::params![input.email],
          |r| r.get(0),
        )?;
        if email_taken {
          rejected.push(FieldError::EmailAlreadyUsed);
        }

        let username_taken: bool = tx.query_row(
          "SELECT EXISTS(SELECT 1 FROM identities WHERE username = ?1)",
          rusqlite::params![input.username],
          |r| r.get(0),
        )?;
        if username_taken {
          rejected.push(FieldError::UsernameAlreadyUsed);
        }

        if let Some(role_id) = input.role_id {
          let is_unique: Option<bool> = tx
            .query_row(
              "SELECT is_unique FROM roles WHERE role_id = ?1",
              rusqlite::params![role_id],
              |r| r.get(0),
            )
            .optional()?;
          let available = match is_unique {
            None => false,
            Some(false) => true,
            Some(true) => !tx.query_row(
              "SELECT EXISTS(SELECT 1 FROM identities WHERE role_id = ?1 AND active = 1)",
              rusqlite::params![role_id],
              |r| r.get::<_, bool>(0),
            )?,
          };
          if !available {
            rejected.push(FieldError::RoleUnavailable);
          }
        }

        if !rejected.is_empty() {
          // Dropping `tx` rolls back.
          return Ok(Err(rejected));
        }

        tx.execute(
          "INSERT INTO identities (
             public_id, username, email, password_hash, first_name, last_name,
             role_id, approved, is_staff, is_superuser, date_joined
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            public_id,
            input.username,
            input.email,
            input.password_hash,
            input.first_name,
            input.last_name,
            input.role_id,
            input.approved,
            input.is_staff,
            input.is_superuser,
            joined,
          ],
        )?;
        let identity_id = tx.last_insert_rowid();

        let raw = tx.query_row(
          &format!("{IDENTITY_SELECT} WHERE i.identity_id = ?1"),
          rusqlite::params![identity_id],
          RawIdentity::from_row,
        )?;
        tx.commit()?;
        Ok(Ok(raw))
      })
      .await?;

    match outcome {
      Ok(raw) => Ok(Insertion::Created(raw.into_identity()?)),
      Err(rejected) => Ok(Insertion::Rejected(rejected)),
    }
  }

  async fn get_identity(&self, identity_id: i64) -> Result<Option<Identity>> {
    self.fetch_identity("i.identity_id = ?1", identity_id).await
  }

  async fn find_by_username(&self, username: String) -> Result<Option<Identity>> {
    self.fetch_identity("i.username = ?1", username).await
  }

  async fn find_by_public_id(&self, public_id: Uuid) -> Result<Option<Identity>> {
    self.fetch_identity("i.public_id = ?1", encode_uuid(public_id)).await
  }

  async fn email_in_use(&self, email: String) -> Result<bool> {
    // `email` is declared COLLATE NOCASE.
    self
      .exists("SELECT EXISTS(SELECT 1 FROM identities WHERE email = ?1)", email)
      .await
  }

  async fn username_in_use(&self, username: String) -> Result<bool> {
    self
      .exists("SELECT EXISTS(SELECT 1 FROM identities WHERE username = ?1)", username)
      .await
  }

  async fn list_identities(&self, filter: IdentityFilter) -> Result<Vec<Identity>> {
    let raws: Vec<RawIdentity> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "{IDENTITY_SELECT}
           WHERE (?1 IS NULL OR i.approved = ?1)
             AND (?2 = 0 OR i.active = 1)
           ORDER BY i.date_joined, i.identity_id"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![filter.approved, filter.active_only],
            RawIdentity::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawIdentity::into_identity).collect()
  }

  async fn set_approved(&self, identity_id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE identities SET approved = 1 WHERE identity_id = ?1",
          rusqlite::params![identity_id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn delete_identity(&self, identity_id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM identities WHERE identity_id = ?1",
          rusqlite::params![identity_id],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn create_session(&self, session: NewSession) -> Result<()> {
    let created = encode_dt(Utc::now());
    let expires = encode_dt(session.expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, identity_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![session.token_hash, session.identity_id, created, expires],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn session_identity(
    &self,
    token_hash: String,
    now: DateTime<Utc>,
  ) -> Result<Option<Identity>> {
    let now = encode_dt(now);

    let raw: Option<RawIdentity> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE expires_at <= ?1",
          rusqlite::params![now],
        )?;
        Ok(
          conn
            .query_row(
              &format!(
                "{IDENTITY_SELECT}
                 JOIN sessions s ON s.identity_id = i.identity_id
                 WHERE s.token_hash = ?1 AND i.active = 1"
              ),
              rusqlite::params![token_hash],
              RawIdentity::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawIdentity::into_identity).transpose()
  }

  async fn delete_session(&self, token_hash: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token_hash = ?1",
          rusqlite::params![token_hash],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Email verification ────────────────────────────────────────────────────

  async fn store_verification(&self, identity_id: i64, token_hash: String) -> Result<()> {
    let created = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO email_verifications (token_hash, identity_id, created_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![token_hash, identity_id, created],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn consume_verification(&self, token_hash: String) -> Result<Option<i64>> {
    let identity_id = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let identity_id: Option<i64> = tx
          .query_row(
            "SELECT identity_id FROM email_verifications WHERE token_hash = ?1",
            rusqlite::params![token_hash],
            |r| r.get(0),
          )
          .optional()?;
        if let Some(id) = identity_id {
          tx.execute(
            "DELETE FROM email_verifications WHERE token_hash = ?1",
            rusqlite::params![token_hash],
          )?;
          tx.execute(
            "UPDATE identities SET email_verified = 1 WHERE identity_id = ?1",
            rusqlite::params![id],
          )?;
        }
        tx.commit()?;
        Ok(identity_id)
      })
      .await?;
    Ok(identity_id)
  }
}
