//! [`SqliteStore`] — the SQLite implementation of [`TravelStore`].

use std::path::Path;

use chrono::{DateTime, NaiveDate, SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use tripbox_core::{
  document::{Document, Fingerprint, NewDocument},
  store::{DocumentQuery, TravelStore, TripFilter},
  trip::{NewTrip, Trip, TripDeleteMode, TripUpdate},
  user::{CreditState, User},
};

use crate::{
  encode::{
    DOCUMENT_COLUMNS, RawDocument, RawTrip, RawUser, TRIP_COLUMNS, USER_COLUMNS,
    decode_dt, encode_category, encode_date, encode_details, encode_dt,
    encode_naive_dt, encode_source, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

/// Current time at the precision timestamps are stored with, so values
/// returned from writes compare equal to the same rows read back.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tripbox store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All calls are
/// serialised onto one connection thread, and every multi-statement write runs
/// inside a transaction.
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

  /// Open an in-memory store — useful for testing.
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

  /// Fetch the single user whose `column` equals `key`.
  async fn query_user(&self, column: &'static str, key: String) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
        Ok(conn
          .query_row(&sql, rusqlite::params![key], RawUser::from_row)
          .optional()?)
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── TravelStore impl ────────────────────────────────────────────────────────

impl TravelStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(
    &self,
    forwarding_address: String,
    initial_credits: i64,
  ) -> Result<User> {
    let user = User {
      user_id:            Uuid::new_v4(),
      forwarding_address: forwarding_address.to_lowercase(),
      credits:            CreditState {
        credits:                 initial_credits.max(0),
        subscription_expires_at: None,
      },
      created_at:         now(),
    };

    let id_str      = encode_uuid(user.user_id);
    let address     = user.forwarding_address.clone();
    let credits     = user.credits.credits;
    let created_str = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, forwarding_address, credits, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, address, credits, created_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    self.query_user("user_id", encode_uuid(user_id)).await
  }

  async fn find_user_by_forwarding_address(&self, address: &str) -> Result<Option<User>> {
    self.query_user("forwarding_address", address.trim().to_lowercase()).await
  }

  // ── Credits ───────────────────────────────────────────────────────────────

  async fn credit_state(&self, user_id: Uuid) -> Result<Option<CreditState>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<(i64, Option<String>)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT credits, subscription_expires_at FROM users WHERE user_id = ?1",
            rusqlite::params![id_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(credits, expires)| {
        Ok(CreditState {
          credits,
          subscription_expires_at: expires.as_deref().map(decode_dt).transpose()?,
        })
      })
      .transpose()
  }

  async fn try_decrement_credits(&self, user_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(user_id);

    // Check and decrement in one statement so concurrent ingestions for the
    // same user can never drive the balance below zero.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET credits = credits - 1 WHERE user_id = ?1 AND credits > 0",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn add_credits(&self, user_id: Uuid, amount: i64) -> Result<i64> {
    let id_str = encode_uuid(user_id);

    let balance: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "UPDATE users SET credits = credits + ?2 WHERE user_id = ?1 RETURNING credits",
            rusqlite::params![id_str, amount],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    balance.ok_or(Error::UserNotFound(user_id))
  }

  async fn set_subscription_expiry(
    &self,
    user_id: Uuid,
    expires_at: Option<DateTime<Utc>>,
  ) -> Result<()> {
    let id_str      = encode_uuid(user_id);
    let expires_str = expires_at.map(encode_dt);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET subscription_expires_at = ?2 WHERE user_id = ?1",
          rusqlite::params![id_str, expires_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::UserNotFound(user_id));
    }
    Ok(())
  }

  // ── Trips ─────────────────────────────────────────────────────────────────

  async fn create_trip(&self, input: NewTrip) -> Result<Trip> {
    let now = now();
    let trip = Trip {
      trip_id:     Uuid::new_v4(),
      user_id:     input.user_id,
      name:        input.name,
      start_date:  input.start_date,
      end_date:    input.end_date,
      is_archived: false,
      created_at:  now,
      updated_at:  now,
    };

    let id_str    = encode_uuid(trip.trip_id);
    let user_str  = encode_uuid(trip.user_id);
    let name      = trip.name.clone();
    let start_str = encode_date(trip.start_date);
    let end_str   = encode_date(trip.end_date);
    let at_str    = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO trips (
             trip_id, user_id, name, start_date, end_date,
             is_archived, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)",
          rusqlite::params![id_str, user_str, name, start_str, end_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(trip)
  }

  async fn get_trip(&self, trip_id: Uuid) -> Result<Option<Trip>> {
    let id_str = encode_uuid(trip_id);

    let raw: Option<RawTrip> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {TRIP_COLUMNS} FROM trips WHERE trip_id = ?1");
        Ok(conn
          .query_row(&sql, rusqlite::params![id_str], RawTrip::from_row)
          .optional()?)
      })
      .await?;

    raw.map(RawTrip::into_trip).transpose()
  }

  async fn list_trips(&self, user_id: Uuid, include_archived: bool) -> Result<Vec<Trip>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawTrip> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {TRIP_COLUMNS} FROM trips
           WHERE user_id = ?1 AND (?2 OR is_archived = 0)
           ORDER BY start_date, trip_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![user_str, include_archived], RawTrip::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTrip::into_trip).collect()
  }

  async fn update_trip(&self, trip_id: Uuid, update: TripUpdate) -> Result<Option<Trip>> {
    let id_str    = encode_uuid(trip_id);
    let start_str = update.start_date.map(encode_date);
    let end_str   = update.end_date.map(encode_date);
    let at_str    = encode_dt(now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE trips SET
             name       = COALESCE(?2, name),
             start_date = COALESCE(?3, start_date),
             end_date   = COALESCE(?4, end_date),
             updated_at = ?5
           WHERE trip_id = ?1",
          rusqlite::params![id_str, update.name, start_str, end_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_trip(trip_id).await
  }

  async fn set_trip_archived(&self, trip_id: Uuid, archived: bool) -> Result<Option<Trip>> {
    let id_str = encode_uuid(trip_id);
    let at_str = encode_dt(now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE trips SET is_archived = ?2, updated_at = ?3 WHERE trip_id = ?1",
          rusqlite::params![id_str, archived, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_trip(trip_id).await
  }

  async fn delete_trip(&self, trip_id: Uuid, mode: TripDeleteMode) -> Result<bool> {
    let id_str = encode_uuid(trip_id);
    let at_str = encode_dt(now());

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        match mode {
          TripDeleteMode::DetachDocuments => {
            tx.execute(
              "UPDATE documents SET trip_id = NULL, updated_at = ?2 WHERE trip_id = ?1",
              rusqlite::params![id_str, at_str],
            )?;
          }
          TripDeleteMode::DeleteDocuments => {
            tx.execute(
              "DELETE FROM documents WHERE trip_id = ?1",
              rusqlite::params![id_str],
            )?;
          }
        }
        let removed = tx.execute(
          "DELETE FROM trips WHERE trip_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(removed == 1)
      })
      .await?;

    Ok(deleted)
  }

  async fn trips_containing(&self, user_id: Uuid, date: NaiveDate) -> Result<Vec<Trip>> {
    let user_str = encode_uuid(user_id);
    let date_str = encode_date(date);

    let raws: Vec<RawTrip> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {TRIP_COLUMNS} FROM trips
           WHERE user_id = ?1
             AND is_archived = 0
             AND start_date <= ?2
             AND end_date   >= ?2
           ORDER BY start_date, trip_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![user_str, date_str], RawTrip::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTrip::into_trip).collect()
  }

  // ── Documents ─────────────────────────────────────────────────────────────

  async fn insert_document(&self, input: NewDocument) -> Result<Document> {
    let now = now();
    let document = Document {
      document_id:   Uuid::new_v4(),
      user_id:       input.user_id,
      trip_id:       input.trip_id,
      category:      input.category,
      document_type: input.document_type,
      title:         input.title,
      subtitle:      input.subtitle,
      details:       input.details,
      document_date: input.document_date,
      file:          input.file,
      source:        input.source,
      email_subject: input.email_subject,
      fingerprint:   input.fingerprint,
      is_read:       false,
      created_at:    now,
      updated_at:    now,
    };

    let id_str        = encode_uuid(document.document_id);
    let user_str      = encode_uuid(document.user_id);
    let trip_str      = document.trip_id.map(encode_uuid);
    let category      = encode_category(document.category);
    let document_type = document.document_type.clone();
    let title         = document.title.clone();
    let subtitle      = document.subtitle.clone();
    let details_str   = encode_details(&document.details)?;
    let date_str      = document.document_date.map(encode_naive_dt);
    let file_url      = document.file.as_ref().map(|f| f.url.clone());
    let file_name     = document.file.as_ref().and_then(|f| f.name.clone());
    let file_mime     = document.file.as_ref().map(|f| f.mime_type.clone());
    let source        = encode_source(document.source);
    let email_subject = document.email_subject.clone();
    let fingerprint   = document.fingerprint.as_str().to_owned();
    let at_str        = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO documents (
             document_id, user_id, trip_id, category, document_type, title,
             subtitle, details_json, document_date, file_url, file_name,
             file_mime_type, source, email_subject, fingerprint, is_read,
             created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 0, ?16, ?16)",
          rusqlite::params![
            id_str,
            user_str,
            trip_str,
            category,
            document_type,
            title,
            subtitle,
            details_str,
            date_str,
            file_url,
            file_name,
            file_mime,
            source,
            email_subject,
            fingerprint,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(document)
  }

  async fn get_document(&self, document_id: Uuid) -> Result<Option<Document>> {
    let id_str = encode_uuid(document_id);

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE document_id = ?1");
        Ok(conn
          .query_row(&sql, rusqlite::params![id_str], RawDocument::from_row)
          .optional()?)
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn find_document_by_fingerprint(
    &self,
    user_id: Uuid,
    fingerprint: &Fingerprint,
  ) -> Result<Option<Document>> {
    let user_str        = encode_uuid(user_id);
    let fingerprint_str = fingerprint.as_str().to_owned();

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {DOCUMENT_COLUMNS} FROM documents
           WHERE user_id = ?1 AND fingerprint = ?2
           ORDER BY created_at
           LIMIT 1"
        );
        Ok(conn
          .query_row(&sql, rusqlite::params![user_str, fingerprint_str], RawDocument::from_row)
          .optional()?)
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn list_documents(&self, query: &DocumentQuery) -> Result<Vec<Document>> {
    let user_str = encode_uuid(query.user_id);
    let (scope, trip_str) = match query.trip {
      TripFilter::Any => ("any", None),
      TripFilter::Inbox => ("inbox", None),
      TripFilter::Trip(id) => ("trip", Some(encode_uuid(id))),
    };
    let category    = query.category.map(encode_category);
    let unread_only = query.unread_only;

    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {DOCUMENT_COLUMNS} FROM documents
           WHERE user_id = ?1
             AND (?2 = 'any'
                  OR (?2 = 'inbox' AND trip_id IS NULL)
                  OR (?2 = 'trip'  AND trip_id = ?3))
             AND (?4 IS NULL OR category = ?4)
             AND (?5 = 0 OR is_read = 0)
           ORDER BY created_at DESC, document_id"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![user_str, scope, trip_str, category, unread_only],
            RawDocument::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  async fn mark_document_read(&self, document_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(document_id);
    let at_str = encode_dt(now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE documents SET is_read = 1, updated_at = ?2 WHERE document_id = ?1",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn assign_document(
    &self,
    document_id: Uuid,
    trip_id: Option<Uuid>,
  ) -> Result<Option<Document>> {
    let id_str   = encode_uuid(document_id);
    let trip_str = trip_id.map(encode_uuid);
    let at_str   = encode_dt(now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE documents SET trip_id = ?2, updated_at = ?3 WHERE document_id = ?1",
          rusqlite::params![id_str, trip_str, at_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.get_document(document_id).await
  }

  async fn delete_document(&self, document_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(document_id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM documents WHERE document_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    Ok(removed == 1)
  }
}
