//! External collaborators: object storage, the record tables, and session
//! verification.
//!
//! The workflows only ever see these traits. [`memory`] holds in-process
//! implementations used by tests and the CLI; [`supabase`] talks to a
//! Supabase project over HTTP.
//!
//! Access control lives with the implementation. The Supabase back end
//! relies on row-level security for user sessions and on the service-role
//! key for the payment functions; the workflows add explicit owner checks
//! on top (see [`crate::workflow`]).

pub mod memory;
pub mod supabase;

use crate::model::{
    Flipbook, FlipbookId, FlipbookUpdate, NewFlipbook, NewSubscription, Role, Subscription,
    UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Failure reported by a store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The back end answered with an error. `message` is its own text, which
    /// may be shown to the user.
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

// ── Asset storage ────────────────────────────────────────────────────────

/// Storage bucket by logical name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Pdfs,
    Thumbnails,
    Backgrounds,
    Logos,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Pdfs => "pdfs",
            Bucket::Thumbnails => "thumbnails",
            Bucket::Backgrounds => "backgrounds",
            Bucket::Logos => "logos",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{user}/{random}.{ext}`: the path of an uploaded PDF.
///
/// The extension is whatever follows the last `.` of the original name.
pub fn pdf_object_path(user: UserId, random: &str, file_name: &str) -> String {
    let ext = file_name.rsplit('.').next().unwrap_or(file_name);
    format!("{user}/{random}.{ext}")
}

/// `{user}/{random}_thumb.jpg`: the path of a generated thumbnail.
pub fn thumbnail_object_path(user: UserId, random: &str) -> String {
    format!("{user}/{random}_thumb.jpg")
}

/// `{user}/{millis}_{file_name}`: the path of a styling image.
pub fn styling_object_path(user: UserId, at: DateTime<Utc>, file_name: &str) -> String {
    format!("{user}/{}_{file_name}", at.timestamp_millis())
}

/// Object storage for PDFs, thumbnails and styling images.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Store `bytes` at `path`, replacing nothing: an existing object is an error.
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError>;

    /// Public URL for an object. Does not check that the object exists.
    fn public_url(&self, bucket: Bucket, path: &str) -> String;

    /// Remove objects. Missing paths are ignored.
    async fn delete(&self, bucket: Bucket, paths: &[String]) -> Result<(), StoreError>;
}

// ── Records ──────────────────────────────────────────────────────────────

/// The `flipbooks`, `user_roles` and `subscriptions` tables.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_flipbook(&self, new: NewFlipbook) -> Result<Flipbook, StoreError>;

    async fn get_flipbook(&self, id: FlipbookId) -> Result<Flipbook, StoreError>;

    /// A user's flipbooks, newest first.
    async fn list_flipbooks(&self, user: UserId) -> Result<Vec<Flipbook>, StoreError>;

    async fn count_flipbooks(&self, user: UserId) -> Result<usize, StoreError>;

    async fn update_flipbook(
        &self,
        id: FlipbookId,
        update: &FlipbookUpdate,
    ) -> Result<Flipbook, StoreError>;

    /// Write `view_count = current + 1` and return the new count.
    ///
    /// Last write wins: two concurrent views may both write the same value.
    async fn increment_view_count(&self, id: FlipbookId, current: u64) -> Result<u64, StoreError>;

    async fn delete_flipbook(&self, id: FlipbookId) -> Result<(), StoreError>;

    /// The user's plan tier. A user without a role row is `free`.
    async fn get_user_role(&self, user: UserId) -> Result<Role, StoreError>;

    async fn upsert_user_role(&self, user: UserId, role: Role) -> Result<(), StoreError>;

    async fn insert_subscription(&self, new: NewSubscription)
        -> Result<Subscription, StoreError>;

    /// Mark the user's subscription for `order_id` active. Fails with
    /// [`StoreError::NotFound`] when no such row belongs to the user.
    async fn activate_subscription(
        &self,
        user: UserId,
        order_id: &str,
        payment_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<Subscription, StoreError>;
}

// ── Sessions ─────────────────────────────────────────────────────────────

/// Resolves a bearer access token to the signed-in user.
#[async_trait]
pub trait AuthVerifier: Send + Sync {
    async fn verify(&self, access_token: &str) -> Result<UserId, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn user() -> UserId {
        UserId::from_uuid(Uuid::nil())
    }

    #[test]
    fn pdf_path_keeps_last_extension() {
        assert_eq!(
            pdf_object_path(user(), "abc", "deck.final.PDF"),
            "00000000-0000-0000-0000-000000000000/abc.PDF"
        );
    }

    #[test]
    fn pdf_path_without_dot_uses_whole_name() {
        assert!(pdf_object_path(user(), "abc", "deck").ends_with("/abc.deck"));
    }

    #[test]
    fn styling_path_is_timestamped() {
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        assert!(styling_object_path(user(), at, "logo.png").ends_with("/1700000000123_logo.png"));
    }

    #[test]
    fn bucket_names() {
        assert_eq!(Bucket::Pdfs.to_string(), "pdfs");
        assert_eq!(Bucket::Logos.as_str(), "logos");
    }
}
