//! Records shared between the workflows and the stores.
//!
//! Field names follow the column names of the `flipbooks`, `user_roles` and
//! `subscriptions` tables so the same types serialise straight into
//! PostgREST request bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Defines a UUID-backed identifier with string (de)serialisation.
macro_rules! uuid_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Fresh random identifier.
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

uuid_id!(UserId, "Identifier of an authenticated user.");
uuid_id!(FlipbookId, "Identifier of a flipbook record.");
uuid_id!(SubscriptionId, "Identifier of a payment record.");

/// Background colour used when none is set.
pub const DEFAULT_BACKGROUND_COLOR: &str = "#FFFFFF";

// ── Flipbook ─────────────────────────────────────────────────────────────

/// Processing state of a flipbook.
///
/// Creation writes `Ready` directly; `Processing` is kept for an
/// asynchronous conversion step that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipbookStatus {
    Processing,
    #[default]
    Ready,
}

/// One user's converted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flipbook {
    pub id: FlipbookId,
    pub user_id: UserId,
    pub title: String,
    pub status: FlipbookStatus,
    pub pdf_storage_path: String,
    pub thumbnail_path: Option<String>,
    #[serde(default = "default_background_color")]
    pub background_color: String,
    pub background_image_path: Option<String>,
    pub logo_image_path: Option<String>,
    #[serde(default)]
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
}

fn default_background_color() -> String {
    DEFAULT_BACKGROUND_COLOR.to_string()
}

impl Flipbook {
    /// Only ready flipbooks may be shown or navigated.
    pub fn is_viewable(&self) -> bool {
        self.status == FlipbookStatus::Ready
    }

    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.user_id == user
    }
}

/// Insert payload for a new flipbook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFlipbook {
    pub user_id: UserId,
    pub title: String,
    pub pdf_storage_path: String,
    pub thumbnail_path: Option<String>,
    pub status: FlipbookStatus,
}

/// Partial update written by the edit workflow. `None` leaves a column as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlipbookUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_image_path: Option<String>,
}

impl FlipbookUpdate {
    /// Apply this update to a record in place.
    pub fn apply_to(&self, flipbook: &mut Flipbook) {
        if let Some(title) = &self.title {
            flipbook.title = title.clone();
        }
        if let Some(color) = &self.background_color {
            flipbook.background_color = color.clone();
        }
        if let Some(path) = &self.background_image_path {
            flipbook.background_image_path = Some(path.clone());
        }
        if let Some(path) = &self.logo_image_path {
            flipbook.logo_image_path = Some(path.clone());
        }
    }
}

// ── Roles ────────────────────────────────────────────────────────────────

/// Plan tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Free,
    Pro,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Free => "free",
            Role::Pro => "pro",
        })
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "free" => Ok(Role::Free),
            "pro" => Ok(Role::Pro),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// A stored plan tier. A user without a row is `free`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRole {
    pub user_id: UserId,
    pub role: Role,
    pub updated_at: DateTime<Utc>,
}

// ── Subscriptions ────────────────────────────────────────────────────────

/// Payment attempt state. Moves `Pending` → `Active` only after a verified
/// signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    #[default]
    Pending,
    Active,
}

/// One payment attempt against the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: Option<String>,
    pub plan_type: String,
    pub amount: u64,
    pub currency: String,
    pub status: SubscriptionStatus,
    pub started_at: Option<DateTime<Utc>>,
}

/// Insert payload written when an order is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSubscription {
    pub user_id: UserId,
    pub razorpay_order_id: String,
    pub plan_type: String,
    pub amount: u64,
    pub currency: String,
    pub status: SubscriptionStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_and_role_use_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&FlipbookStatus::Ready).unwrap(), "\"ready\"");
        assert_eq!(serde_json::to_string(&Role::Pro).unwrap(), "\"pro\"");
        assert_eq!(
            serde_json::to_string(&SubscriptionStatus::Active).unwrap(),
            "\"active\""
        );
        assert_eq!("free".parse::<Role>().unwrap(), Role::Free);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn flipbook_row_defaults_background_and_views() {
        let row = serde_json::json!({
            "id": "6f1c1a38-2f5e-4bb3-9d5c-0e3c0f2f7d11",
            "user_id": "0b6c9c3e-7a43-4c6e-9d8b-4ad4b8f1f0a2",
            "title": "Q1 Review",
            "status": "ready",
            "pdf_storage_path": "u/x.pdf",
            "thumbnail_path": null,
            "background_image_path": null,
            "logo_image_path": null,
            "created_at": "2024-05-01T10:00:00Z"
        });
        let fb: Flipbook = serde_json::from_value(row).unwrap();
        assert_eq!(fb.background_color, DEFAULT_BACKGROUND_COLOR);
        assert_eq!(fb.view_count, 0);
        assert!(fb.is_viewable());
    }

    #[test]
    fn update_skips_unset_columns() {
        let update = FlipbookUpdate {
            title: Some("New".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "New" }));
    }
}
