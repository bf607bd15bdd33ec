//! Supabase back end: Storage, PostgREST and GoTrue over HTTP.
//!
//! One [`SupabaseClient`] implements all three store traits. It sends the
//! project API key as `apikey` and, as the bearer, either a signed-in user's
//! access token (row-level security applies) or the service-role key (the
//! payment functions).

use super::{AssetStore, AuthVerifier, Bucket, RecordStore, StoreError};
use crate::model::{
    Flipbook, FlipbookId, FlipbookUpdate, NewFlipbook, NewSubscription, Role, Subscription,
    SubscriptionStatus, UserId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// HTTP client for one Supabase project.
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Error body shape shared by PostgREST, Storage and GoTrue closely enough
/// to pull a message out.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: UserId,
}

impl SupabaseClient {
    /// Create a client authenticating with `api_key` alone.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StoreError::Upstream {
                status: 0,
                message: format!("Failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
        })
    }

    /// Act as a signed-in user.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    fn authed(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
    }

    fn rest(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn storage(&self, suffix: &str) -> String {
        format!("{}/storage/v1/object/{}", self.base_url, suffix)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, StoreError> {
        let response = self
            .authed(builder)
            .send()
            .await
            .map_err(|e| StoreError::Upstream {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                message: e.to_string(),
            })?;
        check_status(response).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await.map_err(|e| StoreError::Upstream {
            status: 0,
            message: e.to_string(),
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Run a PostgREST request returning rows and take the first one.
    async fn single_row<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        entity: &'static str,
        id: String,
    ) -> Result<T, StoreError> {
        let rows: Vec<T> = self.send_json(builder).await?;
        rows.into_iter()
            .next()
            .ok_or(StoreError::NotFound { entity, id })
    }
}

/// Turn a non-2xx response into [`StoreError::Upstream`] carrying the
/// back end's own message when there is one.
async fn check_status(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body: Option<ErrorBody> = response.json().await.ok();
    let message = body
        .and_then(|b| b.message.or(b.msg).or(b.error))
        .unwrap_or_else(|| format!("HTTP {status}"));
    debug!(status = status.as_u16(), %message, "Supabase request failed");
    Err(StoreError::Upstream {
        status: status.as_u16(),
        message,
    })
}

// ── Storage ──────────────────────────────────────────────────────────────

#[async_trait]
impl AssetStore for SupabaseClient {
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let url = self.storage(&format!("{bucket}/{path}"));
        self.send(
            self.client
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .header("x-upsert", "false")
                .body(bytes),
        )
        .await?;
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        self.storage(&format!("public/{bucket}/{path}"))
    }

    async fn delete(&self, bucket: Bucket, paths: &[String]) -> Result<(), StoreError> {
        if paths.is_empty() {
            return Ok(());
        }
        let url = self.storage(bucket.as_str());
        self.send(self.client.delete(url).json(&json!({ "prefixes": paths })))
            .await?;
        Ok(())
    }
}

// ── PostgREST ────────────────────────────────────────────────────────────

#[async_trait]
impl RecordStore for SupabaseClient {
    async fn insert_flipbook(&self, new: NewFlipbook) -> Result<Flipbook, StoreError> {
        let id = new.pdf_storage_path.clone();
        self.single_row(
            self.client
                .post(self.rest("flipbooks"))
                .header("Prefer", "return=representation")
                .json(&new),
            "flipbook",
            id,
        )
        .await
    }

    async fn get_flipbook(&self, id: FlipbookId) -> Result<Flipbook, StoreError> {
        self.single_row(
            self.client
                .get(self.rest("flipbooks"))
                .query(&[("id", format!("eq.{id}")), ("select", "*".into())]),
            "flipbook",
            id.to_string(),
        )
        .await
    }

    async fn list_flipbooks(&self, user: UserId) -> Result<Vec<Flipbook>, StoreError> {
        self.send_json(self.client.get(self.rest("flipbooks")).query(&[
            ("user_id", format!("eq.{user}")),
            ("select", "*".into()),
            ("order", "created_at.desc".into()),
        ]))
        .await
    }

    async fn count_flipbooks(&self, user: UserId) -> Result<usize, StoreError> {
        let rows: Vec<serde_json::Value> = self
            .send_json(
                self.client
                    .get(self.rest("flipbooks"))
                    .query(&[("user_id", format!("eq.{user}")), ("select", "id".into())]),
            )
            .await?;
        Ok(rows.len())
    }

    async fn update_flipbook(
        &self,
        id: FlipbookId,
        update: &FlipbookUpdate,
    ) -> Result<Flipbook, StoreError> {
        self.single_row(
            self.client
                .patch(self.rest("flipbooks"))
                .query(&[("id", format!("eq.{id}"))])
                .header("Prefer", "return=representation")
                .json(update),
            "flipbook",
            id.to_string(),
        )
        .await
    }

    async fn increment_view_count(&self, id: FlipbookId, current: u64) -> Result<u64, StoreError> {
        let next = current + 1;
        self.send(
            self.client
                .patch(self.rest("flipbooks"))
                .query(&[("id", format!("eq.{id}"))])
                .json(&json!({ "view_count": next })),
        )
        .await?;
        Ok(next)
    }

    async fn delete_flipbook(&self, id: FlipbookId) -> Result<(), StoreError> {
        self.send(
            self.client
                .delete(self.rest("flipbooks"))
                .query(&[("id", format!("eq.{id}"))]),
        )
        .await?;
        Ok(())
    }

    async fn get_user_role(&self, user: UserId) -> Result<Role, StoreError> {
        // The accessor returns null for users without a row.
        let role: Option<Role> = self
            .send_json(
                self.client
                    .post(self.rest("rpc/get_user_role"))
                    .json(&json!({ "_user_id": user })),
            )
            .await?;
        Ok(role.unwrap_or_default())
    }

    async fn upsert_user_role(&self, user: UserId, role: Role) -> Result<(), StoreError> {
        self.send(
            self.client
                .post(self.rest("user_roles"))
                .query(&[("on_conflict", "user_id")])
                .header("Prefer", "resolution=merge-duplicates")
                .json(&json!({
                    "user_id": user,
                    "role": role,
                    "updated_at": Utc::now(),
                })),
        )
        .await?;
        Ok(())
    }

    async fn insert_subscription(
        &self,
        new: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        let id = new.razorpay_order_id.clone();
        self.single_row(
            self.client
                .post(self.rest("subscriptions"))
                .header("Prefer", "return=representation")
                .json(&new),
            "subscription",
            id,
        )
        .await
    }

    async fn activate_subscription(
        &self,
        user: UserId,
        order_id: &str,
        payment_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<Subscription, StoreError> {
        self.single_row(
            self.client
                .patch(self.rest("subscriptions"))
                .query(&[
                    ("razorpay_order_id", format!("eq.{order_id}")),
                    ("user_id", format!("eq.{user}")),
                ])
                .header("Prefer", "return=representation")
                .json(&json!({
                    "razorpay_payment_id": payment_id,
                    "status": SubscriptionStatus::Active,
                    "started_at": started_at,
                })),
            "subscription",
            order_id.to_string(),
        )
        .await
    }
}

// ── GoTrue ───────────────────────────────────────────────────────────────

#[async_trait]
impl AuthVerifier for SupabaseClient {
    async fn verify(&self, access_token: &str) -> Result<UserId, StoreError> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| StoreError::Upstream {
                status: 0,
                message: e.to_string(),
            })?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(StoreError::Upstream {
                status: status.as_u16(),
                message: "Unauthorized".into(),
            });
        }
        let response = check_status(response).await?;
        let user: AuthUser = response
            .json()
            .await
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(user.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_shape() {
        let c = SupabaseClient::new("https://proj.supabase.co/", "anon").unwrap();
        assert_eq!(
            c.public_url(Bucket::Thumbnails, "u/a_thumb.jpg"),
            "https://proj.supabase.co/storage/v1/object/public/thumbnails/u/a_thumb.jpg"
        );
    }

    #[test]
    fn debug_redacts_keys() {
        let c = SupabaseClient::new("https://proj.supabase.co", "service-secret")
            .unwrap()
            .with_access_token("user-jwt");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("service-secret"));
        assert!(!dbg.contains("user-jwt"));
    }
}
