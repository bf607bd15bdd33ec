//! In-process stores. State is lost when the value is dropped.

use super::{AssetStore, AuthVerifier, Bucket, RecordStore, StoreError};
use crate::model::{
    Flipbook, FlipbookId, FlipbookUpdate, NewFlipbook, NewSubscription, Role, Subscription,
    SubscriptionId, SubscriptionStatus, UserId, UserRole,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

// ── Assets ───────────────────────────────────────────────────────────────

/// One stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Object storage kept in a map keyed by bucket and path.
#[derive(Debug)]
pub struct MemoryAssetStore {
    base_url: String,
    objects: RwLock<HashMap<(Bucket, String), StoredObject>>,
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new("memory://storage")
    }
}

impl MemoryAssetStore {
    /// `base_url` prefixes every public URL: `{base_url}/{bucket}/{path}`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get(&self, bucket: Bucket, path: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket, path.to_string()))
            .cloned()
    }

    /// Paths stored in `bucket`, sorted.
    pub async fn paths(&self, bucket: Bucket) -> Vec<String> {
        let mut paths: Vec<_> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| *b == bucket)
            .map(|(_, p)| p.clone())
            .collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        let key = (bucket, path.to_string());
        if objects.contains_key(&key) {
            return Err(StoreError::Upstream {
                status: 409,
                message: "The resource already exists".into(),
            });
        }
        objects.insert(
            key,
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, bucket, path)
    }

    async fn delete(&self, bucket: Bucket, paths: &[String]) -> Result<(), StoreError> {
        let mut objects = self.objects.write().await;
        for path in paths {
            objects.remove(&(bucket, path.clone()));
        }
        Ok(())
    }
}

// ── Records ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Tables {
    flipbooks: HashMap<FlipbookId, Flipbook>,
    user_roles: HashMap<UserId, UserRole>,
    subscriptions: Vec<Subscription>,
}

/// The three record tables in memory.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    tables: RwLock<Tables>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a complete record as is. Used to seed fixtures.
    pub async fn put_flipbook(&self, flipbook: Flipbook) {
        self.tables
            .write()
            .await
            .flipbooks
            .insert(flipbook.id, flipbook);
    }

    pub async fn subscriptions(&self, user: UserId) -> Vec<Subscription> {
        self.tables
            .read()
            .await
            .subscriptions
            .iter()
            .filter(|s| s.user_id == user)
            .cloned()
            .collect()
    }
}

fn flipbook_not_found(id: FlipbookId) -> StoreError {
    StoreError::NotFound {
        entity: "flipbook",
        id: id.to_string(),
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert_flipbook(&self, new: NewFlipbook) -> Result<Flipbook, StoreError> {
        let flipbook = Flipbook {
            id: FlipbookId::generate(),
            user_id: new.user_id,
            title: new.title,
            status: new.status,
            pdf_storage_path: new.pdf_storage_path,
            thumbnail_path: new.thumbnail_path,
            background_color: crate::model::DEFAULT_BACKGROUND_COLOR.to_string(),
            background_image_path: None,
            logo_image_path: None,
            view_count: 0,
            created_at: Utc::now(),
        };
        self.tables
            .write()
            .await
            .flipbooks
            .insert(flipbook.id, flipbook.clone());
        Ok(flipbook)
    }

    async fn get_flipbook(&self, id: FlipbookId) -> Result<Flipbook, StoreError> {
        self.tables
            .read()
            .await
            .flipbooks
            .get(&id)
            .cloned()
            .ok_or_else(|| flipbook_not_found(id))
    }

    async fn list_flipbooks(&self, user: UserId) -> Result<Vec<Flipbook>, StoreError> {
        let mut list: Vec<_> = self
            .tables
            .read()
            .await
            .flipbooks
            .values()
            .filter(|f| f.user_id == user)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn count_flipbooks(&self, user: UserId) -> Result<usize, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .flipbooks
            .values()
            .filter(|f| f.user_id == user)
            .count())
    }

    async fn update_flipbook(
        &self,
        id: FlipbookId,
        update: &FlipbookUpdate,
    ) -> Result<Flipbook, StoreError> {
        let mut tables = self.tables.write().await;
        let flipbook = tables
            .flipbooks
            .get_mut(&id)
            .ok_or_else(|| flipbook_not_found(id))?;
        update.apply_to(flipbook);
        Ok(flipbook.clone())
    }

    async fn increment_view_count(&self, id: FlipbookId, current: u64) -> Result<u64, StoreError> {
        let mut tables = self.tables.write().await;
        let flipbook = tables
            .flipbooks
            .get_mut(&id)
            .ok_or_else(|| flipbook_not_found(id))?;
        flipbook.view_count = current + 1;
        Ok(flipbook.view_count)
    }

    async fn delete_flipbook(&self, id: FlipbookId) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .flipbooks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| flipbook_not_found(id))
    }

    async fn get_user_role(&self, user: UserId) -> Result<Role, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .user_roles
            .get(&user)
            .map(|r| r.role)
            .unwrap_or_default())
    }

    async fn upsert_user_role(&self, user: UserId, role: Role) -> Result<(), StoreError> {
        self.tables.write().await.user_roles.insert(
            user,
            UserRole {
                user_id: user,
                role,
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn insert_subscription(
        &self,
        new: NewSubscription,
    ) -> Result<Subscription, StoreError> {
        let subscription = Subscription {
            id: SubscriptionId::generate(),
            user_id: new.user_id,
            razorpay_order_id: new.razorpay_order_id,
            razorpay_payment_id: None,
            plan_type: new.plan_type,
            amount: new.amount,
            currency: new.currency,
            status: new.status,
            started_at: None,
        };
        self.tables
            .write()
            .await
            .subscriptions
            .push(subscription.clone());
        Ok(subscription)
    }

    async fn activate_subscription(
        &self,
        user: UserId,
        order_id: &str,
        payment_id: &str,
        started_at: DateTime<Utc>,
    ) -> Result<Subscription, StoreError> {
        let mut tables = self.tables.write().await;
        let subscription = tables
            .subscriptions
            .iter_mut()
            .find(|s| s.user_id == user && s.razorpay_order_id == order_id)
            .ok_or_else(|| StoreError::NotFound {
                entity: "subscription",
                id: order_id.to_string(),
            })?;
        subscription.razorpay_payment_id = Some(payment_id.to_string());
        subscription.status = SubscriptionStatus::Active;
        subscription.started_at = Some(started_at);
        Ok(subscription.clone())
    }
}

// ── Sessions ─────────────────────────────────────────────────────────────

/// Accepts a fixed set of access tokens.
#[derive(Debug, Default)]
pub struct StaticTokenVerifier {
    tokens: HashMap<String, UserId>,
}

impl StaticTokenVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, token: impl Into<String>, user: UserId) -> Self {
        self.tokens.insert(token.into(), user);
        self
    }
}

#[async_trait]
impl AuthVerifier for StaticTokenVerifier {
    async fn verify(&self, access_token: &str) -> Result<UserId, StoreError> {
        self.tokens
            .get(access_token)
            .copied()
            .ok_or_else(|| StoreError::Upstream {
                status: 401,
                message: "Invalid JWT".into(),
            })
    }
}
