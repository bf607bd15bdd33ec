//! Owner-only editing and deletion.

use super::{messages, FlipbookService, Session};
use crate::error::{FlipbookError, ValidationError};
use crate::model::{Flipbook, FlipbookId, FlipbookUpdate};
use crate::store::{self, Bucket};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use tracing::{info, warn};

static HEX_COLOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").unwrap());

/// A styling image picked by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// The edit form. Images left as `None` keep their current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    pub title: String,
    pub background_color: String,
    pub background_image: Option<ImageUpload>,
    pub logo_image: Option<ImageUpload>,
}

impl EditRequest {
    /// Prefill the form from a record.
    pub fn from_flipbook(flipbook: &Flipbook) -> Self {
        Self {
            title: flipbook.title.clone(),
            background_color: flipbook.background_color.clone(),
            background_image: None,
            logo_image: None,
        }
    }
}

/// `#RRGGBB`.
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    if HEX_COLOR.is_match(color) {
        Ok(())
    } else {
        Err(ValidationError::InvalidColor(color.to_string()))
    }
}

impl FlipbookService {
    /// Load a record for the edit form. Only the owner may edit.
    pub async fn load_for_edit(
        &self,
        session: &Session,
        id: FlipbookId,
    ) -> Result<Flipbook, FlipbookError> {
        self.owned_flipbook(session, id, messages::EDIT_FORBIDDEN)
            .await
    }

    /// Save the edit form.
    pub async fn save_flipbook(
        &self,
        session: &Session,
        id: FlipbookId,
        request: EditRequest,
    ) -> Result<Flipbook, FlipbookError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingTitle.into());
        }
        validate_color(&request.background_color)?;

        self.owned_flipbook(session, id, messages::EDIT_FORBIDDEN)
            .await?;

        let user = session.user_id;
        let mut update = FlipbookUpdate {
            title: Some(title.to_string()),
            background_color: Some(request.background_color.clone()),
            ..Default::default()
        };

        if let Some(image) = request.background_image {
            let path = store::styling_object_path(user, Utc::now(), &image.name);
            self.assets()
                .upload(Bucket::Backgrounds, &path, image.bytes, &image.content_type)
                .await?;
            update.background_image_path = Some(path);
        }

        if let Some(image) = request.logo_image {
            let path = store::styling_object_path(user, Utc::now(), &image.name);
            self.assets()
                .upload(Bucket::Logos, &path, image.bytes, &image.content_type)
                .await?;
            update.logo_image_path = Some(path);
        }

        let flipbook = self.records().update_flipbook(id, &update).await?;
        info!(user_id = %user, flipbook_id = %id, "Flipbook updated");
        Ok(flipbook)
    }

    /// Delete a record. Storage objects are removed only when
    /// `cleanup_assets_on_delete` is set, and a cleanup failure is logged,
    /// not returned.
    pub async fn delete_flipbook(
        &self,
        session: &Session,
        id: FlipbookId,
    ) -> Result<(), FlipbookError> {
        let flipbook = self
            .owned_flipbook(session, id, messages::EDIT_FORBIDDEN)
            .await?;

        self.records().delete_flipbook(id).await?;
        info!(user_id = %session.user_id, flipbook_id = %id, "Flipbook deleted");

        if self.config().cleanup_assets_on_delete {
            self.remove_assets(&flipbook).await;
        }
        Ok(())
    }

    async fn remove_assets(&self, flipbook: &Flipbook) {
        let objects = [
            (Bucket::Pdfs, Some(&flipbook.pdf_storage_path)),
            (Bucket::Thumbnails, flipbook.thumbnail_path.as_ref()),
            (Bucket::Backgrounds, flipbook.background_image_path.as_ref()),
            (Bucket::Logos, flipbook.logo_image_path.as_ref()),
        ];
        for (bucket, path) in objects {
            let Some(path) = path else { continue };
            if let Err(e) = self.assets().delete(bucket, &[path.clone()]).await {
                warn!("Failed to remove {}/{}: {}", bucket, path, e);
            }
        }
    }

    /// Fetch a record and check that `session` owns it.
    pub(crate) async fn owned_flipbook(
        &self,
        session: &Session,
        id: FlipbookId,
        forbidden: &str,
    ) -> Result<Flipbook, FlipbookError> {
        let flipbook = self.records().get_flipbook(id).await?;
        if !flipbook.is_owned_by(session.user_id) {
            return Err(FlipbookError::Forbidden(forbidden.to_string()));
        }
        Ok(flipbook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_colors() {
        assert!(validate_color("#FFFFFF").is_ok());
        assert!(validate_color("#8b5cf6").is_ok());
        assert!(validate_color("#FFF").is_err());
        assert!(validate_color("red").is_err());
        assert!(validate_color("#GGGGGG").is_err());
    }
}
