//! Creation: validate a selected PDF against the plan tier, upload it,
//! generate a thumbnail, and insert the record.
//!
//! Steps run in order and the record insert is last, so a failure after the
//! upload leaves the PDF in storage without a record.

use super::{FlipbookService, Session};
use crate::config::PlanLimits;
use crate::deck;
use crate::error::{FlipbookError, ValidationError};
use crate::model::{Flipbook, FlipbookStatus, NewFlipbook, Role, UserId};
use crate::pipeline::encode::JPEG_MIME;
use crate::pipeline::input::PdfSource;
use crate::store::{self, Bucket};
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

const PDF_MIME: &str = "application/pdf";

/// A file picked by the user.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("size", &self.bytes.len())
            .finish()
    }
}

/// The create form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRequest {
    pub title: String,
    pub file: Option<SelectedFile>,
}

/// Check a file against the user's tier before anything is uploaded.
///
/// A file exactly at the limit is accepted. A tier with a flipbook cap
/// rejects once the user already owns that many.
pub fn check_limits(
    limits: &PlanLimits,
    role: Role,
    file_size: u64,
    existing: usize,
) -> Result<(), ValidationError> {
    let tier = limits.for_role(role);

    if file_size > tier.max_file_bytes {
        let upgrade_hint = match role {
            Role::Free => Some(limits.pro.max_file_mb()),
            Role::Pro => None,
        };
        return Err(ValidationError::FileTooLarge {
            limit_mb: tier.max_file_mb(),
            upgrade_hint,
        });
    }

    if let Some(max) = tier.max_flipbooks {
        if existing >= max {
            return Err(ValidationError::PlanLimitReached { limit: max });
        }
    }

    Ok(())
}

impl FlipbookService {
    /// Submit the create form.
    ///
    /// Returns `Ok(None)` without doing anything when the title or file is
    /// missing, matching a form whose submit button does nothing until both
    /// are filled in.
    pub async fn create_flipbook(
        &self,
        session: Option<&Session>,
        request: CreateRequest,
    ) -> Result<Option<Flipbook>, FlipbookError> {
        let title = request.title.trim();
        let file = match request.file {
            Some(file) if !title.is_empty() => file,
            _ => return Ok(None),
        };

        let session = session.ok_or(FlipbookError::Unauthenticated)?;
        let user = session.user_id;

        let role = self.records().get_user_role(user).await?;
        let existing = self.records().count_flipbooks(user).await?;
        check_limits(&self.config().plan_limits, role, file.size(), existing)?;

        // ── Upload ───────────────────────────────────────────────────────
        let pdf_path = store::pdf_object_path(user, &Uuid::new_v4().to_string(), &file.name);
        self.assets()
            .upload(Bucket::Pdfs, &pdf_path, file.bytes, PDF_MIME)
            .await?;
        info!(user_id = %user, path = %pdf_path, "Uploaded PDF");

        // ── Thumbnail (best effort) ──────────────────────────────────────
        let thumbnail_path = self.generate_thumbnail(user, &pdf_path).await;

        // ── Record ───────────────────────────────────────────────────────
        let flipbook = self
            .records()
            .insert_flipbook(NewFlipbook {
                user_id: user,
                title: title.to_string(),
                pdf_storage_path: pdf_path,
                thumbnail_path,
                status: FlipbookStatus::Ready,
            })
            .await?;

        info!(user_id = %user, flipbook_id = %flipbook.id, "Flipbook created");
        Ok(Some(flipbook))
    }

    /// Render page 1 of the uploaded PDF and store it. Any failure is logged
    /// and yields `None`.
    async fn generate_thumbnail(&self, user: UserId, pdf_path: &str) -> Option<String> {
        let url = self.assets().public_url(Bucket::Pdfs, pdf_path);
        let source = PdfSource::Url(url);
        let thumb = match deck::render_thumbnail(self.rasterizer(), &source, self.config()).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Failed to generate thumbnail: {}", e);
                return None;
            }
        };

        let path = store::thumbnail_object_path(user, &Uuid::new_v4().to_string());
        match self
            .assets()
            .upload(Bucket::Thumbnails, &path, thumb.data, JPEG_MIME)
            .await
        {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("Failed to upload thumbnail: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn free_file_at_limit_is_accepted() {
        let limits = PlanLimits::default();
        assert!(check_limits(&limits, Role::Free, 10 * MB, 0).is_ok());
    }

    #[test]
    fn free_file_over_limit_mentions_pro() {
        let limits = PlanLimits::default();
        let err = check_limits(&limits, Role::Free, 10 * MB + 1, 0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "File size must be less than 10MB (upgrade to Pro for 50MB)"
        );
    }

    #[test]
    fn pro_file_over_limit() {
        let limits = PlanLimits::default();
        assert!(check_limits(&limits, Role::Pro, 50 * MB, 100).is_ok());
        let err = check_limits(&limits, Role::Pro, 50 * MB + 1, 0).unwrap_err();
        assert_eq!(err.to_string(), "File size must be less than 50MB");
    }

    #[test]
    fn free_count_cap() {
        let limits = PlanLimits::default();
        assert!(check_limits(&limits, Role::Free, MB, 2).is_ok());
        assert_eq!(
            check_limits(&limits, Role::Free, MB, 3),
            Err(ValidationError::PlanLimitReached { limit: 3 })
        );
    }

    #[test]
    fn size_is_checked_before_count() {
        let limits = PlanLimits::default();
        let err = check_limits(&limits, Role::Free, 11 * MB, 5).unwrap_err();
        assert!(matches!(err, ValidationError::FileTooLarge { .. }));
    }
}
