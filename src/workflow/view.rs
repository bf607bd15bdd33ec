//! Viewing, sharing, analytics and the dashboard list.

use super::{messages, FlipbookService, Session};
use crate::error::FlipbookError;
use crate::model::{Flipbook, FlipbookId, Role};
use crate::pipeline::input::PdfSource;
use crate::store::Bucket;
use crate::viewer::{FlipbookViewer, ViewerStyling};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

/// Everything a view page needs before rendering starts.
#[derive(Debug, Clone)]
pub struct FlipbookView {
    /// The record with `view_count` already incremented for this load.
    pub flipbook: Flipbook,
    /// Public URL the deck is rendered from.
    pub pdf_url: String,
    pub is_owner: bool,
    /// Non-owners see a "Made with FlipFlow" footer.
    pub show_branding: bool,
    pub styling: ViewerStyling,
}

impl FlipbookView {
    pub fn source(&self) -> PdfSource {
        PdfSource::Url(self.pdf_url.clone())
    }
}

/// View statistics for one flipbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyticsReport {
    pub flipbook_id: FlipbookId,
    pub title: String,
    pub view_count: u64,
    pub created_at: DateTime<Utc>,
}

/// One dashboard card: the record plus its thumbnail's public URL.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardEntry {
    pub flipbook: Flipbook,
    /// `None` when no thumbnail was generated.
    pub thumbnail_url: Option<String>,
}

/// Link to share a flipbook: `{base}/flipbook/{id}`.
pub fn share_url(base: &str, id: FlipbookId) -> String {
    format!("{}/flipbook/{}", base.trim_end_matches('/'), id)
}

impl FlipbookService {
    /// Load a flipbook for viewing and count the view.
    ///
    /// Anyone may view. Each call counts one view; a failed count update is
    /// logged and the view goes ahead with the old count.
    pub async fn open_flipbook(
        &self,
        session: Option<&Session>,
        id: FlipbookId,
    ) -> Result<FlipbookView, FlipbookError> {
        let mut flipbook = self.records().get_flipbook(id).await?;
        if !flipbook.is_viewable() {
            return Err(FlipbookError::NotReady(id.to_string()));
        }

        let pdf_url = self
            .assets()
            .public_url(Bucket::Pdfs, &flipbook.pdf_storage_path);
        let is_owner = session.is_some_and(|s| flipbook.is_owned_by(s.user_id));

        match self
            .records()
            .increment_view_count(id, flipbook.view_count)
            .await
        {
            Ok(count) => flipbook.view_count = count,
            Err(e) => warn!(flipbook_id = %id, "Failed to count view: {}", e),
        }
        info!(flipbook_id = %id, views = flipbook.view_count, "Flipbook opened");

        let styling = ViewerStyling::resolve(self.assets(), &flipbook);
        Ok(FlipbookView {
            flipbook,
            pdf_url,
            is_owner,
            show_branding: !is_owner,
            styling,
        })
    }

    /// Open a flipbook and render its deck into a ready viewer.
    ///
    /// A render failure leaves the viewer in its failed phase; the view
    /// itself (and the counted view) still stand.
    pub async fn view_flipbook(
        &self,
        session: Option<&Session>,
        id: FlipbookId,
    ) -> Result<(FlipbookView, FlipbookViewer), FlipbookError> {
        let view = self.open_flipbook(session, id).await?;
        let mut viewer = FlipbookViewer::new(view.styling.clone(), self.config());
        // The viewer records the failure in its phase.
        let _ = viewer
            .load(self.rasterizer(), view.source(), self.config())
            .await;
        Ok((view, viewer))
    }

    /// View statistics. Only the owner may see them.
    pub async fn analytics(
        &self,
        session: &Session,
        id: FlipbookId,
    ) -> Result<AnalyticsReport, FlipbookError> {
        let flipbook = self
            .owned_flipbook(session, id, messages::ANALYTICS_FORBIDDEN)
            .await?;
        Ok(AnalyticsReport {
            flipbook_id: flipbook.id,
            title: flipbook.title,
            view_count: flipbook.view_count,
            created_at: flipbook.created_at,
        })
    }

    /// The signed-in user's flipbooks, newest first, with thumbnail URLs
    /// resolved.
    pub async fn dashboard(
        &self,
        session: &Session,
    ) -> Result<Vec<DashboardEntry>, FlipbookError> {
        let flipbooks = self.records().list_flipbooks(session.user_id).await?;
        Ok(flipbooks
            .into_iter()
            .map(|flipbook| DashboardEntry {
                thumbnail_url: flipbook
                    .thumbnail_path
                    .as_deref()
                    .map(|p| self.assets().public_url(Bucket::Thumbnails, p)),
                flipbook,
            })
            .collect())
    }

    /// The signed-in user's plan tier; `free` when no role is stored.
    pub async fn current_role(&self, session: &Session) -> Result<Role, FlipbookError> {
        Ok(self.records().get_user_role(session.user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn share_url_strips_trailing_slash() {
        let id = FlipbookId::from_uuid(Uuid::nil());
        assert_eq!(
            share_url("https://flipflow.app/", id),
            "https://flipflow.app/flipbook/00000000-0000-0000-0000-000000000000"
        );
    }
}
