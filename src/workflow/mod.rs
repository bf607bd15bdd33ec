//! User-facing workflows: create, edit/delete, view, analytics, dashboard.
//!
//! Each workflow is a method on [`FlipbookService`], which bundles the
//! collaborators a signed-in client talks to. Operations that need a user
//! take a [`Session`]; anonymous viewing takes `Option<&Session>`.
//!
//! Every fatal failure is a [`FlipbookError`](crate::FlipbookError); call
//! `user_message` with the matching constant from [`messages`] to get the
//! single toast-style message shown to the user. The create dialog uses
//! `user_message_with_upstream` instead, which shows storage-provided text.

pub mod create;
pub mod edit;
pub mod view;

use crate::config::FlipbookConfig;
use crate::model::UserId;
use crate::pipeline::render::Rasterizer;
use crate::store::{AssetStore, RecordStore};
use std::sync::Arc;

pub use create::{check_limits, CreateRequest, SelectedFile};
pub use edit::{EditRequest, ImageUpload};
pub use view::{share_url, AnalyticsReport, DashboardEntry, FlipbookView};

/// Messages shown when a workflow fails without a more specific reason.
pub mod messages {
    pub const CREATE_FAILED: &str = "Failed to create flipbook";
    pub const LOAD_FAILED: &str = "Failed to load flipbook";
    pub const LIST_FAILED: &str = "Failed to load flipbooks";
    pub const UPDATE_FAILED: &str = "Failed to update flipbook";
    pub const DELETE_FAILED: &str = "Failed to delete flipbook";
    pub const ANALYTICS_FAILED: &str = "Failed to load analytics";
    pub const EDIT_FORBIDDEN: &str = "You don't have permission to edit this flipbook";
    pub const ANALYTICS_FORBIDDEN: &str = "You don't have permission to view this analytics";
}

/// The signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
}

impl Session {
    pub fn new(user_id: UserId) -> Self {
        Self { user_id }
    }
}

/// Collaborators shared by all workflows.
#[derive(Clone)]
pub struct FlipbookService {
    records: Arc<dyn RecordStore>,
    assets: Arc<dyn AssetStore>,
    rasterizer: Arc<dyn Rasterizer>,
    config: FlipbookConfig,
}

impl FlipbookService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        assets: Arc<dyn AssetStore>,
        rasterizer: Arc<dyn Rasterizer>,
        config: FlipbookConfig,
    ) -> Self {
        Self {
            records,
            assets,
            rasterizer,
            config,
        }
    }

    pub fn config(&self) -> &FlipbookConfig {
        &self.config
    }

    pub fn records(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }

    pub fn assets(&self) -> &dyn AssetStore {
        self.assets.as_ref()
    }

    pub fn rasterizer(&self) -> &dyn Rasterizer {
        self.rasterizer.as_ref()
    }
}
