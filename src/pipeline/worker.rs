//! The PDF decode worker: a process-wide pdfium binding.
//!
//! pdfium is a C++ library loaded at runtime. Binding it is a one-time
//! process setup step, so it lives behind [`RenderWorker::init`], which is
//! safe to call any number of times: the first successful call binds the
//! library, later calls return the same worker. Rendering itself happens on
//! `spawn_blocking` threads; the worker only provides the shared binding.
//!
//! Library resolution, first match wins:
//!
//! 1. `PDFIUM_LIB_PATH` pointing at an existing library file
//! 2. the platform library inside `{cache_dir}/flipflow/pdfium/`
//! 3. the system library search path

use crate::error::RenderError;
use once_cell::sync::OnceCell;
use pdfium_render::prelude::Pdfium;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

static WORKER: OnceCell<RenderWorker> = OnceCell::new();

/// Shared pdfium binding used by every render.
pub struct RenderWorker {
    pdfium: Pdfium,
    library: Option<PathBuf>,
}

impl RenderWorker {
    /// Bind pdfium once per process and return the shared worker.
    pub fn init() -> Result<&'static RenderWorker, RenderError> {
        WORKER.get_or_try_init(|| {
            let (pdfium, library) = bind()?;
            match &library {
                Some(path) => info!("PDF decode worker bound to {}", path.display()),
                None => info!("PDF decode worker bound to system pdfium"),
            }
            Ok(RenderWorker { pdfium, library })
        })
    }

    /// The worker, if [`RenderWorker::init`] has succeeded.
    pub fn get() -> Option<&'static RenderWorker> {
        WORKER.get()
    }

    pub fn is_initialized() -> bool {
        WORKER.get().is_some()
    }

    /// Path of the bound library, `None` for the system library.
    pub fn library_path(&self) -> Option<&Path> {
        self.library.as_deref()
    }

    pub(crate) fn pdfium(&self) -> &Pdfium {
        &self.pdfium
    }
}

/// Directory searched for a previously installed pdfium library.
///
/// Override with `FLIPFLOW_CACHE_DIR`.
pub fn pdfium_cache_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FLIPFLOW_CACHE_DIR") {
        return PathBuf::from(dir).join("pdfium");
    }
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
        .unwrap_or_else(std::env::temp_dir)
        .join("flipflow")
        .join("pdfium")
}

fn bind() -> Result<(Pdfium, Option<PathBuf>), RenderError> {
    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return bind_at(&path).map(|p| (p, Some(path)));
        }
        debug!("PDFIUM_LIB_PATH '{}' does not exist; ignoring", path.display());
    }

    let cached = Pdfium::pdfium_platform_library_name_at_path(&pdfium_cache_dir());
    if cached.exists() {
        return bind_at(&cached).map(|p| (p, Some(cached)));
    }

    Pdfium::bind_to_system_library()
        .map(|bindings| (Pdfium::new(bindings), None))
        .map_err(|e| RenderError::WorkerUnavailable(format!("{e:?}")))
}

fn bind_at(path: &Path) -> Result<Pdfium, RenderError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| RenderError::WorkerUnavailable(format!("{}: {e:?}", path.display())))
}
