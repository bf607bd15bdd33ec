//! Pipeline stages for turning a PDF into page images.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ worker ──▶ render ──▶ encode
//! (URL/bytes) (pdfium)  (serial)   (JPEG)
//!                          │
//!                       layout (display box from page 1)
//! ```
//!
//! 1. [`input`]  — normalise a URL, buffer or file to validated PDF bytes
//! 2. [`worker`] — bind pdfium once per process
//! 3. [`render`] — decode and rasterise pages one at a time on a blocking
//!    thread, streaming each page as it completes
//! 4. [`encode`] — compress each bitmap to JPEG
//! 5. [`layout`] — derive the viewer's display box from the first page

pub mod encode;
pub mod input;
pub mod layout;
pub mod render;
pub mod worker;
