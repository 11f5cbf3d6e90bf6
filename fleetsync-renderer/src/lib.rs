//! # fleetsync-renderer
//!
//! Tera-based engine that renders the canonical pipeline template for one
//! downstream repository.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::path::Path;
//! use fleetsync_core::PipelineRecord;
//! use fleetsync_renderer::{TemplateContext, TemplateEngine};
//!
//! fn render(template_dir: &Path) {
//!     if let Ok(engine) = TemplateEngine::from_dir(template_dir) {
//!         let ctx = TemplateContext::new(&PipelineRecord::named("rnaseq"), "2.1.0");
//!         if let Ok(files) = engine.render(&ctx) {
//!             for file in files {
//!                 println!("{}: {} bytes", file.path.display(), file.contents.len());
//!             }
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::TemplateContext;
pub use engine::{RenderedFile, TemplateEngine};
pub use error::RenderError;
