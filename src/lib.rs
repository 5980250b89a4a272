// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::too_many_arguments)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::match_like_matches_macro)]

//! # pdfmark Oxide
//!
//! pdfmark processing for PDF output: the PostScript `pdfmark` operator
//! turned into PDF objects.
//!
//! ## Core Features
//!
//! - **Annotations and links**: `/ANN` and `/LNK` with action handling, border
//!   normalization and PDF/A and PDF/X checks
//! - **Outlines**: `/OUT` entries nested by `/Count`, with open/closed state
//! - **Article threads**: `/ARTICLE` beads chained per thread title
//! - **Destinations**: `/DEST` named destinations, page and view resolution
//! - **Document metadata**: `/DOCINFO`, `/DOCVIEW`, `/PAGES`, `/PAGE`, `/PAGELABEL`
//! - **Named objects**: `/OBJ`, `/PUT`, `/.PUTDICT`, `/.PUTSTREAM`, `/CLOSE`
//!   and friends, referenced as `{name}` from any other mark
//! - **Form XObjects**: `/BP`, `/EP`, `/SP` and embedded PostScript
//!
//! ## Architecture
//!
//! ```text
//! PostScript source ──▶ pdfmark::source ──▶ PdfmarkProcessor ──▶ writer ──▶ PDF bytes
//!                      (directives)         (mark handlers)      (objects)
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use pdfmark_oxide::pdfmark::source;
//! use pdfmark_oxide::{PdfmarkConfig, PdfmarkProcessor};
//!
//! # fn main() -> pdfmark_oxide::Result<()> {
//! let input = b"[ /Title (Chapter 1) /Page 1 /OUT pdfmark\n\
//!               [ /Rect [72 700 144 720] /Page 1 /LNK pdfmark\n\
//!               showpage";
//! let mut processor = PdfmarkProcessor::new(PdfmarkConfig::new().with_resolution(72.0, 72.0));
//! let stats = source::run(&mut processor, input)?;
//! assert_eq!(stats.marks, 2);
//!
//! let pdf = processor.finish()?;
//! assert!(pdf.starts_with(b"%PDF-"));
//! # Ok(())
//! # }
//! ```

// Error handling
pub mod error;

// Configuration
pub mod config;

// Core data model
pub mod geometry;
pub mod lexer;
pub mod object;

// pdfmark engine
pub mod pdfmark;

// PDF writing
pub mod writer;

// Re-exports
pub use config::{CompatibilityPolicy, PdfmarkConfig};
pub use error::{Error, Result};
pub use object::{Object, ObjectRef};
pub use pdfmark::PdfmarkProcessor;

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
