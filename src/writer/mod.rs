//! PDF writing module.
//!
//! ## Architecture
//!
//! ```text
//! pdfmark handlers
//!     ↓
//! [OutlineBuilder] [ArticleThreads] [PageLabelsBuilder] (incremental structures)
//!     ↓
//! [ObjectGraph] / [PdfWriter] (allocates ids, writes each object once)
//!     ↓
//! [ObjectSerializer] (serializes PDF objects)
//!     ↓
//! PDF bytes
//! ```

mod article_threads;
mod object_serializer;
mod outline_builder;
mod page_labels;
mod pdf_writer;

pub use article_threads::{Article, ArticleThreads, Bead};
pub use object_serializer::{format_real, ObjectSerializer};
pub use outline_builder::{OutlineBuilder, OutlineNode, MAX_OUTLINE_DEPTH};
pub use page_labels::PageLabelsBuilder;
pub(crate) use pdf_writer::compress_data;
pub use pdf_writer::{ObjectGraph, PdfWriter, PdfWriterConfig};
