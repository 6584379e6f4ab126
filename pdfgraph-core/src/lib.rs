//! # pdfgraph
//!
//! A PDF engine in three parts that share one object model:
//!
//! - **Reading**: an existing file becomes an addressable object graph behind a
//!   lazily resolved cross-reference table ([`PdfDocument`], [`xref`]).
//! - **Interpreting**: page content streams run as drawing programs against a
//!   pluggable [`Surface`](content::Surface) ([`content`]).
//! - **Writing**: a new document is numbered, serialized, optionally
//!   compressed and encrypted, and closed with an xref table and trailer
//!   ([`writer`]).
//!
//! ## Quick Start
//!
//! ### Creating PDFs
//!
//! ```rust
//! use pdfgraph::geometry::Rectangle;
//! use pdfgraph::writer::{DeviceColor, StandardFont};
//! use pdfgraph::{DocumentWriter, Result, WriterConfig};
//!
//! # fn main() -> Result<()> {
//! let mut doc = DocumentWriter::new(WriterConfig::default().with_title("Hello"));
//! let mut page = doc.add_page(Rectangle::a4());
//! page.set_font(StandardFont::Helvetica, 24.0)
//!     .draw_text(50.0, 700.0, "Hello, PDF!")?;
//! page.set_fill_color(DeviceColor::Rgb(0.0, 0.5, 1.0))
//!     .rect(50.0, 400.0, 100.0, 100.0)
//!     .fill();
//! let bytes = doc.finish()?;
//! # assert!(bytes.ends_with(b"%%EOF\n"));
//! # Ok(())
//! # }
//! ```
//!
//! ### Reading and interpreting PDFs
//!
//! ```rust,no_run
//! use pdfgraph::content::{DisplayList, Interpreter};
//! use pdfgraph::PdfDocument;
//!
//! # fn main() -> pdfgraph::Result<()> {
//! let document = PdfDocument::open("document.pdf")?;
//! println!("PDF {} with {} pages", document.version(), document.page_count());
//!
//! for (i, page) in document.pages().iter().enumerate() {
//!     let content = document.page_content(i)?;
//!     let mut surface = DisplayList::new();
//!     let report = Interpreter::new(document.xref()).run_page(page, &content, &mut surface)?;
//!     println!("page {}: {} operators, {} problems", i + 1, report.operators, report.diagnostics.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod colorspace;
pub mod compression;
pub mod content;
pub mod encryption;
pub mod error;
pub mod geometry;
pub mod objects;
pub mod parser;
pub mod resources;
pub mod writer;
pub mod xref;

pub use content::{DisplayList, Interpreter, InterpreterConfig, RunReport, Surface};
pub use error::{PdfError, ResourceCategory, Result};
pub use objects::{Dictionary, ObjectId, Stream, Value};
pub use parser::{ParseOptions, PdfDocument, PdfPage};
pub use writer::{DocumentWriter, PageHandle, PdfVersion, WriterConfig};
pub use xref::{MemoryResolver, ObjectResolver, XRefRegistry, XRefTable};

/// Current version of pdfgraph
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
