//! Page content: tokenizing content streams and executing their operators
//! against a [`Surface`].
//!
//! ```rust
//! use pdfgraph::content::{DisplayList, Interpreter};
//! use pdfgraph::objects::Value;
//! use pdfgraph::xref::MemoryResolver;
//!
//! let objects = MemoryResolver::new();
//! let mut surface = DisplayList::new();
//! let report = Interpreter::new(&objects)
//!     .run(b"1 0 0 rg 0 0 100 100 re f", &Value::Null, &mut surface)
//!     .unwrap();
//! assert!(report.is_clean());
//! assert_eq!(surface.fills().count(), 1);
//! ```

pub mod display_list;
pub mod font;
pub mod interpreter;
mod ops;
pub mod path;
pub mod state;
pub mod surface;
pub mod tokenizer;

pub use display_list::{DisplayItem, DisplayList};
pub use font::LoadedFont;
pub use interpreter::{Diagnostic, Interpreter, InterpreterConfig, RunReport};
pub use path::{FillRule, Path, PathSegment};
pub use state::{BlendMode, GState, LineCap, LineJoin, RenderingIntent, StrokeStyle, TextState};
pub use surface::{ImageData, ImageSource, Paint, PaintTarget, PatternTile, Surface, TextRun};
pub use tokenizer::{ContentToken, ContentTokenizer, InlineImage};
