//! High-level read access to an existing PDF.
//!
//! [`PdfDocument`] owns the file bytes through its [`XRefTable`], flattens
//! the page tree once at open time (resolving inherited attributes) and
//! hands out decoded content streams on demand. Everything else stays lazy.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, warn};

use super::lexer::find_bytes;
use super::ParseOptions;
use crate::encryption::StandardSecurityHandler;
use crate::error::{PdfError, Result};
use crate::geometry::Rectangle;
use crate::objects::{Dictionary, ObjectId, Value};
use crate::xref::{ObjectResolver, XRefTable};

/// Attributes a page inherits from its ancestors in the page tree.
const INHERITABLE: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Maximum page tree depth followed before giving up on a branch.
const MAX_TREE_DEPTH: usize = 64;

/// One leaf of the page tree with inherited attributes applied.
#[derive(Debug, Clone)]
pub struct PdfPage {
    pub id: Option<ObjectId>,
    pub dict: Dictionary,
    pub resources: Dictionary,
    pub media_box: Rectangle,
    pub crop_box: Rectangle,
    pub rotation: i32,
}

impl PdfPage {
    pub fn width(&self) -> f64 {
        self.media_box.width()
    }

    pub fn height(&self) -> f64 {
        self.media_box.height()
    }
}

#[derive(Debug)]
pub struct PdfDocument {
    table: XRefTable,
    version: (u8, u8),
    pages: Vec<PdfPage>,
}

impl PdfDocument {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_bytes(data)
    }

    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        Self::with_options(data, ParseOptions::default())
    }

    pub fn with_options(data: Vec<u8>, options: ParseOptions) -> Result<Self> {
        let version = parse_header_version(&data)?;
        let mut table = XRefTable::load(data, options)?;

        if table.is_encrypted() {
            install_decryptor(&mut table)?;
        }

        let mut doc = Self {
            table,
            version,
            pages: Vec::new(),
        };
        doc.pages = doc.collect_pages()?;
        debug!(
            "opened PDF {}.{} with {} pages",
            version.0,
            version.1,
            doc.pages.len()
        );
        Ok(doc)
    }

    /// Header version as `"major.minor"`.
    pub fn version(&self) -> String {
        format!("{}.{}", self.version.0, self.version.1)
    }

    pub fn xref(&self) -> &XRefTable {
        &self.table
    }

    pub fn trailer(&self) -> &Dictionary {
        self.table.trailer()
    }

    pub fn catalog(&self) -> Result<&Dictionary> {
        let root = self
            .trailer()
            .get("Root")
            .ok_or_else(|| PdfError::malformed("trailer without /Root"))?;
        self.table
            .resolve(root)?
            .as_dict()
            .ok_or_else(|| PdfError::malformed("/Root is not a dictionary"))
    }

    /// The `/Info` dictionary, if present and readable.
    pub fn info(&self) -> Option<&Dictionary> {
        let info = self.trailer().get("Info")?;
        self.table.resolve(info).ok()?.as_dict()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PdfPage] {
        &self.pages
    }

    pub fn page(&self, index: usize) -> Result<&PdfPage> {
        self.pages
            .get(index)
            .ok_or_else(|| PdfError::malformed(format!("no page {index}")))
    }

    /// Decoded `/Contents` of a page; multiple streams are joined with a
    /// newline so tokens cannot fuse across the boundary.
    pub fn page_content(&self, index: usize) -> Result<Vec<u8>> {
        let page = self.page(index)?;
        let Some(contents) = page.dict.get("Contents") else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        match self.table.resolve(contents)? {
            Value::Stream(stream) => out = stream.decoded_data()?,
            Value::Array(parts) => {
                for part in parts {
                    match self.table.resolve(part) {
                        Ok(Value::Stream(stream)) => {
                            out.extend_from_slice(&stream.decoded_data()?);
                            out.push(b'\n');
                        }
                        Ok(other) => warn!("skipping {} in /Contents", other.kind()),
                        Err(e) => warn!("skipping unreadable content stream: {e}"),
                    }
                }
            }
            Value::Null => {}
            other => {
                return Err(PdfError::malformed(format!(
                    "/Contents is a {}",
                    other.kind()
                )))
            }
        }
        Ok(out)
    }

    fn collect_pages(&self) -> Result<Vec<PdfPage>> {
        let catalog = self.catalog()?;
        let root = catalog
            .get("Pages")
            .ok_or_else(|| PdfError::malformed("catalog without /Pages"))?;
        let mut pages = Vec::new();
        let mut visited = HashSet::new();
        self.walk_tree(root, &Dictionary::new(), 0, &mut visited, &mut pages)?;
        Ok(pages)
    }

    fn walk_tree(
        &self,
        node_ref: &Value,
        inherited: &Dictionary,
        depth: usize,
        visited: &mut HashSet<ObjectId>,
        pages: &mut Vec<PdfPage>,
    ) -> Result<()> {
        if depth > MAX_TREE_DEPTH {
            return Err(PdfError::malformed("page tree too deep"));
        }
        let id = node_ref.as_reference();
        if let Some(id) = id {
            if !visited.insert(id) {
                warn!("page tree cycle at {id}");
                return Ok(());
            }
        }
        let node = self
            .table
            .resolve(node_ref)?
            .as_dict()
            .ok_or_else(|| PdfError::malformed("page tree node is not a dictionary"))?;

        let mut merged = inherited.clone();
        for key in INHERITABLE {
            if let Some(v) = node.get(key) {
                merged.set(key, v.clone());
            }
        }

        let is_pages = match node.get_name("Type") {
            Some("Pages") => true,
            Some("Page") => false,
            _ => node.contains_key("Kids"),
        };

        if is_pages {
            let kids = node
                .get("Kids")
                .map(|k| self.table.resolve_or_null(k))
                .and_then(Value::as_array)
                .ok_or_else(|| PdfError::malformed("/Pages node without /Kids"))?;
            for kid in kids {
                if let Err(e) = self.walk_tree(kid, &merged, depth + 1, visited, pages) {
                    warn!("skipping page tree branch: {e}");
                }
            }
            return Ok(());
        }

        pages.push(self.make_page(id, node, &merged));
        Ok(())
    }

    fn make_page(&self, id: Option<ObjectId>, dict: &Dictionary, merged: &Dictionary) -> PdfPage {
        let rect = |key: &str| {
            merged
                .get(key)
                .map(|v| self.table.resolve_or_null(v))
                .and_then(Rectangle::from_value)
        };
        let media_box = rect("MediaBox").unwrap_or_else(Rectangle::letter);
        let crop_box = rect("CropBox").unwrap_or(media_box);
        let resources = merged
            .get("Resources")
            .map(|v| self.table.resolve_or_null(v))
            .and_then(Value::as_dict)
            .cloned()
            .unwrap_or_default();
        let rotation = merged
            .get("Rotate")
            .map(|v| self.table.resolve_or_null(v))
            .and_then(Value::as_i64)
            .unwrap_or(0) as i32;

        PdfPage {
            id,
            dict: dict.clone(),
            resources,
            media_box,
            crop_box,
            rotation,
        }
    }
}

impl ObjectResolver for PdfDocument {
    fn get_object(&self, id: ObjectId) -> Result<&Value> {
        self.table.get_object(id)
    }

    fn resolve<'a>(&'a self, value: &'a Value) -> Result<&'a Value> {
        self.table.resolve(value)
    }
}

fn install_decryptor(table: &mut XRefTable) -> Result<()> {
    let encrypt = table
        .trailer()
        .get("Encrypt")
        .cloned()
        .unwrap_or_default();
    let dict = table
        .resolve(&encrypt)?
        .as_dict()
        .cloned()
        .ok_or_else(|| PdfError::malformed("/Encrypt is not a dictionary"))?;
    let file_id = table
        .trailer()
        .get_array("ID")
        .and_then(|ids| ids.first())
        .and_then(Value::as_bytes)
        .map(<[u8]>::to_vec)
        .unwrap_or_default();
    let handler = StandardSecurityHandler::from_encrypt_dict(&dict, &file_id, b"")?;
    table.set_decryptor(Box::new(handler));
    Ok(())
}

/// Reads `%PDF-x.y` from the first kilobyte.
fn parse_header_version(data: &[u8]) -> Result<(u8, u8)> {
    let head = &data[..data.len().min(1024)];
    let pos = find_bytes(head, b"%PDF-").ok_or_else(|| PdfError::malformed("missing %PDF header"))?;
    let rest = &head[pos + 5..];
    let digits: Vec<u8> = rest
        .iter()
        .copied()
        .take_while(|b| b.is_ascii_digit() || *b == b'.')
        .collect();
    let text = String::from_utf8_lossy(&digits);
    let mut parts = text.split('.');
    let major = parts.next().and_then(|p| p.parse().ok());
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    match major {
        Some(major) => Ok((major, minor)),
        None => Err(PdfError::malformed(format!("bad header version '{text}'"))),
    }
}
