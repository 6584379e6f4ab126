//! Building new documents.
//!
//! A [`DocumentWriter`] numbers objects as they are created, collects page
//! content through [`PageHandle`]s and serializes everything in one pass in
//! [`finish`](DocumentWriter::finish):
//!
//! ```rust
//! use pdfgraph::geometry::Rectangle;
//! use pdfgraph::writer::{DeviceColor, DocumentWriter, StandardFont, WriterConfig};
//!
//! # fn main() -> pdfgraph::Result<()> {
//! let mut doc = DocumentWriter::new(WriterConfig::default());
//! let mut page = doc.add_page(Rectangle::letter());
//! page.set_fill_color(DeviceColor::Rgb(0.0, 0.0, 1.0))
//!     .rect(72.0, 72.0, 200.0, 100.0)
//!     .fill();
//! page.set_font(StandardFont::Helvetica, 18.0)
//!     .draw_text(72.0, 700.0, "Hello")?;
//! let bytes = doc.finish()?;
//! assert!(bytes.starts_with(b"%PDF-1.2\n"));
//! # Ok(())
//! # }
//! ```

mod annotations;
mod config;
mod fonts;
mod images;
mod page;
mod serializer;

pub use annotations::{Annotation, LinkTarget};
pub use config::{EncryptionSettings, PdfVersion, WriterConfig};
pub use fonts::{FontEntry, FontRegistry, StandardFont};
pub use images::{jpeg_dimensions, ImageInput, ImageXObject, RawColor};
pub use page::{DeviceColor, PageHandle};
pub use serializer::{format_number, Serializer};

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::encryption::{Encryptor, StandardSecurityHandler};
use crate::error::{PdfError, Result};
use crate::geometry::{Matrix, Rectangle};
use crate::objects::{Dictionary, ObjectId, Stream, Value};
use crate::xref::XRefRegistry;
use page::PageBuilder;

/// Bytes after the header line that mark the file as binary.
const BINARY_MARKER: [u8; 6] = [b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'];

/// Identity of every object the writer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKey {
    Info,
    Catalog,
    Pages,
    FontMap,
    XObjectMap,
    AcroForm,
    Encrypt,
    Page(usize),
    Contents(usize),
    Font(usize),
    Image(usize),
    SMask(usize),
    Pattern(usize),
    Annotation(usize),
    /// Objects added with [`DocumentWriter::add_object`].
    Custom(usize),
}

/// An image added to the document, usable on any page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId(pub(crate) usize);

impl ImageId {
    /// Name of the image in the shared XObject map.
    pub fn resource_name(&self) -> String {
        format!("Im{}", self.0 + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PatternId(pub(crate) usize);

/// A colored tiling pattern whose cell is drawn by `content`.
#[derive(Debug, Clone, PartialEq)]
pub struct TilingPattern {
    pub bbox: Rectangle,
    pub x_step: f64,
    pub y_step: f64,
    pub matrix: Matrix,
    pub content: Vec<u8>,
}

impl TilingPattern {
    /// A pattern repeating its bounding box edge to edge.
    pub fn new(bbox: Rectangle, content: impl Into<Vec<u8>>) -> Self {
        Self {
            bbox,
            x_step: bbox.width(),
            y_step: bbox.height(),
            matrix: Matrix::IDENTITY,
            content: content.into(),
        }
    }

    pub fn with_matrix(mut self, matrix: Matrix) -> Self {
        self.matrix = matrix;
        self
    }
}

/// An annotation that made it through link resolution.
#[derive(Debug, Clone, Copy)]
struct PlacedAnnotation {
    page: usize,
    index: usize,
    dest: Option<ObjectId>,
}

pub struct DocumentWriter {
    config: WriterConfig,
    version: PdfVersion,
    out: Vec<u8>,
    /// Length of the `%PDF-x.y` text written up front.
    header_width: usize,
    registry: XRefRegistry<ObjectKey>,
    info: Dictionary,
    pages: Vec<PageBuilder>,
    fonts: FontRegistry,
    images: Vec<ImageXObject>,
    image_digests: HashMap<[u8; 16], ImageId>,
    patterns: Vec<TilingPattern>,
    custom: Vec<Value>,
}

impl DocumentWriter {
    /// Starts a document: writes the provisional header and registers the
    /// info dictionary, catalog, page tree and the shared resource maps, in
    /// that order.
    pub fn new(config: WriterConfig) -> Self {
        let version = config.version;
        let header = format!("%PDF-{version}");
        let mut out = Vec::with_capacity(4096);
        out.extend_from_slice(header.as_bytes());
        out.push(b'\n');
        out.extend_from_slice(&BINARY_MARKER);

        let mut registry = XRefRegistry::new();
        for key in [
            ObjectKey::Info,
            ObjectKey::Catalog,
            ObjectKey::Pages,
            ObjectKey::FontMap,
            ObjectKey::XObjectMap,
        ] {
            registry.register(key);
        }

        let info = info_dict(&config);
        Self {
            config,
            version,
            out,
            header_width: header.len(),
            registry,
            info,
            pages: Vec::new(),
            fonts: FontRegistry::new(),
            images: Vec::new(),
            image_digests: HashMap::new(),
            patterns: Vec::new(),
            custom: Vec::new(),
        }
    }

    /// Current header version, including bumps made by features used so far.
    pub fn version(&self) -> PdfVersion {
        self.version
    }

    /// Raises the header version to at least `version`.
    pub fn require_version(&mut self, version: PdfVersion) {
        if version > self.version {
            debug!("raising PDF version {} -> {version}", self.version);
            self.version = version;
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Appends a page and returns a handle for drawing on it.
    pub fn add_page(&mut self, media_box: Rectangle) -> PageHandle<'_> {
        let index = self.pages.len();
        self.pages.push(PageBuilder::new(media_box));
        self.registry.register(ObjectKey::Page(index));
        self.registry.register(ObjectKey::Contents(index));
        PageHandle { doc: self, index }
    }

    /// Handle for a page added earlier.
    pub fn page(&mut self, index: usize) -> Option<PageHandle<'_>> {
        if index < self.pages.len() {
            Some(PageHandle { doc: self, index })
        } else {
            None
        }
    }

    /// Adds an image, returning the existing id if identical data was
    /// added before.
    pub fn add_image(&mut self, input: ImageInput) -> Result<ImageId> {
        let digest = input.digest();
        if let Some(&id) = self.image_digests.get(&digest) {
            return Ok(id);
        }
        let image = ImageXObject::from_input(input)?;
        let id = ImageId(self.images.len());
        self.registry.register(ObjectKey::Image(id.0));
        if image.smask.is_some() {
            self.require_version(PdfVersion::V1_4);
            self.registry.register(ObjectKey::SMask(id.0));
        }
        debug!("image {} is {}x{}", id.resource_name(), image.width, image.height);
        self.images.push(image);
        self.image_digests.insert(digest, id);
        Ok(id)
    }

    /// Adds a tiling pattern; pages reference it through
    /// [`PageHandle::use_pattern`].
    pub fn add_pattern(&mut self, pattern: TilingPattern) -> PatternId {
        self.require_version(PdfVersion::V1_3);
        let id = PatternId(self.patterns.len());
        self.patterns.push(pattern);
        self.registry.register(ObjectKey::Pattern(id.0));
        id
    }

    /// Adds an arbitrary indirect object and returns its id, so it can be
    /// referenced from other values.
    pub fn add_object(&mut self, value: impl Into<Value>) -> ObjectId {
        let index = self.custom.len();
        self.custom.push(value.into());
        ObjectId::new(self.registry.register(ObjectKey::Custom(index)), 0)
    }

    fn reference(&self, key: ObjectKey) -> Value {
        self.registry
            .number_of(key)
            .map(|n| Value::Reference(ObjectId::new(n, 0)))
            .unwrap_or(Value::Null)
    }

    fn id_of(&self, key: ObjectKey) -> Option<ObjectId> {
        self.registry.number_of(key).map(|n| ObjectId::new(n, 0))
    }

    /// Resolves page links, dropping those that point outside the
    /// document, and registers the surviving annotations.
    fn place_annotations(&mut self) -> Vec<PlacedAnnotation> {
        let page_count = self.pages.len();
        let mut placed = Vec::new();
        for (page, builder) in self.pages.iter().enumerate() {
            for (index, annotation) in builder.annotations.iter().enumerate() {
                let dest = match annotation {
                    Annotation::Link { target, .. } if !matches!(target, LinkTarget::Uri(_)) => {
                        match target.resolve_page(page, page_count) {
                            Some(to) => self.id_of(ObjectKey::Page(to)),
                            None => {
                                warn!("page {} links to missing page ({target:?}), dropped", page + 1);
                                continue;
                            }
                        }
                    }
                    _ => None,
                };
                placed.push(PlacedAnnotation { page, index, dest });
            }
        }
        for k in 0..placed.len() {
            self.registry.register(ObjectKey::Annotation(k));
        }
        placed
    }

    /// File identifier: MD5 over the info dictionary's values and the
    /// object count.
    fn file_id(&self) -> [u8; 16] {
        let mut ctx = md5::Context::new();
        let mut serializer = Serializer::new(false, 0);
        for (_, value) in self.info.iter() {
            let mut bytes = Vec::new();
            serializer.write_value(&mut bytes, value);
            ctx.consume(&bytes);
        }
        ctx.consume((self.registry.entry_count() as u32).to_le_bytes());
        ctx.finalize().0
    }

    /// Rewrites the header for the final version. The header has a fixed
    /// width once written; a longer version string cannot be patched in.
    fn patch_header(&mut self) -> Result<()> {
        let header = format!("%PDF-{}", self.version);
        if header.len() > self.header_width {
            return Err(PdfError::EncodingError(format!(
                "cannot widen header from {} to {} bytes for version {}",
                self.header_width,
                header.len(),
                self.version
            )));
        }
        let mut patched = header.into_bytes();
        patched.resize(self.header_width, b' ');
        self.out[..self.header_width].copy_from_slice(&patched);
        Ok(())
    }

    /// Serializes the document.
    pub fn finish(mut self) -> Result<Vec<u8>> {
        let placed = self.place_annotations();
        let fields: Vec<Value> = placed
            .iter()
            .enumerate()
            .filter(|(_, p)| self.pages[p.page].annotations[p.index].is_field())
            .map(|(k, _)| self.reference(ObjectKey::Annotation(k)))
            .collect();
        if !fields.is_empty() {
            self.registry.register(ObjectKey::AcroForm);
        }
        for i in 0..self.fonts.len() {
            self.registry.register(ObjectKey::Font(i));
        }
        let encryption = self.config.encryption.clone();
        if encryption.is_some() {
            self.require_version(PdfVersion::V1_4);
            self.registry.register(ObjectKey::Encrypt);
        }

        self.patch_header()?;
        let file_id = self.file_id();
        let mut handler = encryption.map(|settings| {
            StandardSecurityHandler::new(
                &settings.owner_password,
                &settings.user_password,
                settings.permissions,
                &file_id,
            )
        });
        let encrypt_dict = handler.as_ref().map(|h| h.encryption_dict());

        let mut out = std::mem::take(&mut self.out);
        let count = self.registry.entry_count();
        let mut offsets = Vec::with_capacity(count);
        {
            let mut serializer = Serializer::new(self.config.compress, self.config.compression_threshold);
            if let Some(handler) = handler.as_mut() {
                serializer = serializer.with_encryptor(handler);
            }
            for (i, key) in self.registry.entries_in_order().iter().enumerate() {
                let value = match key {
                    ObjectKey::Encrypt => encrypt_dict.clone().map(Value::Dict).unwrap_or(Value::Null),
                    ObjectKey::AcroForm => Value::Dict(annotations::acro_form(fields.clone())),
                    _ => self.object_value(*key, &placed),
                };
                offsets.push(out.len());
                serializer.write_object(&mut out, i as u32 + 1, &value, *key != ObjectKey::Encrypt);
            }
        }

        let xref_offset = out.len();
        write_xref(&mut out, &offsets);

        let id = Value::String(file_id.to_vec());
        let mut trailer = Dictionary::new()
            .with("Size", count + 1)
            .with("Root", self.reference(ObjectKey::Catalog))
            .with("Info", self.reference(ObjectKey::Info));
        if encrypt_dict.is_some() {
            trailer.set("Encrypt", self.reference(ObjectKey::Encrypt));
        }
        trailer.set("ID", Value::Array(vec![id.clone(), id]));
        out.extend_from_slice(b"trailer\n");
        Serializer::new(false, 0).write_value(&mut out, &Value::Dict(trailer));
        out.extend_from_slice(format!("\nstartxref\n{xref_offset}\n%%EOF\n").as_bytes());

        info!(
            "wrote PDF {} with {} objects, {} pages, {} bytes",
            self.version,
            count,
            self.pages.len(),
            out.len()
        );
        Ok(out)
    }

    /// Serializes the document to `path`.
    pub fn write_to(self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = self.finish()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn object_value(&self, key: ObjectKey, placed: &[PlacedAnnotation]) -> Value {
        match key {
            ObjectKey::Info => Value::Dict(self.info.clone()),
            ObjectKey::Catalog => {
                let mut catalog = Dictionary::new()
                    .with("Type", Value::name("Catalog"))
                    .with("PageMode", Value::name("UseNone"))
                    .with("Pages", self.reference(ObjectKey::Pages))
                    .with(
                        "ViewerPreferences",
                        Dictionary::new().with("PrintScaling", Value::name("None")),
                    );
                if self.registry.is_registered(ObjectKey::AcroForm) {
                    catalog.set("AcroForm", self.reference(ObjectKey::AcroForm));
                }
                Value::Dict(catalog)
            }
            ObjectKey::Pages => {
                let kids = (0..self.pages.len())
                    .map(|i| self.reference(ObjectKey::Page(i)))
                    .collect();
                Value::Dict(
                    Dictionary::new()
                        .with("Type", Value::name("Pages"))
                        .with("Kids", Value::Array(kids))
                        .with("Count", self.pages.len()),
                )
            }
            ObjectKey::FontMap => Value::Dict(
                (0..self.fonts.len())
                    .map(|i| (FontRegistry::resource_name(i), self.reference(ObjectKey::Font(i))))
                    .collect(),
            ),
            ObjectKey::XObjectMap => Value::Dict(
                (0..self.images.len())
                    .map(|i| (ImageId(i).resource_name(), self.reference(ObjectKey::Image(i))))
                    .collect(),
            ),
            ObjectKey::Page(i) => self.page_value(i, placed),
            ObjectKey::Contents(i) => Value::Stream(Stream::from_bytes(self.pages[i].content.clone())),
            ObjectKey::Font(i) => Value::Dict(self.fonts.entries()[i].to_dict()),
            ObjectKey::Image(i) => {
                let mut stream = self.images[i].stream.clone();
                if self.images[i].smask.is_some() {
                    stream.dict_mut().set("SMask", self.reference(ObjectKey::SMask(i)));
                }
                Value::Stream(stream)
            }
            ObjectKey::SMask(i) => self.images[i]
                .smask
                .clone()
                .map(Value::Stream)
                .unwrap_or(Value::Null),
            ObjectKey::Pattern(i) => Value::Stream(self.pattern_stream(&self.patterns[i])),
            ObjectKey::Annotation(k) => {
                let p = placed[k];
                let page_id = self
                    .id_of(ObjectKey::Page(p.page))
                    .unwrap_or_else(|| ObjectId::new(0, 0));
                Value::Dict(self.pages[p.page].annotations[p.index].to_dict(page_id, p.dest))
            }
            ObjectKey::Custom(i) => self.custom[i].clone(),
            // Written by `finish` directly.
            ObjectKey::AcroForm | ObjectKey::Encrypt => Value::Null,
        }
    }

    fn page_value(&self, i: usize, placed: &[PlacedAnnotation]) -> Value {
        let builder = &self.pages[i];
        let patterns: Vec<Value> = (0..self.patterns.len())
            .map(|p| self.reference(ObjectKey::Pattern(p)))
            .collect();
        let mut page = Dictionary::new()
            .with("Type", Value::name("Page"))
            .with("Parent", self.reference(ObjectKey::Pages))
            .with("MediaBox", builder.media_box.to_value())
            .with(
                "Resources",
                builder.resources(
                    self.reference(ObjectKey::FontMap),
                    self.reference(ObjectKey::XObjectMap),
                    &patterns,
                ),
            )
            .with("Contents", self.reference(ObjectKey::Contents(i)));
        let annots: Vec<Value> = placed
            .iter()
            .enumerate()
            .filter(|(_, p)| p.page == i)
            .map(|(k, _)| self.reference(ObjectKey::Annotation(k)))
            .collect();
        if !annots.is_empty() {
            page.set("Annots", Value::Array(annots));
        }
        Value::Dict(page)
    }

    fn pattern_stream(&self, pattern: &TilingPattern) -> Stream {
        let mut dict = Dictionary::new()
            .with("Type", Value::name("Pattern"))
            .with("PatternType", 1)
            .with("PaintType", 1)
            .with("TilingType", 1)
            .with("BBox", pattern.bbox.to_value())
            .with("XStep", pattern.x_step)
            .with("YStep", pattern.y_step)
            .with(
                "Resources",
                Dictionary::new()
                    .with("Font", self.reference(ObjectKey::FontMap))
                    .with("XObject", self.reference(ObjectKey::XObjectMap)),
            );
        if !pattern.matrix.is_identity() {
            dict.set(
                "Matrix",
                Value::Array(pattern.matrix.to_array().into_iter().map(Value::from).collect()),
            );
        }
        Stream::new(dict, pattern.content.clone())
    }
}

fn info_dict(config: &WriterConfig) -> Dictionary {
    let created: DateTime<Utc> = config.creation_date.unwrap_or_else(Utc::now);
    let mut info = Dictionary::new()
        .with("Producer", config.producer.as_str())
        .with("Creator", config.creator.as_str())
        .with("Author", config.author.as_str());
    if let Some(title) = &config.title {
        info.set("Title", title.as_str());
    }
    info.set("CreationDate", format_pdf_date(created));
    info
}

/// `D:YYYYMMDDHHmmSS`
fn format_pdf_date(date: DateTime<Utc>) -> String {
    date.format("D:%Y%m%d%H%M%S").to_string()
}

/// Single-subsection xref table; every line is exactly 20 bytes.
fn write_xref(out: &mut Vec<u8>, offsets: &[usize]) {
    out.extend_from_slice(b"xref\n");
    out.extend_from_slice(format!("0 {}\n", offsets.len() + 1).as_bytes());
    out.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        out.extend_from_slice(format!("{:010} {:05} n \n", offset, 0).as_bytes());
    }
}
