use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use tracing::{debug, warn};

use super::ObjectResolver;
use crate::encryption::{decrypt_value, ObjectDecryptor};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, ObjectId, Value};
use crate::parser::lexer::{rfind_bytes, Lexer, Token};
use crate::parser::objects::{looks_like_object_header, LengthResolver, NoLengths, ObjectParser};
use crate::parser::ParseOptions;

/// Where an object lives in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    Free,
    InUse { offset: usize, generation: u16 },
    /// Object `index` of object stream `stream`.
    Compressed { stream: u32, index: u32 },
}

/// Read-side cross-reference table.
///
/// Objects are parsed on first access and cached in a per-entry
/// [`OnceLock`], so once a document has been walked, concurrent read-only
/// access needs no locking.
pub struct XRefTable {
    data: Vec<u8>,
    entries: BTreeMap<u32, XRefEntry>,
    cache: HashMap<u32, OnceLock<Value>>,
    trailer: Dictionary,
    options: ParseOptions,
    decryptor: Option<Box<dyn ObjectDecryptor>>,
    encrypt_ref: Option<ObjectId>,
    recovered: bool,
}

impl std::fmt::Debug for XRefTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XRefTable")
            .field("entries", &self.entries.len())
            .field("trailer", &self.trailer)
            .field("encrypted", &self.decryptor.is_some())
            .field("recovered", &self.recovered)
            .finish()
    }
}

impl XRefTable {
    /// Reads the xref chain of `data`, falling back to a scan for object
    /// headers when allowed by `options`.
    pub fn load(data: Vec<u8>, options: ParseOptions) -> Result<Self> {
        let (entries, trailer, recovered) = match read_xref_chain(&data) {
            Ok((entries, trailer)) if trailer.contains_key("Root") => (entries, trailer, false),
            Ok(_) if options.recover_xref => {
                warn!("xref chain has no /Root, rebuilding by scan");
                let (entries, trailer) = scan_for_objects(&data)?;
                (entries, trailer, true)
            }
            Ok(_) => return Err(PdfError::malformed("trailer without /Root")),
            Err(e) if options.recover_xref => {
                warn!("unreadable xref ({e}), rebuilding by scan");
                let (entries, trailer) = scan_for_objects(&data)?;
                (entries, trailer, true)
            }
            Err(e) => return Err(e),
        };

        let cache = entries
            .iter()
            .filter(|(_, e)| !matches!(e, XRefEntry::Free))
            .map(|(n, _)| (*n, OnceLock::new()))
            .collect();
        let encrypt_ref = trailer.get("Encrypt").and_then(Value::as_reference);

        debug!("xref table with {} entries", entries.len());
        Ok(Self {
            data,
            entries,
            cache,
            trailer,
            options,
            decryptor: None,
            encrypt_ref,
            recovered,
        })
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn entry(&self, number: u32) -> Option<XRefEntry> {
        self.entries.get(&number).copied()
    }

    /// Number of entries, free ones included.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Ids of every in-use entry in ascending order.
    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.entries.iter().filter_map(|(n, e)| match e {
            XRefEntry::Free => None,
            XRefEntry::InUse { generation, .. } => Some(ObjectId::new(*n, *generation)),
            XRefEntry::Compressed { .. } => Some(ObjectId::new(*n, 0)),
        })
    }

    /// True if the table was rebuilt by scanning the file body.
    pub fn was_recovered(&self) -> bool {
        self.recovered
    }

    /// Installs a decryptor for strings and streams. Objects already cached
    /// stay as they were read, so this must happen before the first
    /// resolution of anything but the `/Encrypt` dictionary.
    pub fn set_decryptor(&mut self, decryptor: Box<dyn ObjectDecryptor>) {
        self.decryptor = Some(decryptor);
    }

    pub fn is_encrypted(&self) -> bool {
        self.trailer.contains_key("Encrypt")
    }

    fn get_object_at(&self, id: ObjectId, depth: usize) -> Result<&Value> {
        let cell = self
            .cache
            .get(&id.number())
            .ok_or_else(|| PdfError::malformed(format!("object {id} is not in use")))?;
        if let Some(value) = cell.get() {
            return Ok(value);
        }
        let value = self.load_object(id, depth)?;
        debug!("resolved object {id}");
        Ok(cell.get_or_init(|| value))
    }

    fn load_object(&self, id: ObjectId, depth: usize) -> Result<Value> {
        if depth > self.options.max_resolve_depth {
            return Err(PdfError::malformed(format!(
                "nesting too deep while loading object {id}"
            )));
        }
        match self.entries.get(&id.number()) {
            None | Some(XRefEntry::Free) => Err(PdfError::malformed(format!(
                "object {id} is not in use"
            ))),
            Some(XRefEntry::InUse { offset, generation }) => {
                if *generation != id.generation() {
                    debug!("object {id} requested, table has generation {generation}");
                }
                let lengths = ScopedLengths { table: self, depth: depth + 1 };
                let mut parser = ObjectParser::at(&self.data, *offset);
                let (found, mut value) = parser.parse_indirect_object(&lengths)?;
                if found.number() != id.number() {
                    return Err(PdfError::malformed(format!(
                        "offset {offset} holds object {found}, expected {id}"
                    )));
                }
                if let Some(decryptor) = &self.decryptor {
                    if self.encrypt_ref != Some(found) {
                        decrypt_value(decryptor.as_ref(), found, &mut value);
                    }
                }
                Ok(value)
            }
            Some(XRefEntry::Compressed { stream, index }) => {
                let container = self.get_object_at(ObjectId::new(*stream, 0), depth + 1)?;
                load_from_object_stream(container, id.number(), *index)
            }
        }
    }
}

impl ObjectResolver for XRefTable {
    fn get_object(&self, id: ObjectId) -> Result<&Value> {
        self.get_object_at(id, 0)
    }

    fn resolve<'a>(&'a self, value: &'a Value) -> Result<&'a Value> {
        let mut current = value;
        for _ in 0..self.options.max_resolve_depth {
            match current {
                Value::Reference(id) => current = self.get_object(*id)?,
                other => return Ok(other),
            }
        }
        Err(PdfError::malformed("reference chain too long"))
    }
}

/// Resolves indirect `/Length` values while a stream is being parsed,
/// carrying the recursion depth so self-referencing lengths terminate.
struct ScopedLengths<'t> {
    table: &'t XRefTable,
    depth: usize,
}

impl LengthResolver for ScopedLengths<'_> {
    fn resolve_length(&self, id: ObjectId) -> Option<usize> {
        self.table
            .get_object_at(id, self.depth)
            .ok()
            .and_then(Value::as_number)
            .filter(|n| *n >= 0.0)
            .map(|n| n as usize)
    }
}

fn load_from_object_stream(container: &Value, number: u32, index: u32) -> Result<Value> {
    let stream = container
        .as_stream()
        .ok_or_else(|| PdfError::malformed(format!("object stream for {number} is not a stream")))?;
    let decoded = stream.decoded_data()?;
    let offsets = object_stream_offsets(stream.dict(), &decoded)?;

    let slot = offsets
        .get(index as usize)
        .filter(|(n, _)| *n == number)
        .or_else(|| offsets.iter().find(|(n, _)| *n == number))
        .ok_or_else(|| PdfError::malformed(format!("object {number} missing from object stream")))?;

    let mut parser = ObjectParser::at(&decoded, slot.1);
    Ok(parser.parse_value()?)
}

/// `(object number, absolute offset)` pairs from an object stream header.
fn object_stream_offsets(dict: &Dictionary, decoded: &[u8]) -> Result<Vec<(u32, usize)>> {
    let n = dict
        .get_i64("N")
        .ok_or_else(|| PdfError::malformed("object stream without /N"))?;
    let first = dict
        .get_i64("First")
        .ok_or_else(|| PdfError::malformed("object stream without /First"))?;

    let mut lexer = Lexer::new(decoded);
    // every header pair takes at least two bytes
    let mut pairs = Vec::with_capacity((n.max(0) as usize).min(decoded.len() / 2));
    for _ in 0..n {
        let (num, off) = match (lexer.next_token()?, lexer.next_token()?) {
            (Token::Integer(num), Token::Integer(off)) if num >= 0 && off >= 0 => (num, off),
            _ => return Err(PdfError::malformed("bad object stream header")),
        };
        let number = u32::try_from(num)
            .map_err(|_| PdfError::malformed(format!("object number {num} in object stream")))?;
        let offset = first
            .checked_add(off)
            .and_then(|o| usize::try_from(o).ok())
            .ok_or_else(|| PdfError::malformed("object stream offset overflows"))?;
        pairs.push((number, offset));
    }
    Ok(pairs)
}

fn find_startxref(data: &[u8]) -> Result<usize> {
    let tail_start = data.len().saturating_sub(1024);
    let pos = rfind_bytes(&data[tail_start..], b"startxref")
        .ok_or_else(|| PdfError::malformed("startxref not found"))?;
    let mut lexer = Lexer::at(data, tail_start + pos + b"startxref".len());
    match lexer.next_token()? {
        Token::Integer(offset) if offset >= 0 && (offset as usize) < data.len() => {
            Ok(offset as usize)
        }
        other => Err(PdfError::malformed(format!("bad startxref value {other:?}"))),
    }
}

/// Follows `startxref` and `/Prev` links. Sections nearer the end of the
/// file are newer and win over older ones.
fn read_xref_chain(data: &[u8]) -> Result<(BTreeMap<u32, XRefEntry>, Dictionary)> {
    let mut entries = BTreeMap::new();
    let mut trailer: Option<Dictionary> = None;
    let mut visited = HashSet::new();
    let mut next = Some(find_startxref(data)?);

    while let Some(offset) = next.take() {
        if !visited.insert(offset) {
            warn!("xref /Prev loop at offset {offset}");
            break;
        }
        let (section, section_trailer) = read_xref_section(data, offset)?;

        // Hybrid files: the /XRefStm stream describes compressed objects the
        // classic table lists as free, so it goes in first.
        if let Some(stm) = section_trailer.get_i64("XRefStm") {
            if stm >= 0 && visited.insert(stm as usize) {
                match read_xref_section(data, stm as usize) {
                    Ok((stm_entries, _)) => merge_older(&mut entries, stm_entries),
                    Err(e) => warn!("ignoring unreadable /XRefStm: {e}"),
                }
            }
        }
        merge_older(&mut entries, section);

        next = section_trailer
            .get_i64("Prev")
            .filter(|p| *p >= 0)
            .map(|p| p as usize);
        match trailer.as_mut() {
            None => trailer = Some(section_trailer),
            Some(t) => {
                for (k, v) in &section_trailer {
                    if !t.contains_key(k) {
                        t.set(k.clone(), v.clone());
                    }
                }
            }
        }
    }

    let mut trailer = trailer.ok_or_else(|| PdfError::malformed("no trailer"))?;
    trailer.remove("Prev");
    trailer.remove("XRefStm");
    Ok((entries, trailer))
}

fn merge_older(entries: &mut BTreeMap<u32, XRefEntry>, older: Vec<(u32, XRefEntry)>) {
    for (n, e) in older {
        entries.entry(n).or_insert(e);
    }
}

fn read_xref_section(data: &[u8], offset: usize) -> Result<(Vec<(u32, XRefEntry)>, Dictionary)> {
    let mut lexer = Lexer::at(data, offset);
    let first = lexer.next_token()?;
    if first.is_keyword("xref") {
        read_traditional_section(&mut lexer)
    } else {
        read_xref_stream(data, offset)
    }
}

fn read_traditional_section(lexer: &mut Lexer<'_>) -> Result<(Vec<(u32, XRefEntry)>, Dictionary)> {
    let mut entries = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::Keyword(k) if k == "trailer" => break,
            Token::Integer(start) if start >= 0 => {
                let count = match lexer.next_token()? {
                    Token::Integer(c) if c >= 0 => c,
                    other => {
                        return Err(PdfError::malformed(format!(
                            "bad xref subsection count {other:?}"
                        )))
                    }
                };
                for i in 0..count {
                    let number = (start + i) as u32;
                    entries.push((number, read_traditional_entry(lexer)?));
                }
            }
            other => {
                return Err(PdfError::malformed(format!(
                    "unexpected {other:?} in xref section"
                )))
            }
        }
    }
    let trailer = match ObjectParser::at(lexer.data(), lexer.position()).parse_value()? {
        Value::Dict(d) => d,
        other => return Err(PdfError::malformed(format!("trailer is a {}", other.kind()))),
    };
    Ok((entries, trailer))
}

fn read_traditional_entry(lexer: &mut Lexer<'_>) -> Result<XRefEntry> {
    let offset = lexer.next_token()?;
    let generation = lexer.next_token()?;
    let kind = lexer.next_token()?;
    match (offset, generation, kind) {
        (Token::Integer(offset), Token::Integer(gen), Token::Keyword(k)) => match k.as_str() {
            "n" if offset > 0 => Ok(XRefEntry::InUse {
                offset: offset as usize,
                generation: gen.clamp(0, u16::MAX as i64) as u16,
            }),
            "n" | "f" => Ok(XRefEntry::Free),
            _ => Err(PdfError::malformed(format!("bad xref entry type {k}"))),
        },
        other => Err(PdfError::malformed(format!("bad xref entry {other:?}"))),
    }
}

fn read_xref_stream(data: &[u8], offset: usize) -> Result<(Vec<(u32, XRefEntry)>, Dictionary)> {
    let (_, value) = ObjectParser::at(data, offset).parse_indirect_object(&NoLengths)?;
    let stream = match value {
        Value::Stream(s) if s.dict().is_type("XRef") => s,
        other => {
            return Err(PdfError::malformed(format!(
                "startxref points at a {}, not an xref stream",
                other.kind()
            )))
        }
    };
    let dict = stream.dict();
    let widths: Vec<usize> = dict
        .get_array("W")
        .ok_or_else(|| PdfError::malformed("xref stream without /W"))?
        .iter()
        .map(|v| v.as_i64().unwrap_or(0).max(0) as usize)
        .collect();
    if widths.len() != 3 {
        return Err(PdfError::malformed("xref stream /W must have 3 entries"));
    }
    if widths.iter().any(|w| *w > 8) {
        return Err(PdfError::malformed("xref stream field wider than 8 bytes"));
    }
    let size = dict.get_i64("Size").unwrap_or(0);
    let index: Vec<i64> = match dict.get_array("Index") {
        Some(items) => items.iter().filter_map(Value::as_i64).collect(),
        None => vec![0, size],
    };

    let decoded = stream.decoded_data()?;
    let row = widths.iter().sum::<usize>();
    let mut entries = Vec::new();
    let mut rows = decoded.chunks_exact(row.max(1));

    for pair in index.chunks(2) {
        let (start, count) = match pair {
            [s, c] => match (u32::try_from(*s), u32::try_from(*c)) {
                (Ok(s), Ok(c)) => (s, c),
                _ => return Err(PdfError::malformed("bad xref stream /Index")),
            },
            _ => return Err(PdfError::malformed("bad xref stream /Index")),
        };
        for i in 0..count {
            let Some(fields) = rows.next() else {
                warn!("xref stream shorter than its /Index");
                break;
            };
            let (f0, rest) = fields.split_at(widths[0]);
            let (f1, f2) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 { 1 } else { read_field(f0) };
            let entry = match kind {
                0 => XRefEntry::Free,
                1 => XRefEntry::InUse {
                    offset: read_field(f1) as usize,
                    generation: read_field(f2) as u16,
                },
                2 => XRefEntry::Compressed {
                    stream: read_field(f1) as u32,
                    index: read_field(f2) as u32,
                },
                // Unknown types are treated as null references.
                _ => XRefEntry::Free,
            };
            let number = start
                .checked_add(i)
                .ok_or_else(|| PdfError::malformed("xref stream /Index overflows"))?;
            entries.push((number, entry));
        }
    }

    let mut trailer = dict.clone();
    for key in ["W", "Index", "Filter", "DecodeParms", "Length", "Type"] {
        trailer.remove(key);
    }
    Ok((entries, trailer))
}

fn read_field(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| acc << 8 | b as u64)
}

/// Rebuilds the table from `n g obj` headers. Later definitions win.
fn scan_for_objects(data: &[u8]) -> Result<(BTreeMap<u32, XRefEntry>, Dictionary)> {
    let mut entries = BTreeMap::new();
    let mut object_streams = Vec::new();

    let mut pos = 0;
    while pos < data.len() {
        let at_line_start = pos == 0 || matches!(data[pos - 1], b'\n' | b'\r');
        if at_line_start && data[pos].is_ascii_digit() {
            if let Some((id, offset)) = looks_like_object_header(data, pos) {
                entries.insert(
                    id.number(),
                    XRefEntry::InUse {
                        offset,
                        generation: id.generation(),
                    },
                );
                if let Ok((_, Value::Stream(s))) =
                    ObjectParser::at(data, offset).parse_indirect_object(&NoLengths)
                {
                    if s.dict().is_type("ObjStm") {
                        object_streams.push((id.number(), s));
                    }
                }
            }
        }
        pos += 1;
    }

    for (container, stream) in object_streams {
        let Ok(decoded) = stream.decoded_data() else {
            continue;
        };
        let Ok(offsets) = object_stream_offsets(stream.dict(), &decoded) else {
            continue;
        };
        for (index, (number, _)) in offsets.into_iter().enumerate() {
            entries.entry(number).or_insert(XRefEntry::Compressed {
                stream: container,
                index: index as u32,
            });
        }
    }

    if entries.is_empty() {
        return Err(PdfError::malformed("no objects found while scanning"));
    }

    let mut trailer = rfind_bytes(data, b"trailer")
        .and_then(|p| ObjectParser::at(data, p + b"trailer".len()).parse_value().ok())
        .and_then(|v| match v {
            Value::Dict(d) => Some(d),
            _ => None,
        })
        .unwrap_or_default();

    if !trailer.contains_key("Root") {
        let catalog = entries.iter().find_map(|(n, e)| match e {
            XRefEntry::InUse { offset, generation } => {
                let (_, value) = ObjectParser::at(data, *offset)
                    .parse_indirect_object(&NoLengths)
                    .ok()?;
                value
                    .as_dict()
                    .filter(|d| d.is_type("Catalog"))
                    .map(|_| ObjectId::new(*n, *generation))
            }
            _ => None,
        });
        match catalog {
            Some(id) => trailer.set("Root", id),
            None => return Err(PdfError::malformed("no catalog found while scanning")),
        }
    }
    Ok((entries, trailer))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a file from object bodies with a correct classic xref.
    fn build_file(objects: &[&str]) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        out.extend_from_slice(b"0000000000 65535 f \n");
        for off in offsets {
            out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%%EOF\n",
                objects.len() + 1
            )
            .as_bytes(),
        );
        out
    }

    #[test]
    fn test_lazy_resolution_and_cache() {
        let data = build_file(&["<< /Type /Catalog /Pages 2 0 R >>", "<< /Type /Pages /Count 0 /Kids [] >>"]);
        let table = XRefTable::load(data, ParseOptions::default()).unwrap();
        assert!(!table.was_recovered());
        assert_eq!(table.entry_count(), 3);
        assert_eq!(table.entry(0), Some(XRefEntry::Free));

        let pages = ObjectId::new(2, 0);
        let first = table.get_object(pages).unwrap() as *const Value;
        let second = table.get_object(pages).unwrap() as *const Value;
        assert_eq!(first, second);
        assert!(table.get_object(pages).unwrap().as_dict().unwrap().is_type("Pages"));
    }

    #[test]
    fn test_free_and_unknown_entries_are_malformed() {
        let data = build_file(&["<< /Type /Catalog >>"]);
        let table = XRefTable::load(data, ParseOptions::default()).unwrap();
        for id in [ObjectId::new(0, 0), ObjectId::new(7, 0)] {
            assert!(matches!(
                table.get_object(id),
                Err(PdfError::MalformedDocument(_))
            ));
        }
    }

    #[test]
    fn test_indirect_stream_length() {
        let data = build_file(&[
            "<< /Type /Catalog >>",
            "<< /Length 3 0 R >>\nstream\nabcdef\nendstream",
            "6",
        ]);
        let table = XRefTable::load(data, ParseOptions::default()).unwrap();
        let value = table.get_object(ObjectId::new(2, 0)).unwrap();
        assert_eq!(value.as_stream().unwrap().data(), b"abcdef");
    }

    #[test]
    fn test_broken_xref_is_recovered_by_scan() {
        let mut data = build_file(&["<< /Type /Catalog /Pages 2 0 R >>", "(two)"]);
        // Point startxref somewhere useless.
        let pos = rfind_bytes(&data, b"startxref").unwrap();
        data.truncate(pos);
        data.extend_from_slice(b"startxref\n3\n%%EOF\n");

        let table = XRefTable::load(data.clone(), ParseOptions::default()).unwrap();
        assert!(table.was_recovered());
        assert_eq!(
            table.get_object(ObjectId::new(2, 0)).unwrap(),
            &Value::String(b"two".to_vec())
        );
        assert!(XRefTable::load(data, ParseOptions::strict()).is_err());
    }

    #[test]
    fn test_object_stream_header_parsed() {
        let dict = Dictionary::new().with("N", 2).with("First", 10);
        let offsets = object_stream_offsets(&dict, b"7 0 8 5   (a) (b)").unwrap();
        assert_eq!(offsets, vec![(7, 10), (8, 15)]);
    }

    #[test]
    fn test_object_stream_with_absurd_count_is_malformed() {
        let dict = Dictionary::new().with("N", 1i64 << 60).with("First", 4);
        let result = object_stream_offsets(&dict, b"1 0 ");
        assert!(matches!(result, Err(PdfError::MalformedDocument(_))));
    }

    #[test]
    fn test_object_stream_offset_overflow_is_malformed() {
        let dict = Dictionary::new().with("N", 1).with("First", i64::MAX);
        let result = object_stream_offsets(&dict, b"1 5 ");
        assert!(matches!(result, Err(PdfError::MalformedDocument(_))));
    }

    #[test]
    fn test_read_field_big_endian() {
        assert_eq!(read_field(&[0x01, 0x02]), 0x0102);
        assert_eq!(read_field(&[]), 0);
    }
}
