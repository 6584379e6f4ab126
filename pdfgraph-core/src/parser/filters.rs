//! PDF Stream Filters
//!
//! Decodes stream payloads according to ISO 32000-1 Section 7.4. Image
//! codecs (DCT, CCITT, JBIG2, JPX) are left to the host: their data is
//! reported as unsupported here and passed through by image consumers.

use crate::compression;
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Value};

/// Supported PDF filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    ASCIIHexDecode,
    ASCII85Decode,
    LZWDecode,
    FlateDecode,
    RunLengthDecode,
    CCITTFaxDecode,
    JBIG2Decode,
    DCTDecode,
    JPXDecode,
    Crypt,
}

impl Filter {
    /// Parse filter from name, accepting the inline-image abbreviations.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "LZWDecode" | "LZW" => Some(Filter::LZWDecode),
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "RunLengthDecode" | "RL" => Some(Filter::RunLengthDecode),
            "CCITTFaxDecode" | "CCF" => Some(Filter::CCITTFaxDecode),
            "JBIG2Decode" => Some(Filter::JBIG2Decode),
            "DCTDecode" | "DCT" => Some(Filter::DCTDecode),
            "JPXDecode" => Some(Filter::JPXDecode),
            "Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }

    /// Image codecs whose output is pixels rather than bytes.
    pub fn is_image_codec(&self) -> bool {
        matches!(
            self,
            Filter::DCTDecode | Filter::JPXDecode | Filter::CCITTFaxDecode | Filter::JBIG2Decode
        )
    }
}

/// Filter names of a stream dictionary, in application order.
pub fn filter_chain(dict: &Dictionary) -> Result<Vec<Filter>> {
    let names: Vec<&str> = match dict.get("Filter") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Name(name)) => vec![name.as_str()],
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_name()
                    .ok_or_else(|| PdfError::malformed("Invalid filter in array"))
            })
            .collect::<Result<_>>()?,
        Some(other) => {
            return Err(PdfError::malformed(format!(
                "Invalid Filter type: {}",
                other.kind()
            )))
        }
    };
    names
        .into_iter()
        .map(|n| Filter::from_name(n).ok_or_else(|| PdfError::unsupported(format!("filter {n}"))))
        .collect()
}

fn decode_parms(dict: &Dictionary, index: usize) -> Option<&Dictionary> {
    match dict.get("DecodeParms") {
        Some(Value::Dict(d)) if index == 0 => Some(d),
        Some(Value::Array(items)) => items.get(index).and_then(|v| match v {
            Value::Dict(d) => Some(d),
            _ => None,
        }),
        _ => None,
    }
}

/// Decode stream data according to specified filters
pub fn decode_stream(data: &[u8], dict: &Dictionary) -> Result<Vec<u8>> {
    let chain = filter_chain(dict)?;
    let mut result = data.to_vec();
    for (i, filter) in chain.into_iter().enumerate() {
        result = apply_filter(&result, filter, decode_parms(dict, i))?;
    }
    Ok(result)
}

/// Applies the byte-level filters of an image stream and stops at the first
/// image codec. Returns the partially decoded data and the filters still
/// to be applied by the image decoder.
pub fn decode_image_stream(data: &[u8], dict: &Dictionary) -> Result<(Vec<u8>, Vec<Filter>)> {
    let chain = filter_chain(dict)?;
    let mut result = data.to_vec();
    for (i, filter) in chain.iter().enumerate() {
        if filter.is_image_codec() {
            return Ok((result, chain[i..].to_vec()));
        }
        result = apply_filter(&result, *filter, decode_parms(dict, i))?;
    }
    Ok((result, Vec::new()))
}

/// Apply a single filter to data
pub fn apply_filter(data: &[u8], filter: Filter, parms: Option<&Dictionary>) -> Result<Vec<u8>> {
    match filter {
        Filter::FlateDecode => {
            let inflated = compression::decompress(data)?;
            match parms {
                Some(p) => apply_predictor(inflated, p),
                None => Ok(inflated),
            }
        }
        Filter::ASCIIHexDecode => decode_ascii_hex(data),
        Filter::ASCII85Decode => decode_ascii85(data),
        Filter::RunLengthDecode => Ok(decode_run_length(data)),
        other => Err(PdfError::unsupported(format!("filter {other:?}"))),
    }
}

/// Undo PNG row predictors (`/Predictor` 10..15).
fn apply_predictor(data: Vec<u8>, parms: &Dictionary) -> Result<Vec<u8>> {
    let predictor = parms.get_i64("Predictor").unwrap_or(1);
    if predictor < 10 {
        if predictor == 2 {
            return Err(PdfError::unsupported("TIFF predictor"));
        }
        return Ok(data);
    }
    let colors = parms.get_i64("Colors").unwrap_or(1).max(1) as usize;
    let bpc = parms.get_i64("BitsPerComponent").unwrap_or(8).max(1) as usize;
    let columns = parms.get_i64("Columns").unwrap_or(1).max(1) as usize;
    let bits_per_pixel = colors
        .checked_mul(bpc)
        .ok_or_else(|| PdfError::malformed("predictor bits per pixel overflow"))?;
    let bpp = bits_per_pixel.div_ceil(8);
    let row_len = bits_per_pixel
        .checked_mul(columns)
        .ok_or_else(|| PdfError::malformed("predictor row length overflows"))?
        .div_ceil(8)
        // a row can never be longer than the data that carries it
        .min(data.len());

    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];
    for chunk in data.chunks(row_len + 1) {
        let (kind, row) = match chunk.split_first() {
            Some((k, r)) => (*k, r),
            None => break,
        };
        let mut cur = row.to_vec();
        cur.resize(row_len, 0);
        for i in 0..row_len {
            let left = if i >= bpp { cur[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            cur[i] = match kind {
                0 => cur[i],
                1 => cur[i].wrapping_add(left),
                2 => cur[i].wrapping_add(up),
                3 => cur[i].wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => cur[i].wrapping_add(paeth(left, up, up_left)),
                other => {
                    return Err(PdfError::malformed(format!("PNG row filter {other}")));
                }
            };
        }
        out.extend_from_slice(&cur[..row.len().min(row_len)]);
        prev = cur;
    }
    Ok(out)
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = a as i16 + b as i16 - c as i16;
    let pa = (p - a as i16).abs();
    let pb = (p - b as i16).abs();
    let pc = (p - c as i16).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Decode ASCIIHexDecode data
pub fn decode_ascii_hex(data: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::new();
    let mut pending: Option<u8> = None;

    for &ch in data {
        if ch == b'>' {
            break;
        }
        if ch.is_ascii_whitespace() {
            continue;
        }
        let v = hex_digit_value(ch)
            .ok_or_else(|| PdfError::malformed(format!("Invalid hex digit: {}", ch as char)))?;
        match pending.take() {
            Some(high) => result.push(high << 4 | v),
            None => pending = Some(v),
        }
    }
    // Odd number of digits: pad with 0
    if let Some(high) = pending {
        result.push(high << 4);
    }
    Ok(result)
}

fn hex_digit_value(ch: u8) -> Option<u8> {
    match ch {
        b'0'..=b'9' => Some(ch - b'0'),
        b'A'..=b'F' => Some(ch - b'A' + 10),
        b'a'..=b'f' => Some(ch - b'a' + 10),
        _ => None,
    }
}

/// Decode ASCII85Decode data
pub fn decode_ascii85(data: &[u8]) -> Result<Vec<u8>> {
    let mut body: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if body.starts_with(b"<~") {
        body.drain(..2);
    }
    if let Some(end) = body.windows(2).position(|w| w == b"~>") {
        body.truncate(end);
    } else if body.last() == Some(&b'~') {
        body.pop();
    }

    let mut result = Vec::with_capacity(body.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut len = 0;

    for &c in &body {
        match c {
            b'z' if len == 0 => result.extend_from_slice(&[0, 0, 0, 0]),
            b'!'..=b'u' => {
                group[len] = c - b'!';
                len += 1;
                if len == 5 {
                    result.extend_from_slice(&ascii85_group(&group)?);
                    len = 0;
                }
            }
            _ => {
                return Err(PdfError::malformed(format!(
                    "Invalid ASCII85 character: {}",
                    c as char
                )));
            }
        }
    }

    if len == 1 {
        return Err(PdfError::malformed("ASCII85 final group of one character"));
    }
    if len > 1 {
        // Pad with 'u' and keep only the bytes that were actually encoded.
        for slot in group.iter_mut().skip(len) {
            *slot = b'u' - b'!';
        }
        let bytes = ascii85_group(&group)?;
        result.extend_from_slice(&bytes[..len - 1]);
    }

    Ok(result)
}

fn ascii85_group(group: &[u8; 5]) -> Result<[u8; 4]> {
    let value = group
        .iter()
        .fold(0u64, |acc, &d| acc * 85 + d as u64);
    if value > u32::MAX as u64 {
        return Err(PdfError::malformed("ASCII85 group overflow"));
    }
    Ok((value as u32).to_be_bytes())
}

/// Decode RunLengthDecode data
pub fn decode_run_length(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2);
    let mut i = 0;
    while i < data.len() {
        let len = data[i];
        i += 1;
        match len {
            128 => break,
            0..=127 => {
                let end = (i + len as usize + 1).min(data.len());
                out.extend_from_slice(&data[i..end]);
                i = end;
            }
            _ => {
                if let Some(&b) = data.get(i) {
                    out.extend(std::iter::repeat(b).take(257 - len as usize));
                }
                i += 1;
            }
        }
    }
    out
}
