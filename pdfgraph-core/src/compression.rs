//! Flate compression for stream payloads.

use crate::error::{PdfError, Result};

/// Compress data using Flate/Zlib compression
#[cfg(feature = "compression")]
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| PdfError::CompressionError(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| PdfError::CompressionError(e.to_string()))
}

#[cfg(not(feature = "compression"))]
pub fn compress(_data: &[u8]) -> Result<Vec<u8>> {
    Err(PdfError::unsupported(
        "FlateDecode (built without the compression feature)",
    ))
}

/// Decompress data using Flate/Zlib decompression
#[cfg(feature = "compression")]
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    match decoder.read_to_end(&mut decompressed) {
        Ok(_) => Ok(decompressed),
        // Truncated streams are common; keep whatever inflated cleanly.
        Err(_) if !decompressed.is_empty() => Ok(decompressed),
        Err(e) => Err(PdfError::CompressionError(e.to_string())),
    }
}

#[cfg(not(feature = "compression"))]
pub fn decompress(_data: &[u8]) -> Result<Vec<u8>> {
    Err(PdfError::unsupported(
        "FlateDecode (built without the compression feature)",
    ))
}

/// Compresses `data` when it is longer than `threshold` and the deflated
/// form is strictly smaller. Returns `None` to keep the raw bytes.
pub fn compress_if_smaller(data: &[u8], threshold: usize) -> Option<Vec<u8>> {
    if data.len() <= threshold {
        return None;
    }
    match compress(data) {
        Ok(compressed) if compressed.len() < data.len() => Some(compressed),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("stream left uncompressed: {e}");
            None
        }
    }
}
