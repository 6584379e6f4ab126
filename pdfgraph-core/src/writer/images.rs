//! Image XObjects for the writer.

use tracing::debug;

use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Stream, Value};

/// Sample layout of a raw image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawColor {
    Gray,
    Rgb,
}

impl RawColor {
    fn components(self) -> usize {
        match self {
            RawColor::Gray => 1,
            RawColor::Rgb => 3,
        }
    }

    fn space(self) -> &'static str {
        match self {
            RawColor::Gray => "DeviceGray",
            RawColor::Rgb => "DeviceRGB",
        }
    }
}

/// Image data handed to the writer.
#[derive(Debug, Clone)]
pub enum ImageInput {
    /// 8-bit samples, row by row, with an optional 8-bit alpha channel.
    Raw {
        width: u32,
        height: u32,
        color: RawColor,
        samples: Vec<u8>,
        alpha: Option<Vec<u8>>,
    },
    /// A baseline or progressive JPEG file, embedded as is.
    Jpeg(Vec<u8>),
}

impl ImageInput {
    /// Content digest used to share identical images between pages.
    pub(crate) fn digest(&self) -> [u8; 16] {
        let mut ctx = md5::Context::new();
        match self {
            ImageInput::Raw {
                width,
                height,
                color,
                samples,
                alpha,
            } => {
                ctx.consume(b"raw");
                ctx.consume(width.to_le_bytes());
                ctx.consume(height.to_le_bytes());
                ctx.consume([color.components() as u8]);
                ctx.consume(samples);
                if let Some(alpha) = alpha {
                    ctx.consume(b"alpha");
                    ctx.consume(alpha);
                }
            }
            ImageInput::Jpeg(data) => {
                ctx.consume(b"jpeg");
                ctx.consume(data);
            }
        }
        ctx.finalize().0
    }
}

/// An image ready to be written: the image stream and, for translucent
/// raw images, its soft mask.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    pub width: u32,
    pub height: u32,
    pub stream: Stream,
    pub smask: Option<Stream>,
}

impl ImageXObject {
    pub fn from_input(input: ImageInput) -> Result<Self> {
        match input {
            ImageInput::Raw {
                width,
                height,
                color,
                samples,
                alpha,
            } => Self::from_raw(width, height, color, samples, alpha),
            ImageInput::Jpeg(data) => Self::from_jpeg(data),
        }
    }

    fn from_raw(
        width: u32,
        height: u32,
        color: RawColor,
        samples: Vec<u8>,
        alpha: Option<Vec<u8>>,
    ) -> Result<Self> {
        let pixels = width as usize * height as usize;
        if pixels == 0 {
            return Err(PdfError::malformed("image has no pixels"));
        }
        if samples.len() != pixels * color.components() {
            return Err(PdfError::malformed(format!(
                "{width}x{height} {:?} image needs {} bytes, got {}",
                color,
                pixels * color.components(),
                samples.len()
            )));
        }
        let smask = match alpha {
            Some(alpha) if alpha.len() != pixels => {
                return Err(PdfError::malformed(format!(
                    "alpha channel has {} bytes for {pixels} pixels",
                    alpha.len()
                )));
            }
            // A fully opaque channel is dropped.
            Some(alpha) if alpha.iter().any(|a| *a != 255) => {
                Some(Stream::new(image_dict(width, height, "DeviceGray"), alpha))
            }
            _ => None,
        };
        Ok(Self {
            width,
            height,
            stream: Stream::new(image_dict(width, height, color.space()), samples),
            smask,
        })
    }

    fn from_jpeg(data: Vec<u8>) -> Result<Self> {
        let (width, height, components) = jpeg_dimensions(&data)?;
        let space = match components {
            1 => "DeviceGray",
            3 => "DeviceRGB",
            4 => "DeviceCMYK",
            n => return Err(PdfError::unsupported(format!("JPEG with {n} components"))),
        };
        let mut dict = image_dict(width, height, space).with("Filter", Value::name("DCTDecode"));
        if components == 4 {
            // Adobe writes CMYK JPEGs inverted.
            dict.set("Decode", Value::Array([1, 0, 1, 0, 1, 0, 1, 0].map(Value::from).to_vec()));
        }
        debug!("embedding {width}x{height} JPEG, {components} components");
        Ok(Self {
            width,
            height,
            stream: Stream::new(dict, data),
            smask: None,
        })
    }
}

fn image_dict(width: u32, height: u32, space: &str) -> Dictionary {
    Dictionary::new()
        .with("Type", Value::name("XObject"))
        .with("Subtype", Value::name("Image"))
        .with("Width", width)
        .with("Height", height)
        .with("ColorSpace", Value::name(space))
        .with("BitsPerComponent", 8)
}

/// Reads width, height and component count from the first SOF marker.
pub fn jpeg_dimensions(data: &[u8]) -> Result<(u32, u32, u8)> {
    if data.len() < 4 || data[0] != 0xFF || data[1] != 0xD8 {
        return Err(PdfError::malformed("not a JPEG file"));
    }
    let mut pos = 2;
    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            return Err(PdfError::malformed(format!("bad JPEG marker at {pos}")));
        }
        let marker = data[pos + 1];
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        let is_sof = (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
        if is_sof {
            let sof = data
                .get(pos + 4..pos + 10)
                .ok_or_else(|| PdfError::malformed("truncated JPEG frame header"))?;
            let height = u16::from_be_bytes([sof[1], sof[2]]) as u32;
            let width = u16::from_be_bytes([sof[3], sof[4]]) as u32;
            return Ok((width, height, sof[5]));
        }
        pos += 2 + length;
    }
    Err(PdfError::malformed("JPEG without a frame header"))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// SOI, an APP0 stub and a baseline SOF0 for a 3x2 RGB frame.
    fn tiny_jpeg(components: u8) -> Vec<u8> {
        let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, 0x00, 0x00];
        data.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x00, 0x02, 0x00, 0x03, components]);
        data.extend_from_slice(&[0u8; 9]);
        data.extend_from_slice(&[0xFF, 0xD9]);
        data
    }

    #[test]
    fn test_jpeg_dimensions() {
        assert_eq!(jpeg_dimensions(&tiny_jpeg(3)).unwrap(), (3, 2, 3));
        assert!(jpeg_dimensions(b"GIF89a").is_err());
    }

    #[test]
    fn test_cmyk_jpeg_decode_inverted() {
        let image = ImageXObject::from_input(ImageInput::Jpeg(tiny_jpeg(4))).unwrap();
        let dict = image.stream.dict();
        assert_eq!(dict.get_name("ColorSpace"), Some("DeviceCMYK"));
        assert_eq!(dict.get_name("Filter"), Some("DCTDecode"));
        assert_eq!(dict.get_array("Decode").map(Vec::len), Some(8));
    }

    #[test]
    fn test_opaque_alpha_dropped() {
        let image = ImageXObject::from_input(ImageInput::Raw {
            width: 2,
            height: 1,
            color: RawColor::Gray,
            samples: vec![0, 255],
            alpha: Some(vec![255, 255]),
        })
        .unwrap();
        assert!(image.smask.is_none());

        let image = ImageXObject::from_input(ImageInput::Raw {
            width: 2,
            height: 1,
            color: RawColor::Gray,
            samples: vec![0, 255],
            alpha: Some(vec![255, 0]),
        })
        .unwrap();
        assert_eq!(image.smask.unwrap().data(), &[255, 0]);
    }

    #[test]
    fn test_sample_count_checked() {
        let result = ImageXObject::from_input(ImageInput::Raw {
            width: 2,
            height: 2,
            color: RawColor::Rgb,
            samples: vec![0; 5],
            alpha: None,
        });
        assert!(matches!(result, Err(PdfError::MalformedDocument(_))));
    }

    #[test]
    fn test_digest_distinguishes_dimensions() {
        let a = ImageInput::Raw {
            width: 2,
            height: 1,
            color: RawColor::Gray,
            samples: vec![1, 2],
            alpha: None,
        };
        let b = ImageInput::Raw {
            width: 1,
            height: 2,
            color: RawColor::Gray,
            samples: vec![1, 2],
            alpha: None,
        };
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest(), a.clone().digest());
    }
}
