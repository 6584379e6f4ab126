use std::fmt;

use thiserror::Error;

/// Resource dictionary category a lookup was made in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceCategory {
    Font,
    XObject,
    ExtGState,
    ColorSpace,
    Pattern,
    Shading,
    Properties,
}

impl ResourceCategory {
    /// Key of the sub-dictionary inside a `/Resources` dictionary.
    pub fn key(&self) -> &'static str {
        match self {
            ResourceCategory::Font => "Font",
            ResourceCategory::XObject => "XObject",
            ResourceCategory::ExtGState => "ExtGState",
            ResourceCategory::ColorSpace => "ColorSpace",
            ResourceCategory::Pattern => "Pattern",
            ResourceCategory::Shading => "Shading",
            ResourceCategory::Properties => "Properties",
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed document: {0}")]
    MalformedDocument(String),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Resource not found: /{category} /{name}")]
    ResourceNotFound {
        category: ResourceCategory,
        name: String,
    },

    #[error("Compression error: {0}")]
    CompressionError(String),
}

impl PdfError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        PdfError::MalformedDocument(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        PdfError::UnsupportedFeature(msg.into())
    }

    pub fn missing(category: ResourceCategory, name: impl Into<String>) -> Self {
        PdfError::ResourceNotFound {
            category,
            name: name.into(),
        }
    }

    /// Fatal errors abort the whole top-level operation; everything else can
    /// be isolated to the operator or object that raised it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PdfError::EncodingError(_) | PdfError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_pdf_error_display() {
        let error = PdfError::MalformedDocument("bad xref".to_string());
        assert_eq!(error.to_string(), "Malformed document: bad xref");

        let error = PdfError::UnsupportedFeature("shading".to_string());
        assert_eq!(error.to_string(), "Unsupported feature: shading");
    }

    #[test]
    fn test_resource_not_found_display() {
        let error = PdfError::missing(ResourceCategory::XObject, "Im1");
        assert_eq!(error.to_string(), "Resource not found: /XObject /Im1");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = IoError::new(ErrorKind::NotFound, "file not found");
        let pdf_error: PdfError = io_error.into();

        match pdf_error {
            PdfError::Io(ref err) => assert_eq!(err.kind(), ErrorKind::NotFound),
            _ => panic!("Expected IO error variant"),
        }
        assert!(pdf_error.is_fatal());
    }

    #[test]
    fn test_fatality() {
        assert!(PdfError::EncodingError("header".into()).is_fatal());
        assert!(!PdfError::malformed("x").is_fatal());
        assert!(!PdfError::unsupported("x").is_fatal());
        assert!(!PdfError::missing(ResourceCategory::Font, "F1").is_fatal());
    }

    #[test]
    fn test_result_type_alias() {
        fn parse_number(s: &str) -> Result<i32> {
            s.parse()
                .map_err(|_| PdfError::malformed(format!("not a number: {s}")))
        }

        assert_eq!(parse_number("42").unwrap(), 42);
        assert!(parse_number("x").is_err());
    }
}
