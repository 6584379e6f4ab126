//! Writer configuration.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::encryption::Permissions;

/// A `%PDF-major.minor` header version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    pub const V1_2: PdfVersion = PdfVersion::new(1, 2);
    pub const V1_3: PdfVersion = PdfVersion::new(1, 3);
    pub const V1_4: PdfVersion = PdfVersion::new(1, 4);

    pub const fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }
}

impl Default for PdfVersion {
    fn default() -> Self {
        Self::V1_2
    }
}

impl fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Passwords and permissions for the standard security handler.
#[derive(Debug, Clone, PartialEq)]
pub struct EncryptionSettings {
    pub owner_password: String,
    pub user_password: String,
    pub permissions: Permissions,
}

impl EncryptionSettings {
    pub fn new(owner_password: impl Into<String>, user_password: impl Into<String>) -> Self {
        Self {
            owner_password: owner_password.into(),
            user_password: user_password.into(),
            permissions: Permissions::default(),
        }
    }

    pub fn with_permissions(mut self, permissions: Permissions) -> Self {
        self.permissions = permissions;
        self
    }
}

#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Deflate streams that have no filter of their own.
    pub compress: bool,
    /// Streams at or below this many bytes are never compressed.
    pub compression_threshold: usize,
    /// Starting header version; features used while building may raise it.
    pub version: PdfVersion,
    pub author: String,
    pub creator: String,
    pub producer: String,
    pub title: Option<String>,
    /// Fixed `/CreationDate` for reproducible output. `None` means now.
    pub creation_date: Option<DateTime<Utc>>,
    pub encryption: Option<EncryptionSettings>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compress: true,
            compression_threshold: 64,
            version: PdfVersion::default(),
            author: "pdfgraph".to_string(),
            creator: "pdfgraph".to_string(),
            producer: format!("pdfgraph {}", env!("CARGO_PKG_VERSION")),
            title: None,
            creation_date: None,
            encryption: None,
        }
    }
}

impl WriterConfig {
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_compression_threshold(mut self, threshold: usize) -> Self {
        self.compression_threshold = threshold;
        self
    }

    pub fn with_version(mut self, version: PdfVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator = creator.into();
        self
    }

    pub fn with_producer(mut self, producer: impl Into<String>) -> Self {
        self.producer = producer.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_creation_date(mut self, date: DateTime<Utc>) -> Self {
        self.creation_date = Some(date);
        self
    }

    pub fn with_encryption(mut self, settings: EncryptionSettings) -> Self {
        self.encryption = Some(settings);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_ordering_and_display() {
        assert!(PdfVersion::V1_4 > PdfVersion::V1_2);
        assert_eq!(PdfVersion::V1_3.to_string(), "1.3");
        assert_eq!(PdfVersion::new(1, 10).to_string(), "1.10");
    }

    #[test]
    fn test_defaults() {
        let config = WriterConfig::default();
        assert!(config.compress);
        assert_eq!(config.compression_threshold, 64);
        assert_eq!(config.version, PdfVersion::V1_2);
        assert_eq!(config.author, "pdfgraph");
        assert!(config.encryption.is_none());
    }
}
