//! Standard security handler (ISO 32000-1 7.6.3), RC4 revisions 2 and 3.

use super::rc4::rc4;
use super::{Encryptor, ObjectDecryptor, Permissions};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, ObjectId, Value};

/// Padding used in password processing
const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

fn md5(data: &[u8]) -> [u8; 16] {
    md5::compute(data).0
}

/// Pad or truncate password to 32 bytes
fn pad_password(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let len = password.len().min(32);
    padded[..len].copy_from_slice(&password[..len]);
    padded[len..].copy_from_slice(&PADDING[..32 - len]);
    padded
}

/// RC4 password-based encryption for one document.
#[derive(Debug, Clone)]
pub struct StandardSecurityHandler {
    revision: u8,
    key: Vec<u8>,
    owner_hash: Vec<u8>,
    user_hash: Vec<u8>,
    permissions: Permissions,
    object_key: Vec<u8>,
}

impl StandardSecurityHandler {
    /// 128-bit revision 3 handler for writing. `file_id` is the first
    /// element of the trailer `/ID`.
    pub fn new(
        owner_password: &str,
        user_password: &str,
        permissions: Permissions,
        file_id: &[u8],
    ) -> Self {
        let revision = 3;
        let key_length = 16;
        let owner_password = if owner_password.is_empty() {
            user_password
        } else {
            owner_password
        };
        let owner_hash = compute_owner_hash(
            owner_password.as_bytes(),
            user_password.as_bytes(),
            revision,
            key_length,
        );
        let key = compute_encryption_key(
            user_password.as_bytes(),
            &owner_hash,
            permissions.p_value(),
            file_id,
            revision,
            key_length,
        );
        let user_hash = compute_user_hash(&key, file_id, revision);
        Self {
            revision,
            key,
            owner_hash,
            user_hash,
            permissions,
            object_key: Vec::new(),
        }
    }

    /// Opens an existing `/Encrypt` dictionary with `user_password`.
    pub fn from_encrypt_dict(
        dict: &Dictionary,
        file_id: &[u8],
        user_password: &[u8],
    ) -> Result<Self> {
        if dict.get_name("Filter") != Some("Standard") {
            return Err(PdfError::unsupported(format!(
                "security handler {}",
                dict.get_name("Filter").unwrap_or("(none)")
            )));
        }
        let revision = dict.get_i64("R").unwrap_or(2) as u8;
        let version = dict.get_i64("V").unwrap_or(0);
        if !(2..=3).contains(&revision) || version > 2 {
            return Err(PdfError::unsupported(format!(
                "standard security handler V{version} R{revision}"
            )));
        }
        let key_length = if revision == 2 {
            5
        } else {
            (dict.get_i64("Length").unwrap_or(40) / 8).clamp(5, 16) as usize
        };
        let owner_hash = dict
            .get("O")
            .and_then(Value::as_bytes)
            .ok_or_else(|| PdfError::malformed("encryption dictionary without /O"))?
            .to_vec();
        let user_hash = dict
            .get("U")
            .and_then(Value::as_bytes)
            .ok_or_else(|| PdfError::malformed("encryption dictionary without /U"))?
            .to_vec();
        let p = dict
            .get_i64("P")
            .ok_or_else(|| PdfError::malformed("encryption dictionary without /P"))?
            as i32;

        let key = compute_encryption_key(user_password, &owner_hash, p, file_id, revision, key_length);
        let expected = compute_user_hash(&key, file_id, revision);
        let compared = if revision == 2 { 32 } else { 16 };
        if user_hash.len() < compared || expected[..compared] != user_hash[..compared] {
            return Err(PdfError::unsupported("document requires a user password"));
        }

        Ok(Self {
            revision,
            key,
            owner_hash,
            user_hash,
            permissions: Permissions::from_p_value(p),
            object_key: Vec::new(),
        })
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// Per-object key: MD5 of the file key, the low three bytes of the
    /// object number and the low two bytes of the generation.
    fn compute_object_key(&self, number: u32, generation: u16) -> Vec<u8> {
        let mut data = self.key.clone();
        data.extend_from_slice(&number.to_le_bytes()[..3]);
        data.extend_from_slice(&generation.to_le_bytes());
        let hash = md5(&data);
        hash[..(self.key.len() + 5).min(16)].to_vec()
    }
}

fn compute_owner_hash(owner: &[u8], user: &[u8], revision: u8, key_length: usize) -> Vec<u8> {
    let mut hash = md5(&pad_password(owner));
    if revision >= 3 {
        for _ in 0..50 {
            hash = md5(&hash[..key_length]);
        }
    }
    let key = &hash[..key_length];
    let mut result = rc4(key, &pad_password(user));
    if revision >= 3 {
        for i in 1..=19u8 {
            let round_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
            result = rc4(&round_key, &result);
        }
    }
    result
}

fn compute_encryption_key(
    user: &[u8],
    owner_hash: &[u8],
    p: i32,
    file_id: &[u8],
    revision: u8,
    key_length: usize,
) -> Vec<u8> {
    let mut data = pad_password(user).to_vec();
    data.extend_from_slice(owner_hash);
    data.extend_from_slice(&p.to_le_bytes());
    data.extend_from_slice(file_id);
    let mut hash = md5(&data);
    if revision >= 3 {
        for _ in 0..50 {
            hash = md5(&hash[..key_length]);
        }
    }
    hash[..key_length].to_vec()
}

fn compute_user_hash(key: &[u8], file_id: &[u8], revision: u8) -> Vec<u8> {
    if revision == 2 {
        return rc4(key, &PADDING);
    }
    let mut data = PADDING.to_vec();
    data.extend_from_slice(file_id);
    let mut result = rc4(key, &md5(&data));
    for i in 1..=19u8 {
        let round_key: Vec<u8> = key.iter().map(|b| b ^ i).collect();
        result = rc4(&round_key, &result);
    }
    // 16 bytes of hash followed by 16 arbitrary bytes
    result.extend_from_slice(&PADDING[..16]);
    result
}

impl Encryptor for StandardSecurityHandler {
    fn start_object(&mut self, number: u32, generation: u16) {
        self.object_key = self.compute_object_key(number, generation);
    }

    fn encrypt_string(&mut self, data: &[u8]) -> Vec<u8> {
        rc4(&self.object_key, data)
    }

    fn encrypt_stream_bytes(&mut self, data: &[u8]) -> Vec<u8> {
        rc4(&self.object_key, data)
    }

    fn encryption_dict(&self) -> Dictionary {
        Dictionary::new()
            .with("Filter", Value::name("Standard"))
            .with("V", if self.revision >= 3 { 2 } else { 1 })
            .with("R", self.revision as i64)
            .with("Length", (self.key.len() * 8) as i64)
            .with("O", Value::String(self.owner_hash.clone()))
            .with("U", Value::String(self.user_hash.clone()))
            .with("P", self.permissions.p_value() as i64)
    }
}

impl ObjectDecryptor for StandardSecurityHandler {
    fn decrypt(&self, id: ObjectId, data: &[u8]) -> Vec<u8> {
        rc4(&self.compute_object_key(id.number(), id.generation()), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE_ID: &[u8] = b"0123456789abcdef";

    #[test]
    fn test_pad_password() {
        let padded = pad_password(b"test");
        assert_eq!(&padded[..4], b"test");
        assert_eq!(&padded[4..8], &PADDING[..4]);
        assert_eq!(pad_password(&[b'x'; 40]), [b'x'; 32]);
    }

    #[test]
    fn test_encryption_dict_entries() {
        let handler = StandardSecurityHandler::new("owner", "", Permissions::PRINT, FILE_ID);
        let dict = handler.encryption_dict();
        assert_eq!(dict.get_name("Filter"), Some("Standard"));
        assert_eq!(dict.get_i64("R"), Some(3));
        assert_eq!(dict.get_i64("Length"), Some(128));
        assert_eq!(dict.get("O").and_then(Value::as_bytes).map(<[u8]>::len), Some(32));
        assert_eq!(dict.get("U").and_then(Value::as_bytes).map(<[u8]>::len), Some(32));
    }

    #[test]
    fn test_reader_opens_writer_output() {
        let mut writer = StandardSecurityHandler::new("owner", "", Permissions::all(), FILE_ID);
        writer.start_object(4, 0);
        let cipher = writer.encrypt_stream_bytes(b"0 0 m 10 10 l S");

        let reader =
            StandardSecurityHandler::from_encrypt_dict(&writer.encryption_dict(), FILE_ID, b"")
                .unwrap();
        assert_eq!(
            reader.decrypt(ObjectId::new(4, 0), &cipher),
            b"0 0 m 10 10 l S"
        );
        // A different object key does not decrypt.
        assert_ne!(
            reader.decrypt(ObjectId::new(5, 0), &cipher),
            b"0 0 m 10 10 l S"
        );
    }

    #[test]
    fn test_wrong_user_password_rejected() {
        let writer = StandardSecurityHandler::new("owner", "user", Permissions::all(), FILE_ID);
        let result =
            StandardSecurityHandler::from_encrypt_dict(&writer.encryption_dict(), FILE_ID, b"");
        assert!(matches!(result, Err(PdfError::UnsupportedFeature(_))));
        assert!(
            StandardSecurityHandler::from_encrypt_dict(&writer.encryption_dict(), FILE_ID, b"user")
                .is_ok()
        );
    }

    #[test]
    fn test_object_key_length() {
        let handler = StandardSecurityHandler::new("o", "", Permissions::all(), FILE_ID);
        assert_eq!(handler.compute_object_key(1, 0).len(), 16);
    }
}
