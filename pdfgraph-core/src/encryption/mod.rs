//! PDF encryption support
//!
//! The writer talks to an [`Encryptor`]: it primes the per-object key with
//! `start_object` before any string or stream of that object is encrypted.
//! The reader talks to an [`ObjectDecryptor`], which needs no mutable state
//! so a shared xref table can decrypt lazily.

mod permissions;
mod rc4;
mod standard_security;

pub use permissions::Permissions;
pub use rc4::{rc4, Rc4};
pub use standard_security::StandardSecurityHandler;

use crate::objects::{Dictionary, ObjectId, Value};

/// Write-side encryption codec.
pub trait Encryptor {
    /// Selects the key for the object about to be written.
    fn start_object(&mut self, number: u32, generation: u16);
    fn encrypt_string(&mut self, data: &[u8]) -> Vec<u8>;
    fn encrypt_stream_bytes(&mut self, data: &[u8]) -> Vec<u8>;
    /// Value of the trailer's `/Encrypt` entry.
    fn encryption_dict(&self) -> Dictionary;
}

/// Read-side decryption of strings and stream payloads.
pub trait ObjectDecryptor: Send + Sync {
    fn decrypt(&self, id: ObjectId, data: &[u8]) -> Vec<u8>;
}

/// Decrypts every string and stream payload inside `value` in place.
pub fn decrypt_value(decryptor: &dyn ObjectDecryptor, id: ObjectId, value: &mut Value) {
    match value {
        Value::String(bytes) => *bytes = decryptor.decrypt(id, bytes),
        Value::Array(items) => {
            for item in items {
                decrypt_value(decryptor, id, item);
            }
        }
        Value::Dict(dict) => decrypt_dict(decryptor, id, dict),
        Value::Stream(stream) => {
            let is_xref = stream.dict().is_type("XRef");
            let taken = std::mem::replace(stream, crate::objects::Stream::from_bytes(Vec::new()));
            let (mut dict, data) = taken.into_parts();
            decrypt_dict(decryptor, id, &mut dict);
            let data = if is_xref {
                data
            } else {
                decryptor.decrypt(id, &data)
            };
            *stream = crate::objects::Stream::new(dict, data);
        }
        _ => {}
    }
}

fn decrypt_dict(decryptor: &dyn ObjectDecryptor, id: ObjectId, dict: &mut Dictionary) {
    let keys: Vec<String> = dict.keys().cloned().collect();
    for key in keys {
        if let Some(v) = dict.get_mut(&key) {
            decrypt_value(decryptor, id, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::Stream;

    struct XorOne;

    impl ObjectDecryptor for XorOne {
        fn decrypt(&self, _id: ObjectId, data: &[u8]) -> Vec<u8> {
            data.iter().map(|b| b ^ 1).collect()
        }
    }

    #[test]
    fn test_decrypt_value_recurses() {
        let mut value = Value::Array(vec![
            Value::String(vec![b'a' ^ 1]),
            Value::Dict(Dictionary::new().with("T", Value::String(vec![b'b' ^ 1]))),
            Value::name("Untouched"),
        ]);
        decrypt_value(&XorOne, ObjectId::new(1, 0), &mut value);
        let items = value.as_array().unwrap();
        assert_eq!(items[0].as_bytes(), Some(&b"a"[..]));
        assert_eq!(
            items[1].as_dict().and_then(|d| d.get("T")).and_then(Value::as_bytes),
            Some(&b"b"[..])
        );
        assert_eq!(items[2].as_name(), Some("Untouched"));
    }

    #[test]
    fn test_xref_stream_payload_not_decrypted() {
        let dict = Dictionary::new().with("Type", Value::name("XRef"));
        let mut value = Value::Stream(Stream::new(dict, vec![1, 2, 3]));
        decrypt_value(&XorOne, ObjectId::new(1, 0), &mut value);
        assert_eq!(value.as_stream().unwrap().data(), &[1, 2, 3]);
    }
}
