//! Byte-level serialization of values, indirect objects and streams.

use tracing::debug;

use crate::compression;
use crate::encryption::Encryptor;
use crate::objects::{Dictionary, Stream, Value};

/// Formats a number the way content streams and object bodies expect:
/// integral values without a fraction, others with up to six decimals.
pub fn format_number(n: f64) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    let s = format!("{n:.6}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Appends `/name`, escaping bytes that are not regular characters.
pub fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for &b in name.as_bytes() {
        let regular = (0x21..=0x7E).contains(&b) && !b"()<>[]{}/%#".contains(&b);
        if regular {
            out.push(b);
        } else {
            out.extend_from_slice(format!("#{b:02X}").as_bytes());
        }
    }
}

/// Appends a string literal. Printable text is written as `( )` with the
/// delimiters escaped; anything else as hex.
pub fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    let printable = bytes
        .iter()
        .all(|b| (0x20..0x7F).contains(b) || matches!(b, b'\n' | b'\r' | b'\t'));
    if !printable {
        out.push(b'<');
        for b in bytes {
            out.extend_from_slice(format!("{b:02X}").as_bytes());
        }
        out.push(b'>');
        return;
    }
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => {
                out.push(b'\\');
                out.push(b);
            }
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            _ => out.push(b),
        }
    }
    out.push(b')');
}

/// Serializes values into a PDF body. Strings and stream payloads pass
/// through the encryptor when one is set; the caller primes it per object.
pub struct Serializer<'e> {
    compress: bool,
    threshold: usize,
    encryptor: Option<&'e mut dyn Encryptor>,
}

impl<'e> Serializer<'e> {
    pub fn new(compress: bool, threshold: usize) -> Self {
        Self {
            compress,
            threshold,
            encryptor: None,
        }
    }

    pub fn with_encryptor(mut self, encryptor: &'e mut dyn Encryptor) -> Self {
        self.encryptor = Some(encryptor);
        self
    }

    /// Writes `n 0 obj ... endobj`. `encrypt` is false for objects that
    /// must stay readable before decryption is set up.
    pub fn write_object(&mut self, out: &mut Vec<u8>, number: u32, value: &Value, encrypt: bool) {
        out.extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        let saved = if encrypt { None } else { self.encryptor.take() };
        if let Some(enc) = self.encryptor.as_deref_mut() {
            enc.start_object(number, 0);
        }
        self.write_value(out, value);
        if saved.is_some() {
            self.encryptor = saved;
        }
        out.extend_from_slice(b"\nendobj\n");
    }

    pub fn write_value(&mut self, out: &mut Vec<u8>, value: &Value) {
        match value {
            Value::Null => out.extend_from_slice(b"null"),
            Value::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
            Value::Number(n) => out.extend_from_slice(format_number(*n).as_bytes()),
            Value::Name(name) => write_name(out, name),
            Value::String(bytes) => match self.encryptor.as_deref_mut() {
                Some(enc) => {
                    let encrypted = enc.encrypt_string(bytes);
                    write_string(out, &encrypted);
                }
                None => write_string(out, bytes),
            },
            Value::Reference(id) => {
                out.extend_from_slice(format!("{} {} R", id.number(), id.generation()).as_bytes())
            }
            Value::Array(items) => {
                out.push(b'[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b' ');
                    }
                    self.write_value(out, item);
                }
                out.push(b']');
            }
            Value::Dict(dict) => self.write_dict(out, dict),
            Value::Stream(stream) => self.write_stream(out, stream),
        }
    }

    fn write_dict(&mut self, out: &mut Vec<u8>, dict: &Dictionary) {
        out.extend_from_slice(b"<<");
        for (key, value) in dict.iter() {
            out.push(b'\n');
            write_name(out, key);
            out.push(b' ');
            self.write_value(out, value);
        }
        out.extend_from_slice(b"\n>>");
    }

    /// Compression first, then encryption; `/Length` is the byte count
    /// actually emitted.
    fn write_stream(&mut self, out: &mut Vec<u8>, stream: &Stream) {
        let mut dict = stream.dict().clone();
        let mut data = stream.data().to_vec();
        if self.compress && !stream.has_filter() {
            if let Some(compressed) = compression::compress_if_smaller(&data, self.threshold) {
                debug!("deflated stream {} -> {} bytes", data.len(), compressed.len());
                dict.set("Filter", Value::name("FlateDecode"));
                data = compressed;
            }
        }
        if let Some(enc) = self.encryptor.as_deref_mut() {
            data = enc.encrypt_stream_bytes(&data);
        }
        dict.set("Length", data.len());
        self.write_dict(out, &dict);
        out.extend_from_slice(b"\nstream\n");
        out.extend_from_slice(&data);
        out.extend_from_slice(b"\nendstream");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjectId;
    use pretty_assertions::assert_eq;

    fn serialize(value: &Value) -> String {
        let mut out = Vec::new();
        Serializer::new(false, 0).write_value(&mut out, value);
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn test_numbers() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.5), "-0.5");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
        assert_eq!(format_number(-0.0000001), "0");
        assert_eq!(format_number(f64::NAN), "0");
    }

    #[test]
    fn test_names_and_strings() {
        assert_eq!(serialize(&Value::name("A B#")), "/A#20B#23");
        assert_eq!(serialize(&Value::string("a(b)\\")), "(a\\(b\\)\\\\)");
        assert_eq!(serialize(&Value::String(vec![0, 255])), "<00FF>");
    }

    #[test]
    fn test_dict_and_array() {
        let dict = Dictionary::new()
            .with("Type", Value::name("Page"))
            .with("Parent", ObjectId::new(3, 0))
            .with("MediaBox", Value::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]));
        assert_eq!(
            serialize(&Value::Dict(dict)),
            "<<\n/Type /Page\n/Parent 3 0 R\n/MediaBox [0 0 612 792]\n>>"
        );
    }

    #[test]
    fn test_stream_length_matches_payload() {
        let stream = Stream::from_bytes(b"0 0 10 10 re f".to_vec());
        assert_eq!(
            serialize(&Value::Stream(stream)),
            "<<\n/Length 14\n>>\nstream\n0 0 10 10 re f\nendstream"
        );
    }

    struct Tagging {
        current: u32,
    }

    impl Encryptor for Tagging {
        fn start_object(&mut self, number: u32, _generation: u16) {
            self.current = number;
        }

        fn encrypt_string(&mut self, data: &[u8]) -> Vec<u8> {
            let mut v = vec![self.current as u8];
            v.extend_from_slice(data);
            v
        }

        fn encrypt_stream_bytes(&mut self, data: &[u8]) -> Vec<u8> {
            self.encrypt_string(data)
        }

        fn encryption_dict(&self) -> Dictionary {
            Dictionary::new()
        }
    }

    #[test]
    fn test_encryption_primed_per_object() {
        let mut enc = Tagging { current: 0 };
        let mut out = Vec::new();
        let mut serializer = Serializer::new(false, 0).with_encryptor(&mut enc);
        serializer.write_object(&mut out, 7, &Value::string("x"), true);
        serializer.write_object(&mut out, 8, &Value::string("y"), false);
        let text = String::from_utf8_lossy(&out).into_owned();
        assert!(text.contains("7 0 obj\n<0778>"));
        assert!(text.contains("8 0 obj\n(y)"));
    }
}
