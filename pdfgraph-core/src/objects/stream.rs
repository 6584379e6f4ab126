use crate::error::Result;
use crate::objects::{Dictionary, Value};
use crate::parser::filters;

/// A dictionary plus its (possibly encoded) byte payload.
///
/// `/Length` is not maintained here; the writer sets it from the bytes it
/// actually emits and the parser uses it only to find `endstream`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dict: Dictionary,
    data: Vec<u8>,
}

impl Stream {
    pub fn new(dict: Dictionary, data: Vec<u8>) -> Self {
        Self { dict, data }
    }

    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self::new(Dictionary::new(), data.into())
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    pub fn dict_mut(&mut self) -> &mut Dictionary {
        &mut self.dict
    }

    /// Raw payload, still encoded if the dictionary names a filter.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_parts(self) -> (Dictionary, Vec<u8>) {
        (self.dict, self.data)
    }

    pub fn has_filter(&self) -> bool {
        self.dict.contains_key("Filter")
    }

    pub fn set_filter(&mut self, filter: &str) {
        self.dict.set("Filter", Value::name(filter));
    }

    /// Payload with the `/Filter` chain applied.
    pub fn decoded_data(&self) -> Result<Vec<u8>> {
        filters::decode_stream(&self.data, &self.dict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfiltered_stream_decodes_to_itself() {
        let stream = Stream::from_bytes(b"BT /F1 12 Tf ET".to_vec());
        assert!(!stream.has_filter());
        assert_eq!(stream.decoded_data().unwrap(), b"BT /F1 12 Tf ET");
    }

    #[test]
    fn test_hex_filtered_stream() {
        let mut stream = Stream::from_bytes(b"48656C6C6F>".to_vec());
        stream.set_filter("ASCIIHexDecode");
        assert!(stream.has_filter());
        assert_eq!(stream.decoded_data().unwrap(), b"Hello");
    }

    #[test]
    fn test_into_parts() {
        let dict = Dictionary::new().with("Subtype", Value::name("Image"));
        let (d, data) = Stream::new(dict.clone(), vec![1, 2, 3]).into_parts();
        assert_eq!(d, dict);
        assert_eq!(data, vec![1, 2, 3]);
    }
}
