use crate::objects::Value;
use indexmap::IndexMap;

/// Name-keyed PDF dictionary.
///
/// Entries keep insertion order so a written file is byte-for-byte
/// reproducible; equality ignores order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    entries: IndexMap<String, Value>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style `set`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries.get_mut(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_name)
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_number)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.get(key).and_then(Value::as_array)
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(|v| match v {
            Value::Dict(d) => Some(d),
            _ => None,
        })
    }

    /// True when `/Type` names `expected`.
    pub fn is_type(&self, expected: &str) -> bool {
        self.get_name("Type") == Some(expected)
    }
}

impl FromIterator<(String, Value)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Dictionary {
            entries: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dictionary() {
        let dict = Dictionary::new();
        assert!(dict.is_empty());
        assert_eq!(dict.len(), 0);
    }

    #[test]
    fn test_set_and_get() {
        let mut dict = Dictionary::new();
        dict.set("Type", Value::name("Page"));
        dict.set("Rotate", 90);
        dict.set("Title", "Report");

        assert_eq!(dict.get_name("Type"), Some("Page"));
        assert_eq!(dict.get_i64("Rotate"), Some(90));
        assert_eq!(dict.get("Title"), Some(&Value::String(b"Report".to_vec())));
        assert!(dict.get("Missing").is_none());
        assert!(dict.is_type("Page"));
    }

    #[test]
    fn test_insertion_order_preserved() {
        let dict = Dictionary::new()
            .with("Zeta", 1)
            .with("Alpha", 2)
            .with("Mid", 3);

        let keys: Vec<_> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_equality_ignores_order() {
        let a = Dictionary::new().with("A", 1).with("B", 2);
        let b = Dictionary::new().with("B", 2).with("A", 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_remove_keeps_remaining_order() {
        let mut dict = Dictionary::new().with("A", 1).with("B", 2).with("C", 3);
        assert_eq!(dict.remove("B"), Some(Value::Number(2.0)));
        let keys: Vec<_> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["A", "C"]);
        assert_eq!(dict.remove("B"), None);
    }

    #[test]
    fn test_nested_dict_lookup() {
        let inner = Dictionary::new().with("F1", Value::name("Helvetica"));
        let outer = Dictionary::new().with("Font", inner.clone());
        assert_eq!(outer.get_dict("Font"), Some(&inner));
        assert!(outer.get_array("Font").is_none());
    }

    #[test]
    fn test_from_iterator() {
        let dict: Dictionary = vec![
            ("W".to_string(), Value::from(10)),
            ("H".to_string(), Value::from(20)),
        ]
        .into_iter()
        .collect();
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get_number("H"), Some(20.0));
    }
}
