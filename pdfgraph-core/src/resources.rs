//! Scoped lookup of named page resources.
//!
//! A page pushes its `/Resources` dictionary; a form XObject or tiling
//! pattern pushes its own on top for the duration of its content stream.
//! Lookups search from the innermost frame outward.

use std::collections::HashMap;

use tracing::warn;

pub use crate::error::ResourceCategory;
use crate::objects::{Dictionary, ObjectId, Value};
use crate::xref::ObjectResolver;

const CATEGORIES: [ResourceCategory; 7] = [
    ResourceCategory::Font,
    ResourceCategory::XObject,
    ResourceCategory::ExtGState,
    ResourceCategory::ColorSpace,
    ResourceCategory::Pattern,
    ResourceCategory::Shading,
    ResourceCategory::Properties,
];

/// Identity of a pushed resource dictionary. Dictionaries stored as
/// indirect objects keep their object id across pushes; direct ones get a
/// fresh identity from the owning stack every time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKey {
    Object(ObjectId),
    Anonymous(u64),
}

/// Stable identity of a resource for caching: the indirect object it lives
/// in, or the frame and name it was found under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceKey {
    Object(ObjectId),
    Named(FrameKey, String),
}

/// A named resource together with the frame it was found in.
#[derive(Debug, Clone)]
pub struct FoundResource {
    pub frame: FrameKey,
    pub value: Value,
}

impl FoundResource {
    pub fn key(&self, name: &str) -> ResourceKey {
        match &self.value {
            Value::Reference(id) => ResourceKey::Object(*id),
            _ => ResourceKey::Named(self.frame, name.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
struct ResourceFrame {
    key: FrameKey,
    categories: HashMap<ResourceCategory, Dictionary>,
}

/// Named resource lookup consumed by the interpreter and color resolver.
pub trait ResourceLookup {
    fn find_resource(&self, category: ResourceCategory, name: &str) -> Option<FoundResource>;
}

#[derive(Debug, Clone, Default)]
pub struct ResourceStack {
    frames: Vec<ResourceFrame>,
    next_anonymous: u64,
}

impl ResourceStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a `/Resources` value (direct dictionary or reference). The
    /// category sub-dictionaries are resolved once, here.
    pub fn push(&mut self, resources: &Value, objects: &dyn ObjectResolver) {
        let key = match resources {
            Value::Reference(id) => FrameKey::Object(*id),
            _ => {
                self.next_anonymous += 1;
                FrameKey::Anonymous(self.next_anonymous)
            }
        };
        let dict = match objects.resolve(resources) {
            Ok(Value::Dict(d)) => d.clone(),
            Ok(Value::Null) => Dictionary::new(),
            Ok(other) => {
                warn!("/Resources is a {}, ignoring", other.kind());
                Dictionary::new()
            }
            Err(e) => {
                warn!("unreadable /Resources: {e}");
                Dictionary::new()
            }
        };
        let mut categories = HashMap::new();
        for category in CATEGORIES {
            if let Some(sub) = dict.get(category.key()) {
                match objects.resolve(sub) {
                    Ok(Value::Dict(d)) => {
                        categories.insert(category, d.clone());
                    }
                    Ok(other) => warn!("/{category} resources are a {}", other.kind()),
                    Err(e) => warn!("unreadable /{category} resources: {e}"),
                }
            }
        }
        self.frames.push(ResourceFrame { key, categories });
    }

    pub fn push_dict(&mut self, resources: &Dictionary, objects: &dyn ObjectResolver) {
        self.push(&Value::Dict(resources.clone()), objects);
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Identity of the innermost frame, if any.
    pub fn top_key(&self) -> Option<FrameKey> {
        self.frames.last().map(|f| f.key)
    }
}

impl ResourceLookup for ResourceStack {
    fn find_resource(&self, category: ResourceCategory, name: &str) -> Option<FoundResource> {
        self.frames.iter().rev().find_map(|frame| {
            frame
                .categories
                .get(&category)
                .and_then(|d| d.get(name))
                .map(|value| FoundResource {
                    frame: frame.key,
                    value: value.clone(),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xref::MemoryResolver;

    fn fonts(name: &str, base: &str) -> Value {
        Value::Dict(Dictionary::new().with(
            "Font",
            Dictionary::new().with(name, Value::name(base)),
        ))
    }

    #[test]
    fn test_innermost_frame_wins() {
        let objects = MemoryResolver::new();
        let mut stack = ResourceStack::new();
        stack.push(&fonts("F1", "Page"), &objects);
        stack.push(&fonts("F1", "Form"), &objects);

        let found = stack.find_resource(ResourceCategory::Font, "F1").unwrap();
        assert_eq!(found.value.as_name(), Some("Form"));

        stack.pop();
        let found = stack.find_resource(ResourceCategory::Font, "F1").unwrap();
        assert_eq!(found.value.as_name(), Some("Page"));
        assert!(stack.find_resource(ResourceCategory::XObject, "F1").is_none());
    }

    #[test]
    fn test_indirect_resources_keep_identity() {
        let mut objects = MemoryResolver::new();
        let sub = objects.add(Dictionary::new().with("CS0", Value::name("DeviceRGB")));
        let res = objects.add(Dictionary::new().with("ColorSpace", Value::Reference(sub)));

        let mut stack = ResourceStack::new();
        stack.push(&Value::Reference(res), &objects);
        let found = stack
            .find_resource(ResourceCategory::ColorSpace, "CS0")
            .unwrap();
        assert_eq!(found.frame, FrameKey::Object(res));
        assert_eq!(
            found.key("CS0"),
            ResourceKey::Named(FrameKey::Object(res), "CS0".into())
        );

        stack.push(&fonts("F1", "X"), &objects);
        assert!(matches!(stack.top_key(), Some(FrameKey::Anonymous(_))));
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn test_direct_frames_get_distinct_identities() {
        let objects = MemoryResolver::new();
        let mut stack = ResourceStack::new();
        stack.push(&fonts("F1", "A"), &objects);
        let first = stack.top_key();
        stack.pop();
        stack.push(&fonts("F1", "A"), &objects);
        assert_ne!(stack.top_key(), first);

        // each stack numbers its own frames
        let mut other = ResourceStack::new();
        other.push(&fonts("F1", "A"), &objects);
        assert_eq!(other.top_key(), first);
    }
}
