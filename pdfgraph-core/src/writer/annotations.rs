//! Annotations attached to generated pages.

use std::str::FromStr;

use crate::geometry::Rectangle;
use crate::objects::{Dictionary, ObjectId, Value};

/// Where a link goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    Uri(String),
    /// Zero-based page index.
    Page(usize),
    NextPage,
    PreviousPage,
}

impl LinkTarget {
    /// Page index this target points at from page `from`, if it is an
    /// intra-document link. Out-of-range targets are `None`.
    pub fn resolve_page(&self, from: usize, page_count: usize) -> Option<usize> {
        let index = match self {
            LinkTarget::Uri(_) => return None,
            LinkTarget::Page(n) => *n,
            LinkTarget::NextPage => from + 1,
            LinkTarget::PreviousPage => from.checked_sub(1)?,
        };
        (index < page_count).then_some(index)
    }
}

impl FromStr for LinkTarget {
    type Err = std::convert::Infallible;

    /// `Page:Next`, `Page:Back` and `Page:<n>` (one-based) are page links;
    /// anything else is a URI.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let target = match s.strip_prefix("Page:") {
            Some("Next") => LinkTarget::NextPage,
            Some("Back") => LinkTarget::PreviousPage,
            Some(n) => match n.parse::<usize>() {
                Ok(n) if n > 0 => LinkTarget::Page(n - 1),
                _ => LinkTarget::Uri(s.to_string()),
            },
            None => LinkTarget::Uri(s.to_string()),
        };
        Ok(target)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Annotation {
    Link {
        rect: Rectangle,
        target: LinkTarget,
    },
    /// A sticky note.
    Note {
        rect: Rectangle,
        contents: String,
        open: bool,
    },
    /// A single-line text form field.
    TextField {
        rect: Rectangle,
        name: String,
        value: String,
        font_size: f64,
    },
}

/// Default resource name of the form font.
pub(crate) const FORM_FONT: &str = "Helv";

impl Annotation {
    pub fn rect(&self) -> Rectangle {
        match self {
            Annotation::Link { rect, .. }
            | Annotation::Note { rect, .. }
            | Annotation::TextField { rect, .. } => *rect,
        }
    }

    pub fn is_field(&self) -> bool {
        matches!(self, Annotation::TextField { .. })
    }

    /// The annotation dictionary. `dest` is the resolved page object for
    /// intra-document links; `page` is the page carrying the annotation.
    pub(crate) fn to_dict(&self, page: ObjectId, dest: Option<ObjectId>) -> Dictionary {
        let dict = Dictionary::new()
            .with("Type", Value::name("Annot"))
            .with("Rect", self.rect().to_value());
        match self {
            Annotation::Link { target, .. } => {
                let dict = dict
                    .with("Subtype", Value::name("Link"))
                    .with("Border", Value::Array(vec![0.into(), 0.into(), 0.into()]));
                match (target, dest) {
                    (LinkTarget::Uri(uri), _) => dict.with(
                        "A",
                        Dictionary::new()
                            .with("S", Value::name("URI"))
                            .with("URI", uri.as_str()),
                    ),
                    (_, Some(dest)) => dict.with(
                        "Dest",
                        Value::Array(vec![
                            dest.into(),
                            Value::name("XYZ"),
                            Value::Null,
                            Value::Null,
                            Value::Null,
                        ]),
                    ),
                    (_, None) => dict,
                }
            }
            Annotation::Note { contents, open, .. } => dict
                .with("Subtype", Value::name("Text"))
                .with("Contents", contents.as_str())
                .with("Open", *open),
            Annotation::TextField {
                name,
                value,
                font_size,
                ..
            } => dict
                .with("Subtype", Value::name("Widget"))
                .with("FT", Value::name("Tx"))
                .with("T", name.as_str())
                .with("V", value.as_str())
                .with("DA", default_appearance(*font_size))
                .with("F", 4)
                .with("P", page),
        }
    }
}

fn default_appearance(font_size: f64) -> String {
    format!(
        "/{FORM_FONT} {} Tf 0 g",
        super::serializer::format_number(font_size)
    )
}

/// The document-level `/AcroForm` for `fields`.
pub(crate) fn acro_form(fields: Vec<Value>) -> Dictionary {
    let helvetica = Dictionary::new()
        .with("Type", Value::name("Font"))
        .with("Subtype", Value::name("Type1"))
        .with("BaseFont", Value::name("Helvetica"))
        .with("Encoding", Value::name("WinAnsiEncoding"));
    Dictionary::new()
        .with("Fields", Value::Array(fields))
        .with("NeedAppearances", true)
        .with("DA", default_appearance(0.0))
        .with(
            "DR",
            Dictionary::new().with("Font", Dictionary::new().with(FORM_FONT, helvetica)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(s: &str) -> LinkTarget {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_targets() {
        assert_eq!(target("Page:3"), LinkTarget::Page(2));
        assert_eq!(target("Page:Next"), LinkTarget::NextPage);
        assert_eq!(target("Page:Back"), LinkTarget::PreviousPage);
        assert_eq!(
            target("https://example.com"),
            LinkTarget::Uri("https://example.com".into())
        );
        assert_eq!(target("Page:0"), LinkTarget::Uri("Page:0".into()));
    }

    #[test]
    fn test_resolve_page_bounds() {
        assert_eq!(LinkTarget::NextPage.resolve_page(0, 2), Some(1));
        assert_eq!(LinkTarget::NextPage.resolve_page(1, 2), None);
        assert_eq!(LinkTarget::PreviousPage.resolve_page(0, 2), None);
        assert_eq!(LinkTarget::Page(5).resolve_page(0, 2), None);
        assert_eq!(LinkTarget::Uri("x".into()).resolve_page(0, 2), None);
    }

    #[test]
    fn test_page_link_dest() {
        let link = Annotation::Link {
            rect: Rectangle::from_position_and_size(0.0, 0.0, 10.0, 10.0),
            target: LinkTarget::NextPage,
        };
        let dict = link.to_dict(ObjectId::new(6, 0), Some(ObjectId::new(8, 0)));
        let dest = dict.get_array("Dest").unwrap();
        assert_eq!(dest[0].as_reference(), Some(ObjectId::new(8, 0)));
        assert_eq!(dest[1].as_name(), Some("XYZ"));
        assert!(dest[2].is_null());
    }

    #[test]
    fn test_text_field_widget() {
        let field = Annotation::TextField {
            rect: Rectangle::from_position_and_size(10.0, 10.0, 100.0, 20.0),
            name: "email".into(),
            value: String::new(),
            font_size: 12.0,
        };
        let dict = field.to_dict(ObjectId::new(6, 0), None);
        assert_eq!(dict.get_name("FT"), Some("Tx"));
        assert_eq!(
            dict.get("DA").and_then(Value::as_text).as_deref(),
            Some("/Helv 12 Tf 0 g")
        );
        assert_eq!(
            dict.get("P").and_then(Value::as_reference),
            Some(ObjectId::new(6, 0))
        );
    }
}
