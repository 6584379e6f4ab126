//! XObjects, inline images and marked content.

use std::sync::Arc;

use tracing::debug;

use crate::content::interpreter::{last_name, Interpreter};
use crate::content::path::{FillRule, Path};
use crate::content::surface::{ImageData, ImageSource, Surface};
use crate::content::tokenizer::InlineImage;
use crate::error::{PdfError, ResourceCategory, Result};
use crate::geometry::{Matrix, Rectangle};
use crate::objects::{Dictionary, Stream, Value};
use crate::parser::filters::decode_image_stream;
use crate::resources::ResourceLookup;

#[allow(non_snake_case)]
impl Interpreter<'_> {
    pub(crate) fn do_Do(&mut self, operands: &[Value], surface: &mut dyn Surface) -> Result<()> {
        let name = last_name("Do", operands)?;
        let found = self
            .resources
            .find_resource(ResourceCategory::XObject, name)
            .ok_or_else(|| PdfError::missing(ResourceCategory::XObject, name))?;
        let objects = self.objects;
        let stream = match objects.resolve(&found.value)? {
            Value::Stream(stream) => stream,
            other => {
                return Err(PdfError::malformed(format!(
                    "XObject /{name} is a {}",
                    other.kind()
                )))
            }
        };
        match stream.dict().get_name("Subtype") {
            Some("Image") => {
                let id = found.value.as_reference();
                let cached = id.and_then(|id| self.images.get(&id)).map(Arc::clone);
                let image = match cached {
                    Some(image) => image,
                    None => {
                        let image = Arc::new(self.load_image(
                            stream.dict(),
                            stream.data(),
                            ImageSource::XObject(id),
                        )?);
                        if let Some(id) = id {
                            self.images.insert(id, Arc::clone(&image));
                        }
                        image
                    }
                };
                surface.draw_image(&image);
                Ok(())
            }
            Some("Form") => self.run_form(name, stream, surface),
            Some("PS") => {
                debug!("skipping PostScript XObject /{name}");
                Ok(())
            }
            other => Err(PdfError::malformed(format!(
                "XObject /{name} has Subtype {other:?}"
            ))),
        }
    }

    /// Inline images are used once and never cached.
    pub(crate) fn do_inline_image(
        &mut self,
        image: InlineImage,
        surface: &mut dyn Surface,
    ) -> Result<()> {
        let image = self.load_image(&image.dict, &image.data, ImageSource::Inline)?;
        surface.draw_image(&image);
        Ok(())
    }

    pub(crate) fn do_BMC(&mut self, operands: &[Value], surface: &mut dyn Surface) {
        let tag = operands.first().and_then(Value::as_name).unwrap_or_default();
        surface.begin_marked_content(tag);
    }

    fn run_form(&mut self, name: &str, form: &Stream, surface: &mut dyn Surface) -> Result<()> {
        let dict = form.dict();
        let objects = self.objects;
        let matrix = dict
            .get("Matrix")
            .map(|v| objects.resolve_or_null(v))
            .and_then(Matrix::from_value)
            .unwrap_or_default();
        let bbox = dict
            .get("BBox")
            .map(|v| objects.resolve_or_null(v))
            .and_then(Rectangle::from_value);
        let content = form.decoded_data()?;
        debug!("running form /{name}, {} bytes", content.len());

        let mut gstate = self.state.gstate.clone();
        gstate.ctm = matrix.concat(&gstate.ctm);

        surface.save();
        if !matrix.is_identity() {
            surface.transform(&matrix);
        }
        if let Some(bbox) = bbox {
            let mut clip = Path::new();
            clip.rect(
                bbox.lower_left.x,
                bbox.lower_left.y,
                bbox.width(),
                bbox.height(),
            );
            surface.clip_path(&clip, FillRule::NonZero);
        }
        let result = self.execute_nested(&content, dict.get("Resources"), gstate, surface);
        surface.restore();
        result
    }

    fn load_image(&mut self, dict: &Dictionary, raw: &[u8], source: ImageSource) -> Result<ImageData> {
        let objects = self.objects;
        let get = |key: &str| dict.get(key).map(|v| objects.resolve_or_null(v));
        let dimension = |key: &str| {
            get(key)
                .and_then(Value::as_i64)
                .filter(|v| *v > 0 && *v <= u32::MAX as i64)
                .map(|v| v as u32)
                .ok_or_else(|| PdfError::malformed(format!("image /{key} missing or invalid")))
        };
        let width = dimension("Width")?;
        let height = dimension("Height")?;
        let image_mask = get("ImageMask").and_then(Value::as_bool).unwrap_or(false);
        let bits_per_component = match get("BitsPerComponent").and_then(Value::as_i64) {
            Some(bpc @ (1 | 2 | 4 | 8 | 16)) => bpc as u8,
            Some(other) => {
                return Err(PdfError::malformed(format!("{other} bits per component")));
            }
            None if image_mask => 1,
            None => 8,
        };
        let color_space = match (image_mask, dict.get("ColorSpace")) {
            (true, _) => None,
            (false, Some(spec)) => Some(self.colors.resolve(spec, &self.resources, objects)?),
            (false, None) => None,
        };
        let decode = get("Decode").and_then(Value::as_array).map(|items| {
            items.iter().filter_map(Value::as_f32).collect::<Vec<f32>>()
        });
        let interpolate = get("Interpolate").and_then(Value::as_bool).unwrap_or(false);
        let (data, pending_filters) = decode_image_stream(raw, dict)?;
        if pending_filters.is_empty() && color_space.is_none() && !image_mask {
            return Err(PdfError::malformed("image without /ColorSpace"));
        }

        Ok(ImageData {
            source,
            width,
            height,
            bits_per_component,
            color_space,
            image_mask,
            decode,
            interpolate,
            pending_filters,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::colorspace::ColorSpace;
    use crate::content::display_list::{DisplayItem, DisplayList};
    use crate::content::surface::ImageSource;
    use crate::content::Interpreter;
    use crate::error::PdfError;
    use crate::objects::{Dictionary, Stream, Value};
    use crate::xref::MemoryResolver;

    fn image_stream() -> Stream {
        let dict = Dictionary::new()
            .with("Type", Value::name("XObject"))
            .with("Subtype", Value::name("Image"))
            .with("Width", 2)
            .with("Height", 1)
            .with("ColorSpace", Value::name("DeviceRGB"))
            .with("BitsPerComponent", 8);
        Stream::new(dict, vec![255, 0, 0, 0, 255, 0])
    }

    #[test]
    fn test_image_xobject_cached_by_object() {
        let mut objects = MemoryResolver::new();
        let id = objects.add(image_stream());
        let resources =
            Value::Dict(Dictionary::new().with("XObject", Dictionary::new().with("Im1", id)));
        let mut surface = DisplayList::new();
        let mut interp = Interpreter::new(&objects);
        let report = interp
            .run(b"q 20 0 0 10 0 0 cm /Im1 Do Q /Im1 Do", &resources, &mut surface)
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(surface.images().count(), 2);
        assert_eq!(interp.images.len(), 1);
        let image = surface.images().next().unwrap();
        assert_eq!(image.source, ImageSource::XObject(Some(id)));
        assert_eq!(image.data.len(), 6);
    }

    #[test]
    fn test_form_runs_with_matrix_and_bbox_clip() {
        let mut objects = MemoryResolver::new();
        let form_dict = Dictionary::new()
            .with("Type", Value::name("XObject"))
            .with("Subtype", Value::name("Form"))
            .with("BBox", Value::Array(vec![0.into(), 0.into(), 50.into(), 50.into()]))
            .with(
                "Matrix",
                Value::Array(vec![1.into(), 0.into(), 0.into(), 1.into(), 100.into(), 0.into()]),
            );
        let id = objects.add(Stream::new(form_dict, b"1 0 0 rg 0 0 10 10 re f".to_vec()));
        let resources =
            Value::Dict(Dictionary::new().with("XObject", Dictionary::new().with("Fm1", id)));
        let mut surface = DisplayList::new();
        let mut interp = Interpreter::new(&objects);
        let report = interp.run(b"/Fm1 Do 0 0 5 5 re f", &resources, &mut surface).unwrap();
        assert!(report.is_clean());

        let items = surface.items();
        assert!(matches!(items[0], DisplayItem::Save));
        assert!(matches!(items[1], DisplayItem::Transform(m) if m.e == 100.0));
        assert!(matches!(items[2], DisplayItem::Clip(..)));
        assert_eq!(surface.fills().count(), 2);
        // The form's color does not leak out.
        assert_eq!(*interp.graphics_state().fill_space, ColorSpace::DeviceGray);
    }

    #[test]
    fn test_recursive_form_is_bounded() {
        let mut objects = MemoryResolver::new();
        let id = objects.add(Value::Null);
        let resources = Dictionary::new().with("XObject", Dictionary::new().with("Me", id));
        let form_dict = Dictionary::new()
            .with("Subtype", Value::name("Form"))
            .with("Resources", resources.clone());
        objects.insert(id, Stream::new(form_dict, b"/Me Do".to_vec()));
        let mut surface = DisplayList::new();
        let report = Interpreter::new(&objects)
            .run(b"/Me Do", &Value::Dict(resources), &mut surface)
            .unwrap();
        assert_eq!(report.unsupported().count(), 1);
    }

    #[test]
    fn test_inline_image() {
        let objects = MemoryResolver::new();
        let mut surface = DisplayList::new();
        let report = Interpreter::new(&objects)
            .run(
                b"q 10 0 0 10 0 0 cm BI /W 2 /H 2 /CS /G /BPC 8 ID \x00\xff\xff\x00 EI Q",
                &Value::Null,
                &mut surface,
            )
            .unwrap();
        assert!(report.is_clean());
        let image = surface.images().next().unwrap();
        assert_eq!(image.source, ImageSource::Inline);
        assert_eq!(image.width, 2);
        assert_eq!(*image.color_space.clone().unwrap(), ColorSpace::DeviceGray);
        assert_eq!(image.data, vec![0x00, 0xff, 0xff, 0x00]);
    }

    #[test]
    fn test_stencil_mask_has_no_color_space() {
        let objects = MemoryResolver::new();
        let mut surface = DisplayList::new();
        Interpreter::new(&objects)
            .run(b"BI /W 8 /H 1 /IM true ID \xaa EI", &Value::Null, &mut surface)
            .unwrap();
        let image = surface.images().next().unwrap();
        assert!(image.image_mask);
        assert_eq!(image.bits_per_component, 1);
        assert!(image.color_space.is_none());
    }

    #[test]
    fn test_missing_xobject() {
        let objects = MemoryResolver::new();
        let mut surface = DisplayList::new();
        let report = Interpreter::new(&objects)
            .run(b"/Im9 Do", &Value::Null, &mut surface)
            .unwrap();
        assert!(matches!(
            report.diagnostics[0].error,
            PdfError::ResourceNotFound { .. }
        ));
    }

    #[test]
    fn test_marked_content_tags() {
        let objects = MemoryResolver::new();
        let mut surface = DisplayList::new();
        Interpreter::new(&objects)
            .run(b"/Span <</MCID 0>> BDC EMC", &Value::Null, &mut surface)
            .unwrap();
        assert!(matches!(&surface.items()[0], DisplayItem::BeginMarked(tag) if tag == "Span"));
        assert!(matches!(surface.items()[1], DisplayItem::EndMarked));
    }
}
