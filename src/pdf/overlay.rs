//! QR overlay stamping.
//!
//! The stamp is an image XObject plus a short caption, drawn by a content
//! stream appended to the target page. Coordinates are taken in the page's
//! own space (origin bottom-left), offset by the media box origin so pages
//! with a non-zero lower-left corner stay registered.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::io::Write;
use tracing::debug;

use crate::error::Result;
use crate::page_range::PageSet;

const IMAGE_RESOURCE: &[u8] = b"QRConstancia";
const FONT_RESOURCE: &[u8] = b"FConstancia";
const CAPTION_PT: i64 = 8;
const CAPTION_DROP: f32 = 10.0;

/// Renders one QR-plus-caption overlay onto selected pages of a document.
pub struct Stamper<'a> {
    png: &'a [u8],
    caption: String,
    position: (f32, f32),
    size: f32,
}

impl<'a> Stamper<'a> {
    pub fn new(png: &'a [u8], caption: impl Into<String>, position: (f32, f32), size: f32) -> Self {
        Self {
            png,
            caption: caption.into(),
            position,
            size,
        }
    }

    /// Stamps only the first page.
    pub fn stamp_first_page(&self, doc: &mut Document) -> Result<()> {
        let first = doc
            .get_pages()
            .values()
            .next()
            .copied()
            .ok_or(lopdf::Error::PageNumberNotFound(1))?;
        let (image_id, font_id) = self.add_shared_objects(doc)?;
        self.stamp_page(doc, first, image_id, font_id)
    }

    /// Stamps every page whose zero-based index is in `pages`.
    ///
    /// When the set covers the whole document only the first page is
    /// stamped, so a fully-signed document does not carry the marker on
    /// every page.
    pub fn stamp_pages(&self, doc: &mut Document, pages: &PageSet) -> Result<()> {
        let page_map = doc.get_pages();
        let total = page_map.len() as u32;
        if let Some(bad) = pages.iter().find(|&p| p >= total) {
            return Err(lopdf::Error::PageNumberNotFound(bad + 1).into());
        }
        if pages.covers_all(total) {
            debug!("page set covers whole document, stamping first page only");
            return self.stamp_first_page(doc);
        }

        let targets: Vec<ObjectId> = page_map
            .iter()
            .filter(|(number, _)| pages.contains(*number - 1))
            .map(|(_, id)| *id)
            .collect();

        let (image_id, font_id) = self.add_shared_objects(doc)?;
        for page_id in targets {
            self.stamp_page(doc, page_id, image_id, font_id)?;
        }
        Ok(())
    }

    /// Decodes the PNG and embeds it as a Flate-compressed DeviceRGB image
    /// XObject, together with the caption font. One copy serves all pages.
    fn add_shared_objects(&self, doc: &mut Document) -> Result<(ObjectId, ObjectId)> {
        let img = image::load_from_memory(self.png)?.to_rgb8();
        let (width, height) = img.dimensions();

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(img.as_raw())?;
        let samples = encoder.finish()?;

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(width as i64));
        dict.set("Height", Object::Integer(height as i64));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
        let image_id = doc.add_object(Object::Stream(Stream::new(dict, samples)));

        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(b"Helvetica".to_vec()));
        font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));
        let font_id = doc.add_object(Object::Dictionary(font));

        Ok((image_id, font_id))
    }

    fn stamp_page(
        &self,
        doc: &mut Document,
        page_id: ObjectId,
        image_id: ObjectId,
        font_id: ObjectId,
    ) -> Result<()> {
        let (llx, lly) = media_box_origin(doc, page_id);
        let (x, y) = (self.position.0 + llx, self.position.1 + lly);

        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(self.size),
                    Object::Integer(0),
                    Object::Integer(0),
                    real(self.size),
                    real(x),
                    real(y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.to_vec())]),
            Operation::new("Q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(FONT_RESOURCE.to_vec()), Object::Integer(CAPTION_PT)],
            ),
            Operation::new("Td", vec![real(x), real(y - CAPTION_DROP)]),
            Operation::new(
                "Tj",
                vec![Object::String(latin1(&self.caption), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ];
        let encoded = Content { operations }.encode()?;
        let content_id = doc.add_object(Object::Stream(Stream::new(Dictionary::new(), encoded)));

        // Resolve Resources up front; the write-back below sets everything
        // inline on the page so inherited or shared dictionaries are never
        // mutated in place.
        let mut resources = resolved_resources(doc, page_id);
        let mut xobjects = sub_dictionary(doc, &resources, b"XObject");
        xobjects.set(IMAGE_RESOURCE, Object::Reference(image_id));
        resources.set("XObject", Object::Dictionary(xobjects));
        let mut fonts = sub_dictionary(doc, &resources, b"Font");
        fonts.set(FONT_RESOURCE, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(fonts));

        let mut contents = match doc.get_dictionary(page_id)?.get(b"Contents") {
            Ok(Object::Array(items)) => items.clone(),
            Ok(other) => vec![other.clone()],
            Err(_) => vec![],
        };
        contents.push(Object::Reference(content_id));

        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)?;
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Array(contents));
        Ok(())
    }
}

fn real(value: f32) -> Object {
    Object::Real(value.into())
}

/// Captions are written with WinAnsiEncoding, so map to Latin-1 bytes.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Walks the page's ancestor chain for an (inheritable) attribute.
fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;
    loop {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }
}

fn deref_dictionary(doc: &Document, object: &Object) -> Option<Dictionary> {
    match object {
        Object::Reference(id) => doc.get_dictionary(*id).ok().cloned(),
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

fn resolved_resources(doc: &Document, page_id: ObjectId) -> Dictionary {
    inherited(doc, page_id, b"Resources")
        .and_then(|obj| deref_dictionary(doc, &obj))
        .unwrap_or_else(Dictionary::new)
}

fn sub_dictionary(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    resources
        .get(key)
        .ok()
        .and_then(|obj| deref_dictionary(doc, obj))
        .unwrap_or_else(Dictionary::new)
}

/// Lower-left corner of the page's media box; (0, 0) when absent.
fn media_box_origin(doc: &Document, page_id: ObjectId) -> (f32, f32) {
    let media_box = inherited(doc, page_id, b"MediaBox").and_then(|obj| match obj {
        Object::Reference(id) => doc.get_object(id).ok().cloned(),
        other => Some(other),
    });
    if let Some(Object::Array(values)) = media_box {
        if values.len() == 4 {
            let llx = as_number(&values[0]).unwrap_or(0.0);
            let lly = as_number(&values[1]).unwrap_or(0.0);
            return (llx, lly);
        }
    }
    (0.0, 0.0)
}

fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}
