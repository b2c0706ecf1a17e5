//! Page-image PDF assembly (lopdf).
//!
//! Each page is one full-bleed JPEG XObject on a MediaBox of the physical page
//! size. Pages keep the order they were appended in.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use crate::export::ExportError;
use crate::layout::geometry::PageGeometry;

/// A JPEG-encoded page raster.
pub struct PageImage {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub struct PdfBuilder {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    width_pt: f32,
    height_pt: f32,
}

impl PdfBuilder {
    pub fn new(geometry: PageGeometry) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            width_pt: geometry.width_pt(),
            height_pt: geometry.height_pt(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    pub fn add_page(&mut self, page: PageImage) -> Result<(), ExportError> {
        let mut image = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => page.width as i64,
                "Height" => page.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            page.jpeg,
        );
        // Already DCT-compressed.
        image.allows_compression = false;
        let image_id = self.doc.add_object(image);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        self.width_pt.into(),
                        0.into(),
                        0.into(),
                        self.height_pt.into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec!["Im0".into()]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), self.width_pt.into(), self.height_pt.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { "Im0" => image_id },
            },
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    /// Serializes the document. `title` goes into the Info dictionary.
    pub fn finish(mut self, title: &str) -> Result<Vec<u8>, ExportError> {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let info_id = self.doc.add_object(dictionary! {
            "Title" => text_string(title),
            "Producer" => Object::string_literal(concat!("artisan-api ", env!("CARGO_PKG_VERSION"))),
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }
}

/// PDF text string: plain ASCII stays literal, anything else is UTF-16BE
/// behind a byte order mark so viewers do not read it as PDFDocEncoding.
fn text_string(text: &str) -> Object {
    if text.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
    Object::String(bytes, StringFormat::Hexadecimal)
}
