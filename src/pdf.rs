use lopdf::{content::Operation, Object, StringFormat};
use std::collections::BTreeMap;
use time::OffsetDateTime;

use crate::{
    canvas::{Canvas, Color},
    error::ContextError,
    typography::{ActiveFont, FontStyle, TextStyle, Typography},
};

/// Converts millimeters to points. The layout works in millimeters, which are easier to reason
/// about, while the PDF content streams expect points.
pub fn millimeters_to_points(millimeters: f32) -> f32 {
    millimeters * 2.834646
}

/// Width of the stroked lines, about 0.2mm.
const LINE_WIDTH: f32 = 0.57;

/// The metadata written into the document information dictionary.
#[derive(Debug, Clone)]
pub struct DocumentInformation {
    pub title: String,
    pub creator: String,
    pub creation_date: OffsetDateTime,
}

/// The content of a single page, as a list of content stream operations.
#[derive(Debug, Clone, Default)]
struct PdfPage {
    operations: Vec<Operation>,
}

/// This struct represents the actual PDF document on a high-level. It is an interface to the
/// underlying `lopdf::Document` that keeps the pages' operations until the document is written,
/// so that earlier pages can still be drawn on (the footer is added last, to every page).
///
/// Text is drawn with the fonts of the given `Typography`: embedded faces are written as `Type0`
/// fonts addressed by glyph ID, built-in faces as standard `Type1` fonts in WinAnsiEncoding.
pub struct PdfDocument {
    inner_document: lopdf::Document,
    /// The identifier of the document, used for both halves of the PDF `ID` tag.
    identifier: String,
    information: DocumentInformation,
    /// Page size in millimeters.
    page_size: [f32; 2],
    pages: Vec<PdfPage>,
    current_page: usize,
    typography: Typography,
    /// The fonts drawn with so far, by resource name.
    used_fonts: BTreeMap<String, FontStyle>,
}

impl PdfDocument {
    /// Creates an empty document (with no pages) targeting version 1.5 of the PDF specification.
    pub fn new(
        identifier: String,
        information: DocumentInformation,
        page_size: [f32; 2],
        typography: Typography,
    ) -> Self {
        PdfDocument {
            inner_document: lopdf::Document::with_version("1.5"),
            identifier,
            information,
            page_size,
            pages: Vec::new(),
            current_page: 0,
            typography,
            used_fonts: BTreeMap::new(),
        }
    }

    fn current_operations(&mut self) -> Result<&mut Vec<Operation>, ContextError> {
        let current_page = self.current_page;
        self.pages
            .get_mut(current_page)
            .map(|page| &mut page.operations)
            .ok_or_else(|| {
                ContextError::with_context(format!(
                    "Failed to find the page with index {}",
                    current_page
                ))
            })
    }

    /// Converts a distance from the top of the page in millimeters into the PDF vertical
    /// coordinate, which grows upwards from the bottom of the page.
    fn vertical_position(&self, y: f32) -> f32 {
        millimeters_to_points(self.page_size[1] - y)
    }

    /// Write the pages, fonts and metadata into the underlying document and serialize it.
    pub fn save_to_bytes(mut self) -> Result<Vec<u8>, ContextError> {
        self.write_all()?;

        let mut pdf_document_bytes = Vec::new();
        self.inner_document
            .save_to(&mut pdf_document_bytes)
            .map_err(|error| {
                ContextError::with_error("Error while saving the PDF document to bytes", &error)
            })?;

        Ok(pdf_document_bytes)
    }

    fn write_all(&mut self) -> Result<(), ContextError> {
        use lopdf::Object::*;

        if self.pages.is_empty() {
            return Err(ContextError::with_context(
                "Unable to write a PDF document without pages",
            ));
        }

        let creation_date = to_pdf_timestamp_format(&self.information.creation_date);
        let document_info = lopdf::Dictionary::from_iter(vec![
            ("Title", text_string(&self.information.title)),
            ("Creator", text_string(&self.information.creator)),
            ("Producer", text_string(env!("CARGO_PKG_NAME"))),
            (
                "CreationDate",
                String(creation_date.clone().into_bytes(), StringFormat::Literal),
            ),
            (
                "ModDate",
                String(creation_date.into_bytes(), StringFormat::Literal),
            ),
        ]);
        let document_info_id = self.inner_document.add_object(Dictionary(document_info));

        let fonts_dictionary = self.insert_fonts_into_document();
        let resources_id = self
            .inner_document
            .add_object(lopdf::Dictionary::from_iter(vec![(
                "Font",
                Dictionary(fonts_dictionary),
            )]));

        let pages_id = self.inner_document.new_object_id();
        let [page_width, page_height] = self.page_size.map(millimeters_to_points);
        let media_box = Array(vec![Integer(0), Integer(0), Real(page_width), Real(page_height)]);

        let mut page_ids = Vec::<Object>::with_capacity(self.pages.len());
        for (index, page) in self.pages.iter_mut().enumerate() {
            let content = lopdf::content::Content {
                operations: std::mem::take(&mut page.operations),
            };
            let encoded_content = content.encode().map_err(|error| {
                ContextError::with_error(
                    format!("Failed to encode the content of page {}", index + 1),
                    &error,
                )
            })?;
            // Page contents are left uncompressed
            let content_id = self.inner_document.add_object(
                lopdf::Stream::new(lopdf::Dictionary::new(), encoded_content)
                    .with_compression(false),
            );

            let page_dictionary = lopdf::Dictionary::from_iter(vec![
                ("Type", Name("Page".into())),
                ("Parent", Reference(pages_id)),
                ("MediaBox", media_box.clone()),
                ("Resources", Reference(resources_id)),
                ("Contents", Reference(content_id)),
            ]);
            page_ids.push(Reference(self.inner_document.add_object(page_dictionary)));
        }

        let pages = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Pages".into())),
            ("Count", Integer(page_ids.len() as i64)),
            ("Kids", Array(page_ids)),
        ]);
        self.inner_document
            .objects
            .insert(pages_id, Dictionary(pages));

        let catalog_id = self.inner_document.add_object(lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Catalog".into())),
            ("PageLayout", Name("OneColumn".into())),
            ("Pages", Reference(pages_id)),
        ]));

        self.inner_document.trailer.set("Root", Reference(catalog_id));
        self.inner_document
            .trailer
            .set("Info", Reference(document_info_id));
        self.inner_document.trailer.set(
            "ID",
            Array(vec![
                String(self.identifier.clone().into_bytes(), StringFormat::Literal),
                String(self.identifier.clone().into_bytes(), StringFormat::Literal),
            ]),
        );

        Ok(())
    }

    /// Inserts every font that was drawn with into the document and returns the font resource
    /// dictionary referencing them.
    fn insert_fonts_into_document(&mut self) -> lopdf::Dictionary {
        let mut font_dictionary = lopdf::Dictionary::new();

        for (resource_name, font_style) in &self.used_fonts {
            let active_font = self.typography.font(*font_style);
            let font = match active_font {
                ActiveFont::Embedded { font, .. } => {
                    let base_font = format!("ReportSans-{:?}", font_style);
                    font.to_pdf_dictionary(&mut self.inner_document, &base_font)
                }
                ActiveFont::Builtin(builtin_font) => builtin_font.to_pdf_dictionary(),
            };
            let font_id = self.inner_document.add_object(font);
            font_dictionary.set(resource_name.clone(), Object::Reference(font_id));
        }

        font_dictionary
    }
}

impl Canvas for PdfDocument {
    fn add_page(&mut self) -> Result<usize, ContextError> {
        self.pages.push(PdfPage::default());
        self.current_page = self.pages.len() - 1;

        Ok(self.current_page)
    }

    fn set_page(&mut self, page_index: usize) -> Result<(), ContextError> {
        if page_index >= self.pages.len() {
            return Err(ContextError::with_context(format!(
                "Failed to find the page with index {}, the document has {} pages",
                page_index,
                self.pages.len()
            )));
        }
        self.current_page = page_index;

        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self) -> [f32; 2] {
        self.page_size
    }

    fn fill_rectangle(
        &mut self,
        origin: [f32; 2],
        size: [f32; 2],
        color: Color,
    ) -> Result<(), ContextError> {
        let [x, y] = origin;
        let [width, height] = size;
        // The rectangle is anchored at its bottom-left corner in PDF coordinates
        let bottom = self.vertical_position(y + height);
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("rg", color_operands(color)),
            Operation::new(
                "re",
                vec![
                    millimeters_to_points(x).into(),
                    bottom.into(),
                    millimeters_to_points(width).into(),
                    millimeters_to_points(height).into(),
                ],
            ),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ];
        self.current_operations()?.extend(operations);

        Ok(())
    }

    fn draw_line(
        &mut self,
        from: [f32; 2],
        to: [f32; 2],
        color: Color,
    ) -> Result<(), ContextError> {
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("RG", color_operands(color)),
            Operation::new("w", vec![LINE_WIDTH.into()]),
            Operation::new(
                "m",
                vec![
                    millimeters_to_points(from[0]).into(),
                    self.vertical_position(from[1]).into(),
                ],
            ),
            Operation::new(
                "l",
                vec![
                    millimeters_to_points(to[0]).into(),
                    self.vertical_position(to[1]).into(),
                ],
            ),
            Operation::new("S", vec![]),
            Operation::new("Q", vec![]),
        ];
        self.current_operations()?.extend(operations);

        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: [f32; 2],
        style: &TextStyle,
    ) -> Result<(), ContextError> {
        let active_font = self.typography.font(style.font_style);
        let resource_name = active_font.resource_name();
        let encoded_text = active_font.encode(text);
        let [x, y] = position;

        let operations = vec![
            Operation::new("BT", vec![]), // Begin text section
            Operation::new(
                "Tf",
                vec![Object::Name(resource_name.clone().into_bytes()), style.size.into()],
            ),
            Operation::new("rg", color_operands(style.color)),
            Operation::new(
                "Td",
                vec![
                    millimeters_to_points(x).into(),
                    self.vertical_position(y).into(),
                ],
            ),
            Operation::new(
                "Tj",
                vec![Object::String(encoded_text, StringFormat::Hexadecimal)],
            ),
            Operation::new("ET", vec![]),
        ];
        self.current_operations()?.extend(operations);
        self.used_fonts.insert(resource_name, style.font_style);

        Ok(())
    }
}

fn color_operands(color: Color) -> Vec<Object> {
    color.to_unit_rgb().into_iter().map(Object::Real).collect()
}

/// A PDF text string: literal when the text is ASCII, UTF-16BE with a byte order mark otherwise.
fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    bytes.extend(text.encode_utf16().flat_map(u16::to_be_bytes));

    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Formats the given time so that it matches what the PDF specification expects.
/// An example of it is the following: D:20170505150224+02'00'.
fn to_pdf_timestamp_format(date: &OffsetDateTime) -> String {
    let offset = date.offset();
    let offset_sign = if offset.is_negative() { '-' } else { '+' };
    format!(
        "D:{:04}{:02}{:02}{:02}{:02}{:02}{offset_sign}{:02}'{:02}'",
        date.year(),
        u8::from(date.month()),
        date.day(),
        date.hour(),
        date.minute(),
        date.second(),
        offset.whole_hours().abs(),
        offset.minutes_past_hour().abs(),
    )
}
