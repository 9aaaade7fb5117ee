use lopdf::{Dictionary, Object, StringFormat};
use owned_ttf_parser::{AsFaceRef as _, Face, OwnedFace};
use std::{collections::BTreeMap, mem, sync::Arc};
use unicode_normalization::UnicodeNormalization as _;

use crate::error::ContextError;

/// The (insofar) relevant vertical metrics of a font, expressed in font units.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct FontMetrics {
    /// The ascent of the font.
    pub ascent: i16,
    /// The descent of the font.
    pub descent: i16,
    /// The number of units per em of the font.
    pub units_per_em: u16,
}

/// A font face loaded from a TTF font, together with its measure of units per em.
#[derive(Clone, Debug)]
struct TtfFontFace {
    /// The underlying font face which is represented through the `ttf_parser` crate.
    inner: Arc<OwnedFace>,
    /// The number of units per em of the font face.
    units_per_em: u16,
}

impl TtfFontFace {
    /// Constructs a font face from the underlying raw data extracted from the TTF font file.
    fn from_bytes(data: Vec<u8>) -> Result<Self, ContextError> {
        let face = OwnedFace::from_vec(data, 0)
            .map_err(|error| ContextError::with_error("Failed to parse the font face", &error))?;
        let units_per_em = face.as_face_ref().units_per_em();
        if units_per_em == 0 {
            return Err(ContextError::with_context(
                "The font face declares zero units per em",
            ));
        }

        Ok(Self {
            inner: Arc::new(face),
            units_per_em,
        })
    }

    /// Retrieve the underlying font face as a reference.
    fn face(&self) -> &Face<'_> {
        self.inner.as_face_ref()
    }

    fn font_metrics(&self) -> FontMetrics {
        FontMetrics {
            ascent: self.face().ascender(),
            descent: self.face().descender(),
            units_per_em: self.units_per_em,
        }
    }

    fn glyph_id(&self, codepoint: char) -> Option<u16> {
        self.face()
            .glyph_index(codepoint)
            .map(|glyph_id| glyph_id.0)
    }

    /// The horizontal advance of a glyph in font units.
    fn glyph_advance(&self, glyph_id: u16) -> Option<u16> {
        self.face()
            .glyph_hor_advance(owned_ttf_parser::GlyphId(glyph_id))
    }

    fn glyph_count(&self) -> u16 {
        self.face().number_of_glyphs()
    }

    /// Retrieve the mapping between the glyph IDs and the characters (codepoints) from every
    /// unicode subtable of the font. The first character found for a glyph wins.
    fn glyph_characters(&self) -> BTreeMap<u16, char> {
        let mut glyph_characters = BTreeMap::new();
        let Some(cmap) = self.face().tables().cmap else {
            return glyph_characters;
        };

        for subtable in cmap
            .subtables
            .into_iter()
            .filter(|subtable| subtable.is_unicode())
        {
            subtable.codepoints(|codepoint| {
                let Some(character) = char::from_u32(codepoint) else {
                    return;
                };
                // Glyph 0 is `.notdef` and never maps back to a character
                if let Some(glyph_index) = subtable
                    .glyph_index(codepoint)
                    .filter(|index| index.0 > 0)
                {
                    glyph_characters.entry(glyph_index.0).or_insert(character);
                }
            });
        }

        glyph_characters
    }
}

/// A TrueType font that is embedded into the PDF document and addressed through glyph IDs
/// (`Identity-H` encoding), so any character the font covers can be drawn.
#[derive(Clone, Debug)]
pub struct EmbeddedFont {
    /// The byte data the font was loaded from, embedded verbatim as `FontFile2`.
    bytes: Arc<Vec<u8>>,
    ttf_face: TtfFontFace,
}

impl EmbeddedFont {
    /// Parses a TTF (or TTF-flavoured OTF) font from its raw bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ContextError> {
        let ttf_face = TtfFontFace::from_bytes(bytes.clone())?;

        Ok(Self {
            bytes: Arc::new(bytes),
            ttf_face,
        })
    }

    /// The rendered width of the text in points. Characters missing from the font are measured
    /// with the `.notdef` glyph, which `encode` draws in their place.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text
            .nfc()
            .map(|character| {
                let glyph_id = self.ttf_face.glyph_id(character).unwrap_or(0);
                u32::from(self.ttf_face.glyph_advance(glyph_id).unwrap_or(0))
            })
            .sum();

        units as f32 * font_size / f32::from(self.ttf_face.units_per_em)
    }

    /// Encodes the text as big-endian glyph IDs, as expected by the `Identity-H` encoding.
    /// Characters missing from the font become the `.notdef` glyph, matching `text_width`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        let mut glyph_id_bytes = Vec::with_capacity(text.len() * 2);
        // Normalize the text in the NFC form before looking up the glyphs
        for character in text.nfc() {
            let glyph_id = self.ttf_face.glyph_id(character).unwrap_or_else(|| {
                log::warn!("Unable to find the character {:?} in the font", character);
                0
            });
            glyph_id_bytes.extend_from_slice(&glyph_id.to_be_bytes());
        }

        glyph_id_bytes
    }

    /// Inserts the font program, its descriptor and its `ToUnicode` map into the document and
    /// returns the `Type0` font dictionary referencing them.
    pub(crate) fn to_pdf_dictionary(
        &self,
        inner_document: &mut lopdf::Document,
        base_font: &str,
    ) -> Dictionary {
        use lopdf::Object::*;

        let face_metrics = self.ttf_face.font_metrics();
        // Widths in PDF fonts are expressed in thousandths of an em
        let scaling = 1000.0 / f32::from(face_metrics.units_per_em);
        let scaled = |value: f32| Integer((value * scaling).round() as i64);

        // Glyph IDs sharing the same high byte are grouped into `bfchar` blocks of at most 100 entries
        let mut cmap_blocks: Vec<CmapBlock> = Vec::new();
        let mut current_block = CmapBlock::new();
        let mut current_high_byte = 0;
        for (glyph_id, character) in self.ttf_face.glyph_characters() {
            if glyph_id >> 8 != current_high_byte || current_block.len() >= 100 {
                if !current_block.is_empty() {
                    cmap_blocks.push(mem::take(&mut current_block));
                }
                current_high_byte = glyph_id >> 8;
            }
            current_block.push((glyph_id, character));
        }
        if !current_block.is_empty() {
            cmap_blocks.push(current_block);
        }

        let cid_to_unicode_map = generate_cid_to_unicode_map(base_font, &cmap_blocks);
        let cid_to_unicode_map_id = inner_document.add_object(lopdf::Stream::new(
            lopdf::Dictionary::new(),
            cid_to_unicode_map.into_bytes(),
        ));

        // The `W` array lists consecutive runs of glyph widths: `first [w1 w2 ...]`
        let mut width_objects = Vec::<Object>::new();
        let mut run_start: Option<u16> = None;
        let mut run_widths = Vec::<Object>::new();
        for glyph_id in 0..self.ttf_face.glyph_count() {
            match self.ttf_face.glyph_advance(glyph_id) {
                Some(advance) => {
                    run_start.get_or_insert(glyph_id);
                    run_widths.push(scaled(f32::from(advance)));
                }
                None => {
                    log::warn!(
                        "Glyph ID {} of the font {:?} has no width, leaving it out of the widths array",
                        glyph_id,
                        base_font
                    );
                    if let Some(start) = run_start.take() {
                        width_objects.push(Integer(i64::from(start)));
                        width_objects.push(Array(mem::take(&mut run_widths)));
                    }
                }
            }
        }
        if let Some(start) = run_start {
            width_objects.push(Integer(i64::from(start)));
            width_objects.push(Array(run_widths));
        }

        let bounding_box = self.ttf_face.face().global_bounding_box();
        let font_stream = lopdf::Stream::new(
            lopdf::Dictionary::from_iter(vec![("Length1", Integer(self.bytes.len() as i64))]),
            self.bytes.to_vec(),
        )
        .with_compression(false);

        let font_descriptor = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("FontDescriptor".into())),
            ("FontName", Name(base_font.into())),
            ("Ascent", scaled(f32::from(face_metrics.ascent))),
            ("Descent", scaled(f32::from(face_metrics.descent))),
            ("CapHeight", scaled(f32::from(face_metrics.ascent))),
            ("ItalicAngle", Integer(0)),
            // Nonsymbolic: the font uses the standard Latin character set or a subset of it
            ("Flags", Integer(32)),
            ("StemV", Integer(80)),
            (
                "FontBBox",
                Array(vec![
                    scaled(f32::from(bounding_box.x_min)),
                    scaled(f32::from(bounding_box.y_min)),
                    scaled(f32::from(bounding_box.x_max)),
                    scaled(f32::from(bounding_box.y_max)),
                ]),
            ),
            ("FontFile2", Reference(inner_document.add_object(font_stream))),
        ]);
        let font_descriptor_id = inner_document.add_object(font_descriptor);

        let default_width = self
            .ttf_face
            .glyph_advance(0)
            .map_or(Integer(1000), |advance| scaled(f32::from(advance)));
        let descendant_font = lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("CIDFontType2".into())),
            ("BaseFont", Name(base_font.into())),
            (
                "CIDSystemInfo",
                Dictionary(lopdf::Dictionary::from_iter(vec![
                    ("Registry", String("Adobe".into(), StringFormat::Literal)),
                    ("Ordering", String("Identity".into(), StringFormat::Literal)),
                    ("Supplement", Integer(0)),
                ])),
            ),
            ("CIDToGIDMap", Name("Identity".into())),
            ("FontDescriptor", Reference(font_descriptor_id)),
            ("W", Array(width_objects)),
            ("DW", default_width),
        ]);

        lopdf::Dictionary::from_iter(vec![
            ("Type", Name("Font".into())),
            ("Subtype", Name("Type0".into())),
            ("BaseFont", Name(base_font.into())),
            // `Identity-H` is used for horizontal writing, `Identity-V` would be for vertical writing
            ("Encoding", Name("Identity-H".into())),
            ("DescendantFonts", Array(vec![Dictionary(descendant_font)])),
            ("ToUnicode", Reference(cid_to_unicode_map_id)),
        ])
    }
}

type CmapBlock = Vec<(u16, char)>;

const CMAP_PROLOGUE: &str = "/CIDInit /ProcSet findresource begin\n\
12 dict begin\n\
begincmap\n\
/CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
/CMapName /{face_name}-UCS def\n\
/CMapType 2 def\n\
1 begincodespacerange\n\
<0000> <FFFF>\n\
endcodespacerange\n";

const CMAP_EPILOGUE: &str = "endcmap\n\
CMapName currentdict /CMap defineresource pop\n\
end\n\
end\n";

/// Generates a CMap (character map) from the glyph-to-character blocks, so that viewers can
/// extract the text back from the glyph IDs. Characters outside the basic multilingual plane
/// are written as UTF-16 surrogate pairs.
fn generate_cid_to_unicode_map(face_name: &str, cmap_blocks: &[CmapBlock]) -> String {
    let mut cid_to_unicode_map = CMAP_PROLOGUE.replace("{face_name}", face_name);

    for cmap_block in cmap_blocks.iter().filter(|block| !block.is_empty()) {
        cid_to_unicode_map.push_str(&format!("{} beginbfchar\n", cmap_block.len()));
        for (glyph_id, character) in cmap_block {
            let mut utf16 = [0u16; 2];
            let unicode = character
                .encode_utf16(&mut utf16)
                .iter()
                .map(|unit| format!("{unit:04x}"))
                .collect::<String>();
            cid_to_unicode_map.push_str(&format!("<{glyph_id:04x}> <{unicode}>\n"));
        }
        cid_to_unicode_map.push_str("endbfchar\n");
    }

    cid_to_unicode_map.push_str(CMAP_EPILOGUE);
    cid_to_unicode_map
}

/// Advance widths of the printable ASCII range (32..=126) for Helvetica and Helvetica-Oblique,
/// in thousandths of an em, taken from the Adobe core font metrics (WinAnsi glyph names).
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Same as `HELVETICA_WIDTHS`, for Helvetica-Bold and Helvetica-BoldOblique.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// The bullet sits at 0x95 in WinAnsiEncoding and is 350 units wide in every Helvetica style.
const BULLET_CODE: u8 = 0x95;
const BULLET_WIDTH: u16 = 350;

/// The Helvetica family every PDF viewer ships with. These fonts are not embedded and only
/// cover the WinAnsi character set, of which only printable ASCII and the bullet are used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuiltinFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
}

impl BuiltinFont {
    pub fn base_font_name(self) -> &'static str {
        match self {
            BuiltinFont::Helvetica => "Helvetica",
            BuiltinFont::HelveticaBold => "Helvetica-Bold",
            BuiltinFont::HelveticaOblique => "Helvetica-Oblique",
            BuiltinFont::HelveticaBoldOblique => "Helvetica-BoldOblique",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            BuiltinFont::Helvetica | BuiltinFont::HelveticaOblique => &HELVETICA_WIDTHS,
            BuiltinFont::HelveticaBold | BuiltinFont::HelveticaBoldOblique => {
                &HELVETICA_BOLD_WIDTHS
            }
        }
    }

    /// The WinAnsi code of a character, if the font can draw it. Tabs are drawn as spaces.
    fn character_code(character: char) -> Option<u8> {
        match character {
            ' '..='~' => Some(character as u8),
            '\t' => Some(b' '),
            '•' => Some(BULLET_CODE),
            _ => None,
        }
    }

    /// Width of a single character in thousandths of an em.
    pub fn character_width(self, character: char) -> Option<u16> {
        match Self::character_code(character)? {
            BULLET_CODE => Some(BULLET_WIDTH),
            code => Some(self.widths()[usize::from(code - b' ')]),
        }
    }

    /// The rendered width of the text in points. Characters the font cannot draw are dropped
    /// by `encode`, so they take no space.
    pub fn text_width(self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text
            .chars()
            .filter_map(|character| self.character_width(character))
            .map(u32::from)
            .sum();

        units as f32 * font_size / 1000.0
    }

    /// Encodes the text in WinAnsiEncoding, leaving out what the font cannot draw.
    pub fn encode(self, text: &str) -> Vec<u8> {
        text.chars()
            .filter_map(|character| {
                let code = Self::character_code(character);
                if code.is_none() {
                    log::warn!(
                        "The character {:?} cannot be drawn with {}, leaving it out",
                        character,
                        self.base_font_name()
                    );
                }
                code
            })
            .collect()
    }

    pub(crate) fn to_pdf_dictionary(self) -> Dictionary {
        Dictionary::from_iter(vec![
            ("Type", Object::Name("Font".into())),
            ("Subtype", Object::Name("Type1".into())),
            ("BaseFont", Object::Name(self.base_font_name().into())),
            ("Encoding", Object::Name("WinAnsiEncoding".into())),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_widths_follow_the_core_metrics() {
        assert_eq!(BuiltinFont::Helvetica.character_width(' '), Some(278));
        assert_eq!(BuiltinFont::Helvetica.character_width('W'), Some(944));
        assert_eq!(BuiltinFont::HelveticaBold.character_width('b'), Some(611));
        assert_eq!(BuiltinFont::HelveticaOblique.character_width('i'), Some(222));
        assert_eq!(BuiltinFont::Helvetica.character_width('•'), Some(350));
        assert_eq!(BuiltinFont::Helvetica.character_width('é'), None);
    }

    #[test]
    fn builtin_text_width_scales_with_the_font_size() {
        // "Hi" is 722 + 222 units wide
        let width = BuiltinFont::Helvetica.text_width("Hi", 10.0);
        assert!((width - 9.44).abs() < 1e-4, "{width}");
    }

    #[test]
    fn builtin_encoding_keeps_ascii_and_the_bullet() {
        let bytes = BuiltinFont::Helvetica.encode("•\tA – b");
        assert_eq!(bytes, vec![0x95, b' ', b'A', b' ', b' ', b'b']);
    }

    #[test]
    fn invalid_font_bytes_are_rejected() {
        let error = EmbeddedFont::from_bytes(b"definitely not a font".to_vec()).unwrap_err();
        assert!(error.to_string().starts_with("Failed to parse the font face"));
    }

    /// Uses a system font when one is installed, since none is shipped with the crate.
    #[test]
    fn missing_characters_are_drawn_as_measured() {
        let font_path = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";
        let Ok(bytes) = std::fs::read(font_path) else {
            eprintln!("Skipping, {font_path} is not installed");
            return;
        };
        let font = EmbeddedFont::from_bytes(bytes).unwrap();
        let missing = '\u{10FFFD}';

        let encoded = font.encode(&format!("a{missing}"));
        assert_eq!(encoded.len(), 4);
        assert_eq!(&encoded[2..], &[0, 0]);

        let notdef_width = f32::from(font.ttf_face.glyph_advance(0).unwrap_or(0)) * 10.0
            / f32::from(font.ttf_face.units_per_em);
        let width = font.text_width(&format!("a{missing}"), 10.0);
        assert!((width - font.text_width("a", 10.0) - notdef_width).abs() < 1e-3);
    }

    #[test]
    fn cmap_writes_one_block_per_group() {
        let blocks = vec![vec![(3, 'A'), (4, 'B')], vec![(0x0100, '😀')]];
        let cmap = generate_cid_to_unicode_map("F0", &blocks);

        assert!(cmap.contains("/CMapName /F0-UCS def"));
        assert!(cmap.contains("2 beginbfchar\n<0003> <0041>\n<0004> <0042>\nendbfchar"));
        assert!(cmap.contains("<0100> <d83dde00>"));
        assert!(cmap.ends_with("end\nend\n"));
    }
}
