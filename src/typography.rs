use std::{borrow::Cow, sync::Arc};

use unicode_normalization::UnicodeNormalization as _;

use crate::{
    canvas::Color,
    error::ContextError,
    fonts::{BuiltinFont, EmbeddedFont},
};

/// Font sizes are given in points while the layout works in millimetres.
pub const POINTS_TO_MILLIMETERS: f32 = 25.4 / 72.0;

/// The four faces of a font family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontStyle {
    Normal,
    Bold,
    Italic,
    BoldItalic,
}

impl FontStyle {
    pub const ALL: [FontStyle; 4] = [
        FontStyle::Normal,
        FontStyle::Bold,
        FontStyle::Italic,
        FontStyle::BoldItalic,
    ];

    pub fn index(self) -> usize {
        match self {
            FontStyle::Normal => 0,
            FontStyle::Bold => 1,
            FontStyle::Italic => 2,
            FontStyle::BoldItalic => 3,
        }
    }

    /// The built-in face with the same weight and slant.
    pub fn builtin(self) -> BuiltinFont {
        match self {
            FontStyle::Normal => BuiltinFont::Helvetica,
            FontStyle::Bold => BuiltinFont::HelveticaBold,
            FontStyle::Italic => BuiltinFont::HelveticaOblique,
            FontStyle::BoldItalic => BuiltinFont::HelveticaBoldOblique,
        }
    }
}

/// How a run of text looks: face, size in points and fill color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub font_style: FontStyle,
    pub size: f32,
    pub color: Color,
}

impl TextStyle {
    /// The brand title inside the header band.
    pub const HEADING_1: TextStyle = TextStyle::new(FontStyle::Bold, 24.0, Color::WHITE);
    /// Section titles.
    pub const HEADING_2: TextStyle = TextStyle::new(FontStyle::Bold, 16.0, Color::BRAND);
    pub const HEADING_3: TextStyle = TextStyle::new(FontStyle::Bold, 13.0, Color::BLACK);
    pub const BODY: TextStyle = TextStyle::new(FontStyle::Normal, 11.0, Color::BLACK);
    pub const SUBTOPIC_TITLE: TextStyle = TextStyle::new(FontStyle::Bold, 12.0, Color::BLACK);
    pub const FOOTER: TextStyle = TextStyle::new(FontStyle::Normal, 8.0, Color::SUBDUED);

    pub const fn new(font_style: FontStyle, size: f32, color: Color) -> TextStyle {
        TextStyle {
            font_style,
            size,
            color,
        }
    }

    pub const fn with_color(self, color: Color) -> TextStyle {
        TextStyle { color, ..self }
    }

    pub const fn with_font_style(self, font_style: FontStyle) -> TextStyle {
        TextStyle { font_style, ..self }
    }
}

/// Raw TrueType font files for the faces of one family. Only `regular` is required to switch
/// the report to embedded fonts.
#[derive(Clone, Debug, Default)]
pub struct FontData {
    pub regular: Option<Vec<u8>>,
    pub bold: Option<Vec<u8>>,
    pub italic: Option<Vec<u8>>,
    pub bold_italic: Option<Vec<u8>>,
}

/// A parsed font family. Faces other than the regular one are optional.
#[derive(Debug)]
pub struct FontSet {
    regular: EmbeddedFont,
    bold: Option<EmbeddedFont>,
    italic: Option<EmbeddedFont>,
    bold_italic: Option<EmbeddedFont>,
}

impl FontSet {
    /// Parses the family. A broken or missing regular face is an error; a broken optional face
    /// is logged and left out, so that style uses the built-in font instead.
    pub fn from_font_data(font_data: &FontData) -> Result<FontSet, ContextError> {
        let regular_bytes = font_data
            .regular
            .clone()
            .ok_or_else(|| ContextError::with_context("No regular font face was provided"))?;
        let regular = EmbeddedFont::from_bytes(regular_bytes).map_err(|error| {
            ContextError::with_error("Unable to register the regular font face", &error)
        })?;

        let optional_face = |bytes: &Option<Vec<u8>>, style: FontStyle| {
            let bytes = bytes.clone()?;
            EmbeddedFont::from_bytes(bytes)
                .map_err(|error| {
                    log::warn!(
                        "Unable to register the {:?} font face, falling back to {}: {}",
                        style,
                        style.builtin().base_font_name(),
                        error
                    )
                })
                .ok()
        };

        Ok(FontSet {
            regular,
            bold: optional_face(&font_data.bold, FontStyle::Bold),
            italic: optional_face(&font_data.italic, FontStyle::Italic),
            bold_italic: optional_face(&font_data.bold_italic, FontStyle::BoldItalic),
        })
    }

    pub fn face(&self, font_style: FontStyle) -> Option<&EmbeddedFont> {
        match font_style {
            FontStyle::Normal => Some(&self.regular),
            FontStyle::Bold => self.bold.as_ref(),
            FontStyle::Italic => self.italic.as_ref(),
            FontStyle::BoldItalic => self.bold_italic.as_ref(),
        }
    }
}

/// The font that actually draws a given style.
#[derive(Clone, Copy, Debug)]
pub enum ActiveFont<'a> {
    Embedded {
        font_style: FontStyle,
        font: &'a EmbeddedFont,
    },
    Builtin(BuiltinFont),
}

impl ActiveFont<'_> {
    /// The name of the font in the page resources. Embedded faces are `F0..F3` and built-in
    /// faces `H0..H3`, both indexed by style.
    pub fn resource_name(&self) -> String {
        match self {
            ActiveFont::Embedded { font_style, .. } => format!("F{}", font_style.index()),
            ActiveFont::Builtin(builtin_font) => {
                let index = FontStyle::ALL
                    .iter()
                    .position(|font_style| font_style.builtin() == *builtin_font)
                    .unwrap_or(0);
                format!("H{index}")
            }
        }
    }

    /// Text width in points.
    pub fn text_width(&self, text: &str, font_size: f32) -> f32 {
        match self {
            ActiveFont::Embedded { font, .. } => font.text_width(text, font_size),
            ActiveFont::Builtin(builtin_font) => builtin_font.text_width(text, font_size),
        }
    }

    /// The bytes of a PDF string operand drawing the text with this font.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            ActiveFont::Embedded { font, .. } => font.encode(text),
            ActiveFont::Builtin(builtin_font) => builtin_font.encode(text),
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, ActiveFont::Builtin(_))
    }
}

/// The typography of one report, decided once when the generator is built.
#[derive(Clone, Debug)]
pub enum Typography {
    /// A Unicode font family embedded in the document.
    Embedded(Arc<FontSet>),
    /// The built-in Helvetica family. Text is sanitized down to what it can draw.
    Builtin,
}

impl Typography {
    /// Registers the given fonts, degrading to the built-in family when none are given or the
    /// regular face cannot be parsed.
    pub fn from_font_data(font_data: Option<&FontData>) -> Typography {
        let Some(font_data) = font_data.filter(|font_data| font_data.regular.is_some()) else {
            log::debug!("No custom font provided, using the built-in Helvetica family");
            return Typography::Builtin;
        };

        match FontSet::from_font_data(font_data) {
            Ok(font_set) => Typography::Embedded(Arc::new(font_set)),
            Err(error) => {
                log::warn!(
                    "Custom font registration failed, falling back to Helvetica: {}",
                    error
                );
                Typography::Builtin
            }
        }
    }

    pub fn is_embedded(&self) -> bool {
        matches!(self, Typography::Embedded(_))
    }

    pub fn font(&self, font_style: FontStyle) -> ActiveFont<'_> {
        match self {
            Typography::Embedded(font_set) => match font_set.face(font_style) {
                Some(font) => ActiveFont::Embedded { font_style, font },
                None => ActiveFont::Builtin(font_style.builtin()),
            },
            Typography::Builtin => ActiveFont::Builtin(font_style.builtin()),
        }
    }

    /// The text as it will be drawn in the given style: untouched for embedded faces and
    /// sanitized for the built-in ones.
    pub fn prepare<'t>(&self, text: &'t str, font_style: FontStyle) -> Cow<'t, str> {
        if self.font(font_style).is_builtin() {
            sanitize_for_builtin(text)
        } else {
            Cow::Borrowed(text)
        }
    }

    /// Width in millimetres of already prepared text.
    pub fn text_width(&self, text: &str, style: &TextStyle) -> f32 {
        self.font(style.font_style).text_width(text, style.size) * POINTS_TO_MILLIMETERS
    }
}

/// Whether the built-in fonts can draw the character untouched.
fn is_builtin_safe(character: char) -> bool {
    matches!(character, '\t' | '\n' | '\r' | ' '..='~' | '•')
}

/// Reduces text to what the built-in fonts can draw: bullet variants become `•`, en and em
/// dashes become `-`, curly quotes become straight ones, accented letters lose their accents
/// and every other character outside printable ASCII (plus tab, newline and carriage return)
/// is removed.
pub fn sanitize_for_builtin(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_builtin_safe) {
        return Cow::Borrowed(text);
    }

    let sanitized = text
        .nfd()
        .filter_map(|character| match character {
            '•' | '‣' | '▪' | '◦' | '●' => Some('•'),
            '–' | '—' => Some('-'),
            '“' | '”' | '„' | '‟' => Some('"'),
            '‘' | '’' => Some('\''),
            character if is_builtin_safe(character) => Some(character),
            _ => None,
        })
        .collect();

    Cow::Owned(sanitized)
}
