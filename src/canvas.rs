use crate::{error::ContextError, typography::TextStyle};

/// An RGB color with 8-bit channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const BRAND: Color = Color::rgb(99, 102, 241);
    pub const POSITIVE: Color = Color::rgb(34, 197, 94);
    pub const NEGATIVE: Color = Color::rgb(239, 68, 68);
    pub const INFORMATIONAL: Color = Color::rgb(59, 130, 246);
    pub const MUTED: Color = Color::rgb(80, 80, 80);
    pub const SUBDUED: Color = Color::rgb(100, 100, 100);
    pub const DIVIDER: Color = Color::rgb(200, 200, 200);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Color {
        Color { red, green, blue }
    }

    /// The color with its channels in the `0.0..=1.0` range, as the PDF color operators expect.
    pub fn to_unit_rgb(self) -> [f32; 3] {
        [self.red, self.green, self.blue].map(|channel| f32::from(channel) / 255.0)
    }
}

/// A page-oriented drawing surface. Coordinates are in millimetres, measured from the top-left
/// corner of the page, and text positions are baselines.
///
/// Drawing always happens on the current page; `add_page` appends a page and makes it current,
/// `set_page` moves back to an existing one.
pub trait Canvas {
    /// Appends a page and makes it the current one, returning its index.
    fn add_page(&mut self) -> Result<usize, ContextError>;

    /// Makes the page with the given index the current one.
    fn set_page(&mut self, page_index: usize) -> Result<(), ContextError>;

    fn page_count(&self) -> usize;

    /// Page size in millimetres as `[width, height]`.
    fn page_size(&self) -> [f32; 2];

    fn fill_rectangle(
        &mut self,
        origin: [f32; 2],
        size: [f32; 2],
        color: Color,
    ) -> Result<(), ContextError>;

    fn draw_line(&mut self, from: [f32; 2], to: [f32; 2], color: Color)
        -> Result<(), ContextError>;

    /// Writes a single line of text with its baseline starting at `position`.
    fn draw_text(
        &mut self,
        text: &str,
        position: [f32; 2],
        style: &TextStyle,
    ) -> Result<(), ContextError>;
}
