use crate::{
    canvas::{Canvas, Color},
    error::ContextError,
    typography::{FontStyle, TextStyle, Typography},
};

/// Fixed page geometry, in millimetres.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    /// Left, right and top margin.
    pub margin: f32,
    pub bottom_margin: f32,
    /// Height of the colored band at the top of the first page.
    pub header_height: f32,
    pub section_gap: f32,
    pub line_height: f32,
}

impl PageGeometry {
    /// A4 portrait.
    pub const A4: PageGeometry = PageGeometry {
        width: 210.0,
        height: 297.0,
        margin: 20.0,
        bottom_margin: 30.0,
        header_height: 40.0,
        section_gap: 14.0,
        line_height: 6.0,
    };

    pub fn content_width(&self) -> f32 {
        self.width - self.margin * 2.0
    }

    /// The lowest baseline content may reach before a page break.
    pub fn content_limit(&self) -> f32 {
        self.height - self.bottom_margin
    }
}

/// The vertical write position on the current page.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutCursor {
    pub y: f32,
}

/// Greedily wraps the text into lines no wider than `maximum_width`, as measured by `measure`.
///
/// Words are whitespace-delimited and rejoined with single spaces; newlines force a break. A word
/// wider than the whole line is split between characters. Empty text yields a single empty line.
pub fn wrap_text(text: &str, maximum_width: f32, measure: impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current_line = String::new();

        for word in paragraph.split_whitespace() {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            if measure(&candidate) <= maximum_width {
                current_line = candidate;
                continue;
            }

            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            if measure(word) <= maximum_width {
                current_line = word.to_string();
            } else {
                let mut pieces = split_long_word(word, maximum_width, &measure);
                current_line = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }

        lines.push(current_line);
    }

    // Trailing newlines only end the text, they do not add lines of their own
    while lines.len() > 1 && lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Breaks a single word into pieces that each fit into `maximum_width`. A character wider than
/// the limit on its own still gets a piece, since it cannot be split further.
fn split_long_word(word: &str, maximum_width: f32, measure: &impl Fn(&str) -> f32) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current_piece = String::new();

    for character in word.chars() {
        current_piece.push(character);
        if measure(&current_piece) > maximum_width && current_piece.chars().count() > 1 {
            current_piece.pop();
            pieces.push(std::mem::take(&mut current_piece));
            current_piece.push(character);
        }
    }
    pieces.push(current_piece);

    pieces
}

/// The text itself when it fits into `maximum_width`, otherwise its longest prefix that still
/// fits once followed by `...`.
pub fn truncate_text(text: &str, maximum_width: f32, measure: impl Fn(&str) -> f32) -> String {
    if measure(text) <= maximum_width {
        return text.to_string();
    }

    let mut prefix = text.to_string();
    while prefix.pop().is_some() {
        let candidate = format!("{}...", prefix.trim_end());
        if measure(&candidate) <= maximum_width {
            return candidate;
        }
    }

    String::new()
}

/// The three heading levels of the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadingLevel {
    Title,
    Section,
    Subsection,
}

impl HeadingLevel {
    pub fn style(self) -> TextStyle {
        match self {
            HeadingLevel::Title => TextStyle::HEADING_1,
            HeadingLevel::Section => TextStyle::HEADING_2,
            HeadingLevel::Subsection => TextStyle::HEADING_3,
        }
    }

    fn gap_after(self) -> f32 {
        match self {
            HeadingLevel::Title => 4.0,
            HeadingLevel::Section | HeadingLevel::Subsection => 2.0,
        }
    }
}

/// Where and how a paragraph is drawn.
#[derive(Clone, Copy, Debug)]
pub struct ParagraphOptions {
    /// Horizontal offset from the left margin.
    pub indent: f32,
    pub style: TextStyle,
    pub gap_after: f32,
}

impl Default for ParagraphOptions {
    fn default() -> Self {
        ParagraphOptions {
            indent: 0.0,
            style: TextStyle::BODY,
            gap_after: 4.0,
        }
    }
}

impl ParagraphOptions {
    pub fn styled(style: TextStyle, gap_after: f32) -> Self {
        ParagraphOptions {
            style,
            gap_after,
            ..ParagraphOptions::default()
        }
    }
}

/// Offset of the bullet from the margin.
const BULLET_INDENT: f32 = 6.0;
/// Space between the bullet and the item text.
const BULLET_TEXT_INDENT: f32 = 4.0;
/// Offset of a choice label from the margin.
const CHOICE_LABEL_INDENT: f32 = 6.0;
/// Space between a choice label and the choice text.
const CHOICE_TEXT_INDENT: f32 = 10.0;

/// Lays out blocks of text top to bottom on a canvas, breaking pages whenever the next block
/// would cross the bottom margin.
///
/// Every text-emitting method checks the space for its whole block before drawing anything, so
/// a heading, a bullet item or a quiz choice never straddles two pages. A block taller than the
/// content area cannot be kept together and breaks between its lines instead.
pub struct Composer<'a, C: Canvas> {
    canvas: &'a mut C,
    typography: &'a Typography,
    geometry: PageGeometry,
    cursor: LayoutCursor,
}

impl<'a, C: Canvas> Composer<'a, C> {
    /// Starts composing on the canvas, creating the first page if the canvas has none, and
    /// paints its background. The page width and height are taken from the canvas, the margins
    /// and spacing from `geometry`.
    pub fn new(
        canvas: &'a mut C,
        typography: &'a Typography,
        geometry: PageGeometry,
    ) -> Result<Self, ContextError> {
        if canvas.page_count() == 0 {
            canvas.add_page()?;
        }
        let [width, height] = canvas.page_size();
        let geometry = PageGeometry {
            width,
            height,
            ..geometry
        };
        let mut composer = Composer {
            canvas,
            typography,
            geometry,
            cursor: LayoutCursor { y: geometry.margin },
        };
        composer.paint_background()?;

        Ok(composer)
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn typography(&self) -> &Typography {
        self.typography
    }

    pub fn canvas(&mut self) -> &mut C {
        &mut *self.canvas
    }

    /// Moves the cursor to an absolute position on the current page.
    pub fn move_to(&mut self, y: f32) {
        self.cursor.y = y;
    }

    /// Adds vertical space below the last block.
    pub fn advance(&mut self, height: f32) {
        self.cursor.y += height;
    }

    /// Fills the whole current page with white, so nothing shows through from below.
    pub fn paint_background(&mut self) -> Result<(), ContextError> {
        let geometry = self.geometry;
        self.canvas.fill_rectangle(
            [0.0, 0.0],
            [geometry.width, geometry.height],
            Color::WHITE,
        )
    }

    /// Starts a new page when a block of the given height would cross the bottom margin.
    pub fn ensure_space(&mut self, block_height: f32) -> Result<(), ContextError> {
        if self.cursor.y + block_height <= self.geometry.content_limit() {
            return Ok(());
        }

        let page_index = self.canvas.add_page()?;
        log::debug!(
            "Breaking to page {} for a block of {:.1}mm at y = {:.1}mm",
            page_index + 1,
            block_height,
            self.cursor.y
        );
        self.paint_background()?;
        self.cursor.y = self.geometry.margin;

        Ok(())
    }

    /// Reserves the space for a block of lines. Returns `true` when the block is taller than a
    /// whole page, in which case the caller has to check the space before each of its lines.
    fn reserve_lines(&mut self, line_count: usize) -> Result<bool, ContextError> {
        let block_height = line_count as f32 * self.geometry.line_height;
        if block_height > self.geometry.content_limit() - self.geometry.margin {
            return Ok(true);
        }
        self.ensure_space(block_height)?;

        Ok(false)
    }

    /// Wraps already prepared text to the given width in the given style.
    pub fn wrap(&self, text: &str, width: f32, style: &TextStyle) -> Vec<String> {
        wrap_text(text, width, |candidate| {
            self.typography.text_width(candidate, style)
        })
    }

    /// Shortens already prepared text to the given width in the given style.
    pub fn fit_to_width(&self, text: &str, width: f32, style: &TextStyle) -> String {
        truncate_text(text, width, |candidate| {
            self.typography.text_width(candidate, style)
        })
    }

    fn draw_line_of_text(&mut self, text: &str, x: f32, style: &TextStyle) -> Result<(), ContextError> {
        if text.is_empty() {
            return Ok(());
        }
        self.canvas.draw_text(text, [x, self.cursor.y], style)
    }

    /// A wrapped paragraph. The space for all of its lines is checked at once, unless they do
    /// not fit on a single page.
    pub fn paragraph(&mut self, text: &str, options: &ParagraphOptions) -> Result<(), ContextError> {
        let text = self.typography.prepare(text, options.style.font_style);
        let width = self.geometry.content_width() - options.indent;
        let lines = self.wrap(&text, width, &options.style);

        let line_by_line = self.reserve_lines(lines.len())?;
        let x = self.geometry.margin + options.indent;
        for line in &lines {
            if line_by_line {
                self.ensure_space(self.geometry.line_height)?;
            }
            self.draw_line_of_text(line, x, &options.style)?;
            self.cursor.y += self.geometry.line_height;
        }
        self.cursor.y += options.gap_after;

        Ok(())
    }

    /// A single-line heading at the left margin, cut short when wider than the content area.
    pub fn heading(&mut self, text: &str, level: HeadingLevel) -> Result<(), ContextError> {
        let style = level.style();
        let text = single_line(&self.typography.prepare(text, style.font_style));
        let text = self.fit_to_width(&text, self.geometry.content_width(), &style);

        self.ensure_space(self.geometry.line_height + 2.0)?;
        self.draw_line_of_text(&text, self.geometry.margin, &style)?;
        self.cursor.y += self.geometry.line_height + level.gap_after();

        Ok(())
    }

    /// `key: value` lines in the body style, followed by half a section gap. A line wider than
    /// the content area wraps onto the next one.
    pub fn key_values(&mut self, lines: &[String]) -> Result<(), ContextError> {
        let style = TextStyle::BODY;
        let width = self.geometry.content_width();
        for line in lines {
            let line = single_line(&self.typography.prepare(line, style.font_style));
            for wrapped_line in self.wrap(&line, width, &style) {
                self.ensure_space(self.geometry.line_height)?;
                self.draw_line_of_text(&wrapped_line, self.geometry.margin, &style)?;
                self.cursor.y += self.geometry.line_height;
            }
        }
        self.cursor.y += self.geometry.section_gap / 2.0;

        Ok(())
    }

    /// A bulleted list. Blank items are skipped; each item is one block whose continuation lines
    /// align under its text rather than under the bullet.
    pub fn bulleted_list<S: AsRef<str>>(
        &mut self,
        items: &[S],
        color: Color,
    ) -> Result<(), ContextError> {
        let style = TextStyle::BODY.with_color(color);
        let bullet_x = self.geometry.margin + BULLET_INDENT;
        let text_x = bullet_x + BULLET_TEXT_INDENT;
        let text_width = self.geometry.content_width() - BULLET_INDENT - BULLET_TEXT_INDENT;
        let bullet = self.typography.prepare("•", style.font_style).into_owned();

        for item in items.iter() {
            let item = self.typography.prepare(item.as_ref(), style.font_style);
            // Also drops items the built-in fonts cannot draw any character of
            if item.trim().is_empty() {
                continue;
            }
            let lines = self.wrap(&item, text_width, &style);

            let line_by_line = self.reserve_lines(lines.len())?;
            for (line_index, line) in lines.iter().enumerate() {
                if line_by_line {
                    self.ensure_space(self.geometry.line_height)?;
                }
                if line_index == 0 {
                    self.draw_line_of_text(&bullet, bullet_x, &style)?;
                }
                self.draw_line_of_text(line, text_x, &style)?;
                self.cursor.y += self.geometry.line_height;
            }
        }
        self.cursor.y += 4.0;

        Ok(())
    }

    /// Lettered quiz choices. The choice at `answer_index` gets the bold accent style on its
    /// label and first line. Blank choices are skipped but keep their letter.
    pub fn option_list<S: AsRef<str>>(
        &mut self,
        choices: &[S],
        answer_index: Option<usize>,
    ) -> Result<(), ContextError> {
        let label_x = self.geometry.margin + CHOICE_LABEL_INDENT;
        let text_x = label_x + CHOICE_TEXT_INDENT;
        let text_width = self.geometry.content_width() - CHOICE_LABEL_INDENT - CHOICE_TEXT_INDENT;

        for (index, choice) in choices.iter().map(AsRef::as_ref).enumerate() {
            if choice.trim().is_empty() {
                continue;
            }
            let is_correct = answer_index == Some(index);
            let first_line_style = if is_correct {
                TextStyle::BODY
                    .with_font_style(FontStyle::Bold)
                    .with_color(Color::POSITIVE)
            } else {
                TextStyle::BODY
            };
            let continuation_style = TextStyle::BODY;

            let choice = self.typography.prepare(choice, first_line_style.font_style);
            // Measured in the first line's style, which is the wider of the two
            let lines = self.wrap(&choice, text_width, &first_line_style);

            let line_by_line = self.reserve_lines(lines.len())?;
            for (line_index, line) in lines.iter().enumerate() {
                if line_by_line {
                    self.ensure_space(self.geometry.line_height)?;
                }
                if line_index == 0 {
                    self.draw_line_of_text(&choice_label(index), label_x, &first_line_style)?;
                }
                let style = if line_index == 0 {
                    &first_line_style
                } else {
                    &continuation_style
                };
                self.draw_line_of_text(line, text_x, style)?;
                self.cursor.y += self.geometry.line_height;
            }
        }

        Ok(())
    }
}

/// The text with every run of whitespace, line breaks included, collapsed into one space.
pub fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `A.`, `B.`, ... `Z.`, then `AA.`, `AB.` and so on.
pub fn choice_label(index: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = index + 1;
    while remaining > 0 {
        remaining -= 1;
        letters.push(char::from(b'A' + (remaining % 26) as u8));
        remaining /= 26;
    }
    letters.iter().rev().collect::<String>() + "."
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every character is one unit wide.
    fn count_characters(text: &str) -> f32 {
        text.chars().count() as f32
    }

    #[test]
    fn wrapping_is_greedy_on_words() {
        let lines = wrap_text("the quick brown fox jumps over", 10.0, count_characters);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over"]);
    }

    #[test]
    fn empty_text_is_one_empty_line() {
        assert_eq!(wrap_text("", 10.0, count_characters), vec![String::new()]);
        assert_eq!(wrap_text("   ", 10.0, count_characters), vec![String::new()]);
    }

    #[test]
    fn newlines_force_breaks() {
        let lines = wrap_text("first\n\nsecond line\n", 20.0, count_characters);
        assert_eq!(lines, vec!["first", "", "second line"]);
    }

    #[test]
    fn long_words_are_split_between_characters() {
        let lines = wrap_text("a abcdefghijkl b", 5.0, count_characters);
        assert_eq!(lines, vec!["a", "abcde", "fghij", "kl b"]);
    }

    #[test]
    fn long_lines_are_cut_short() {
        assert_eq!(truncate_text("short", 10.0, count_characters), "short");
        assert_eq!(truncate_text("limits and continuity", 10.0, count_characters), "limits...");
        assert_eq!(truncate_text("abcdef", 2.0, count_characters), "");
    }

    #[test]
    fn single_lines_collapse_whitespace() {
        assert_eq!(single_line(" Limits\tand\r\ncontinuity "), "Limits and continuity");
    }

    #[test]
    fn choice_labels_continue_past_z() {
        assert_eq!(choice_label(0), "A.");
        assert_eq!(choice_label(1), "B.");
        assert_eq!(choice_label(25), "Z.");
        assert_eq!(choice_label(26), "AA.");
    }

    #[test]
    fn a4_content_area() {
        let geometry = PageGeometry::A4;
        assert_eq!(geometry.content_width(), 170.0);
        assert_eq!(geometry.content_limit(), 267.0);
    }
}
