#![allow(dead_code)]

use std::path::PathBuf;

use session_report_pdf::{
    canvas::{Canvas, Color},
    delivery::FileDelivery,
    error::ContextError,
    report::SessionReport,
    typography::TextStyle,
};

/// Something drawn onto a page of the `RecordingCanvas`.
#[derive(Clone, Debug, PartialEq)]
pub enum Drawing {
    Rectangle {
        origin: [f32; 2],
        size: [f32; 2],
        color: Color,
    },
    Line {
        from: [f32; 2],
        to: [f32; 2],
        color: Color,
    },
    Text {
        text: String,
        position: [f32; 2],
        style: TextStyle,
    },
}

/// A line of text as it was drawn, with the page it ended up on.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawnText {
    pub page_index: usize,
    pub text: String,
    pub position: [f32; 2],
    pub style: TextStyle,
}

/// A canvas that only remembers what was drawn on each page.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub pages: Vec<Vec<Drawing>>,
    current_page: usize,
    /// A4 unless set.
    page_size: Option<[f32; 2]>,
}

impl RecordingCanvas {
    pub fn with_page_size(page_size: [f32; 2]) -> Self {
        RecordingCanvas {
            page_size: Some(page_size),
            ..RecordingCanvas::default()
        }
    }

    pub fn texts(&self) -> Vec<DrawnText> {
        self.pages
            .iter()
            .enumerate()
            .flat_map(|(page_index, drawings)| {
                drawings.iter().filter_map(move |drawing| match drawing {
                    Drawing::Text {
                        text,
                        position,
                        style,
                    } => Some(DrawnText {
                        page_index,
                        text: text.clone(),
                        position: *position,
                        style: *style,
                    }),
                    _ => None,
                })
            })
            .collect()
    }

    /// Every drawn string, in drawing order.
    pub fn strings(&self) -> Vec<String> {
        self.texts().into_iter().map(|drawn| drawn.text).collect()
    }

    pub fn find(&self, text: &str) -> Option<DrawnText> {
        self.texts().into_iter().find(|drawn| drawn.text == text)
    }

    pub fn contains(&self, text: &str) -> bool {
        self.find(text).is_some()
    }
}

impl Canvas for RecordingCanvas {
    fn add_page(&mut self) -> Result<usize, ContextError> {
        self.pages.push(Vec::new());
        self.current_page = self.pages.len() - 1;
        Ok(self.current_page)
    }

    fn set_page(&mut self, page_index: usize) -> Result<(), ContextError> {
        if page_index >= self.pages.len() {
            return Err(ContextError::with_context(format!(
                "No page with index {}",
                page_index
            )));
        }
        self.current_page = page_index;
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_size(&self) -> [f32; 2] {
        self.page_size.unwrap_or([210.0, 297.0])
    }

    fn fill_rectangle(
        &mut self,
        origin: [f32; 2],
        size: [f32; 2],
        color: Color,
    ) -> Result<(), ContextError> {
        self.pages[self.current_page].push(Drawing::Rectangle {
            origin,
            size,
            color,
        });
        Ok(())
    }

    fn draw_line(
        &mut self,
        from: [f32; 2],
        to: [f32; 2],
        color: Color,
    ) -> Result<(), ContextError> {
        self.pages[self.current_page].push(Drawing::Line { from, to, color });
        Ok(())
    }

    fn draw_text(
        &mut self,
        text: &str,
        position: [f32; 2],
        style: &TextStyle,
    ) -> Result<(), ContextError> {
        self.pages[self.current_page].push(Drawing::Text {
            text: text.to_string(),
            position,
            style: *style,
        });
        Ok(())
    }
}

/// Keeps the delivered files in memory, or fails every delivery when `failure` is set.
#[derive(Debug, Default)]
pub struct MemoryDelivery {
    pub delivered: Vec<(String, Vec<u8>)>,
    pub failure: Option<String>,
}

impl FileDelivery for MemoryDelivery {
    fn deliver(&mut self, filename: &str, bytes: &[u8]) -> Result<PathBuf, ContextError> {
        if let Some(failure) = &self.failure {
            return Err(ContextError::with_context(failure.clone()));
        }
        self.delivered.push((filename.to_string(), bytes.to_vec()));
        Ok(PathBuf::from("memory").join(filename))
    }
}

pub fn report_from_json(json: &str) -> SessionReport {
    SessionReport::from_slice(json.as_bytes()).unwrap()
}

/// The session used throughout the quiz tests.
pub fn algebra_basics() -> SessionReport {
    report_from_json(
        r#"{
            "title": "Algebra Basics",
            "createdAt": "2024-03-05T15:30:00Z",
            "quiz": [
                {
                    "q": "What is 2 + 2?",
                    "choices": ["3", "4", "5"],
                    "answer_index": 1,
                    "explanation": "Two plus two equals four."
                }
            ]
        }"#,
    )
}
