use std::{
    hash::{Hash as _, Hasher as _},
    path::PathBuf,
};

use serde::{ser::SerializeStruct as _, Serialize, Serializer};
use time::{Date, OffsetDateTime, UtcOffset};

use crate::{
    canvas::Canvas,
    delivery::FileDelivery,
    error::ContextError,
    layout::{Composer, PageGeometry},
    pdf::{DocumentInformation, PdfDocument},
    report::{non_blank, SessionReport},
    sections::{self, Branding},
    typography::{FontData, Typography},
};

/// Everything a generator needs besides the report itself.
#[derive(Clone, Debug, Default)]
pub struct GeneratorOptions {
    /// A TrueType family to embed. Without it, or when it cannot be parsed, the built-in
    /// Helvetica family is used.
    pub fonts: Option<FontData>,
    pub branding: Branding,
    /// Written into the document metadata and used for the file name. Defaults to now.
    pub creation_date: Option<OffsetDateTime>,
}

/// A serialized report that has not been delivered yet.
#[derive(Clone, Debug)]
pub struct RenderedReport {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// The result of an export, as reported back to the calling application.
#[derive(Clone, Debug, PartialEq)]
pub enum ReportOutcome {
    Success { filename: String, path: PathBuf },
    Failure { error: ContextError },
}

impl ReportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReportOutcome::Success { .. })
    }
}

impl Serialize for ReportOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut outcome = serializer.serialize_struct("ReportOutcome", 2)?;
        match self {
            ReportOutcome::Success { filename, .. } => {
                outcome.serialize_field("success", &true)?;
                outcome.serialize_field("filename", filename)?;
            }
            ReportOutcome::Failure { error } => {
                outcome.serialize_field("success", &false)?;
                outcome.serialize_field("error", &error.to_string())?;
            }
        }
        outcome.end()
    }
}

/// Lays out one session report into a PDF. A generator serves a single export: `render` and
/// `generate_report` consume it.
pub struct ReportGenerator {
    typography: Typography,
    branding: Branding,
    creation_date: OffsetDateTime,
    geometry: PageGeometry,
}

impl ReportGenerator {
    /// Registers the fonts of the options, falling back to the built-in family if they are
    /// missing or broken.
    pub fn new(options: GeneratorOptions) -> Self {
        ReportGenerator {
            typography: Typography::from_font_data(options.fonts.as_ref()),
            branding: options.branding,
            creation_date: options
                .creation_date
                .unwrap_or_else(OffsetDateTime::now_utc),
            geometry: PageGeometry::A4,
        }
    }

    pub fn typography(&self) -> &Typography {
        &self.typography
    }

    /// Draws the whole report onto the canvas: the header band, the overview, every section
    /// that has data and finally the footer of each page.
    pub fn compose<C: Canvas>(
        &self,
        report: &SessionReport,
        canvas: &mut C,
    ) -> Result<(), ContextError> {
        let mut composer = Composer::new(canvas, &self.typography, self.geometry)?;

        sections::draw_header(&mut composer, report, &self.branding)?;
        sections::draw_overview(&mut composer, report)?;

        if let Some(topics) = report.topics.as_ref().filter(|topics| topics.is_present()) {
            log::debug!("Drawing the topics section");
            sections::draw_topics(&mut composer, topics)?;
        }
        if let Some(summary) = report.summary.as_ref().filter(|summary| summary.is_present()) {
            log::debug!("Drawing the executive summary section");
            sections::draw_summary(&mut composer, summary)?;
        }
        if let Some(progress) = report
            .progress
            .as_ref()
            .filter(|progress| progress.is_present())
        {
            log::debug!("Drawing the progress section");
            sections::draw_progress(&mut composer, progress)?;
        }
        if let Some(questions) = report.quiz_questions() {
            log::debug!("Drawing the quiz section with {} questions", questions.len());
            sections::draw_quiz(&mut composer, questions)?;
        }

        sections::draw_footer(&mut composer, &self.branding)
    }

    /// Lays the report out into a PDF document and serializes it, without delivering it.
    pub fn render(self, report: &SessionReport) -> Result<RenderedReport, ContextError> {
        let filename = report_filename(
            report.title.as_deref(),
            self.creation_date.to_offset(UtcOffset::UTC).date(),
        );
        let information = DocumentInformation {
            title: non_blank(&report.title)
                .unwrap_or("Session Report")
                .to_string(),
            creator: self.branding.brand_title.clone(),
            creation_date: self.creation_date,
        };
        let mut pdf_document = PdfDocument::new(
            document_identifier(report, &self.creation_date)?,
            information,
            [self.geometry.width, self.geometry.height],
            self.typography.clone(),
        );

        self.compose(report, &mut pdf_document)?;
        let page_count = pdf_document.page_count();
        let bytes = pdf_document.save_to_bytes()?;

        Ok(RenderedReport {
            filename,
            bytes,
            page_count,
        })
    }

    /// Renders the report and hands the file to the delivery. Failures at any step are logged
    /// and reported in the outcome; the delivery only sees complete documents.
    pub fn generate_report(
        self,
        report: &SessionReport,
        delivery: &mut impl FileDelivery,
    ) -> ReportOutcome {
        let delivered = self.render(report).and_then(|rendered| {
            let path = delivery.deliver(&rendered.filename, &rendered.bytes)?;
            Ok((rendered, path))
        });

        match delivered {
            Ok((rendered, path)) => {
                log::info!(
                    "Generated the session report {:?} with {} pages",
                    path,
                    rendered.page_count
                );
                ReportOutcome::Success {
                    filename: rendered.filename,
                    path,
                }
            }
            Err(error) => {
                log::error!("Unable to generate the session report: {}", error);
                ReportOutcome::Failure { error }
            }
        }
    }
}

/// Renders and delivers the report with a fresh generator.
pub fn generate_session_pdf(
    report: &SessionReport,
    options: GeneratorOptions,
    delivery: &mut impl FileDelivery,
) -> ReportOutcome {
    ReportGenerator::new(options).generate_report(report, delivery)
}

/// `<title>_<YYYY-MM-DD>.pdf`, where every run of characters other than ASCII letters, digits,
/// `_` and `-` in the title becomes a single `_`. Reports without a title are named `session`.
pub fn report_filename(title: Option<&str>, date: Date) -> String {
    let title = title
        .filter(|title| !title.trim().is_empty())
        .unwrap_or("session");

    let mut stem = String::with_capacity(title.len());
    let mut replacing = false;
    for character in title.chars() {
        if character.is_ascii_alphanumeric() || character == '_' || character == '-' {
            stem.push(character);
            replacing = false;
        } else if !replacing {
            stem.push('_');
            replacing = true;
        }
    }

    format!(
        "{}_{:04}-{:02}-{:02}.pdf",
        stem,
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// A 32 hex digit identifier derived from the report content and the creation date, so the same
/// export always yields the same document.
fn document_identifier(
    report: &SessionReport,
    creation_date: &OffsetDateTime,
) -> Result<String, ContextError> {
    let report_content = serde_json::to_vec(report).map_err(|error| {
        ContextError::with_error("Unable to serialize the session report", &error)
    })?;

    let halves = [0_u8, 1].map(|seed| {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        seed.hash(&mut hasher);
        report_content.hash(&mut hasher);
        creation_date.unix_timestamp_nanos().hash(&mut hasher);
        hasher.finish()
    });

    Ok(format!("{:016x}{:016x}", halves[0], halves[1]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> Date {
        Date::from_calendar_date(2024, time::Month::March, 5).unwrap()
    }

    #[test]
    fn filenames_collapse_unsafe_runs() {
        assert_eq!(
            report_filename(Some("Algebra: Basics & More!"), date()),
            "Algebra_Basics_More__2024-03-05.pdf"
        );
        assert_eq!(
            report_filename(Some("unit-3_ review"), date()),
            "unit-3__review_2024-03-05.pdf"
        );
        assert_eq!(
            report_filename(Some("Équations"), date()),
            "_quations_2024-03-05.pdf"
        );
    }

    #[test]
    fn untitled_reports_are_named_session() {
        assert_eq!(report_filename(None, date()), "session_2024-03-05.pdf");
        assert_eq!(report_filename(Some("  "), date()), "session_2024-03-05.pdf");
    }

    #[test]
    fn identifiers_depend_on_the_content() {
        let creation_date = OffsetDateTime::UNIX_EPOCH;
        let mut report = SessionReport::default();
        let first = document_identifier(&report, &creation_date).unwrap();
        assert_eq!(first.len(), 32);
        assert_eq!(first, document_identifier(&report, &creation_date).unwrap());

        report.title = Some("Limits".into());
        assert_ne!(first, document_identifier(&report, &creation_date).unwrap());
    }

    #[test]
    fn outcomes_serialize_like_the_application_expects() {
        let success = ReportOutcome::Success {
            filename: "session_2024-03-05.pdf".into(),
            path: PathBuf::from("out/session_2024-03-05.pdf"),
        };
        assert_eq!(
            serde_json::to_value(&success).unwrap(),
            serde_json::json!({ "success": true, "filename": "session_2024-03-05.pdf" })
        );

        let failure = ReportOutcome::Failure {
            error: ContextError::with_context("Disk full"),
        };
        assert_eq!(
            serde_json::to_value(&failure).unwrap(),
            serde_json::json!({ "success": false, "error": "Disk full" })
        );
    }
}
