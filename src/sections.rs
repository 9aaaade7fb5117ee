//! The blocks of the session report, drawn in reading order by the generator.

use time::Date;

use crate::{
    canvas::{Canvas, Color},
    error::ContextError,
    layout::{single_line, Composer, HeadingLevel, ParagraphOptions},
    report::{has_items, non_blank, Progress, QuizQuestion, SessionReport, Summary, Topics},
    typography::{FontStyle, TextStyle},
};

/// Brand and footer wording of the report.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Branding {
    pub brand_title: String,
    pub footer_caption: String,
}

impl Default for Branding {
    fn default() -> Self {
        Branding {
            brand_title: "Epistemy".into(),
            footer_caption: "Generated by Epistemy AI Platform".into(),
        }
    }
}

/// The colored band at the top of the first page, with the brand and the report title.
pub fn draw_header<C: Canvas>(
    composer: &mut Composer<'_, C>,
    report: &SessionReport,
    branding: &Branding,
) -> Result<(), ContextError> {
    let geometry = *composer.geometry();
    composer.canvas().fill_rectangle(
        [0.0, 0.0],
        [geometry.width, geometry.header_height],
        Color::BRAND,
    )?;

    // The band has room for one line of each, so longer texts are cut short
    let brand_style = HeadingLevel::Title.style();
    let brand_title = composer.fit_to_width(
        &single_line(
            &composer
                .typography()
                .prepare(&branding.brand_title, brand_style.font_style),
        ),
        geometry.content_width(),
        &brand_style,
    );
    composer
        .canvas()
        .draw_text(&brand_title, [geometry.margin, 25.0], &brand_style)?;

    let title_style = TextStyle {
        size: TextStyle::HEADING_2.size,
        ..brand_style
    };
    let report_title = composer.fit_to_width(
        &single_line(&composer.typography().prepare(
            non_blank(&report.title).unwrap_or("Session Report"),
            title_style.font_style,
        )),
        geometry.content_width(),
        &title_style,
    );
    composer
        .canvas()
        .draw_text(&report_title, [geometry.margin, 35.0], &title_style)?;

    composer.move_to(geometry.header_height + 10.0);

    Ok(())
}

/// Title, creation date and (when known) the student's name.
pub fn draw_overview<C: Canvas>(
    composer: &mut Composer<'_, C>,
    report: &SessionReport,
) -> Result<(), ContextError> {
    composer.heading("Session Overview", HeadingLevel::Section)?;

    let mut lines = vec![
        format!("Title: {}", non_blank(&report.title).unwrap_or("Untitled")),
        format!("Created: {}", created_label(report)),
    ];
    if let Some(student_name) = non_blank(&report.student_name) {
        lines.push(format!("Student: {}", student_name.trim()));
    }

    composer.key_values(&lines)
}

/// The creation date as `M/D/YYYY`, or `N/A` when it is missing or cannot be read.
fn created_label(report: &SessionReport) -> String {
    let Some(created_at) = &report.created_at else {
        return "N/A".into();
    };
    match created_at.date() {
        Some(date) => format_date(date),
        None => {
            log::warn!("Unable to read the session creation date {:?}", created_at);
            "N/A".into()
        }
    }
}

pub fn format_date(date: Date) -> String {
    format!("{}/{}/{}", u8::from(date.month()), date.day(), date.year())
}

pub fn draw_topics<C: Canvas>(
    composer: &mut Composer<'_, C>,
    topics: &Topics,
) -> Result<(), ContextError> {
    composer.heading("Topics Covered", HeadingLevel::Section)?;

    if let Some(subject) = non_blank(&topics.subject) {
        composer.heading(subject, HeadingLevel::Subsection)?;
        composer.advance(2.0);
    }

    // Numbering follows the position in the backend's list, even when entries are skipped
    for (index, subtopic) in topics.subtopics.iter().flatten().enumerate() {
        let Some(title) = non_blank(&subtopic.title) else {
            continue;
        };
        composer.paragraph(
            &format!("{}. {}", index + 1, title),
            &ParagraphOptions::styled(TextStyle::SUBTOPIC_TITLE, 2.0),
        )?;
        if let Some(objective) = non_blank(&subtopic.objective) {
            composer.paragraph(
                objective,
                &ParagraphOptions::styled(TextStyle::BODY.with_color(Color::MUTED), 6.0),
            )?;
        }
    }

    let section_gap = composer.geometry().section_gap;
    composer.advance(section_gap / 2.0);

    Ok(())
}

/// A bold label followed by its bulleted list, or nothing when the list has no items.
fn labelled_list<C: Canvas>(
    composer: &mut Composer<'_, C>,
    label: &str,
    label_color: Color,
    label_gap: f32,
    items: &Option<Vec<String>>,
) -> Result<(), ContextError> {
    let Some(items) = items.as_deref().filter(|_| has_items(items)) else {
        return Ok(());
    };
    let label_style = TextStyle::BODY
        .with_font_style(FontStyle::Bold)
        .with_color(label_color);
    composer.paragraph(label, &ParagraphOptions::styled(label_style, label_gap))?;
    composer.bulleted_list(items, Color::BLACK)
}

pub fn draw_summary<C: Canvas>(
    composer: &mut Composer<'_, C>,
    summary: &Summary,
) -> Result<(), ContextError> {
    composer.heading("Executive Summary", HeadingLevel::Section)?;

    if let Some(executive) = non_blank(&summary.executive) {
        composer.paragraph(executive, &ParagraphOptions::styled(TextStyle::BODY, 6.0))?;
    }
    labelled_list(composer, "Key Points:", Color::BLACK, 2.0, &summary.key_points)?;
    labelled_list(
        composer,
        "Common Misconceptions:",
        Color::BLACK,
        2.0,
        &summary.misconceptions,
    )?;

    let section_gap = composer.geometry().section_gap;
    composer.advance(section_gap / 2.0);

    Ok(())
}

pub fn draw_progress<C: Canvas>(
    composer: &mut Composer<'_, C>,
    progress: &Progress,
) -> Result<(), ContextError> {
    composer.heading("Progress Evaluation", HeadingLevel::Section)?;

    labelled_list(
        composer,
        "Improvements:",
        Color::POSITIVE,
        4.0,
        &progress.improvements,
    )?;
    labelled_list(
        composer,
        "Areas for Improvement:",
        Color::NEGATIVE,
        4.0,
        &progress.gaps,
    )?;
    labelled_list(
        composer,
        "Next Goals:",
        Color::INFORMATIONAL,
        4.0,
        &progress.next_goals,
    )?;

    let section_gap = composer.geometry().section_gap;
    composer.advance(section_gap / 2.0);

    Ok(())
}

pub fn draw_quiz<C: Canvas>(
    composer: &mut Composer<'_, C>,
    questions: &[QuizQuestion],
) -> Result<(), ContextError> {
    composer.heading("Practice Quiz", HeadingLevel::Section)?;

    let label_style = TextStyle::BODY.with_font_style(FontStyle::Bold);
    let explanation_label_style = TextStyle::BODY
        .with_font_style(FontStyle::Italic)
        .with_color(Color::SUBDUED);

    for (index, question) in questions.iter().enumerate() {
        composer.paragraph(
            &format!("Question {}:", index + 1),
            &ParagraphOptions::styled(label_style, 2.0),
        )?;
        if let Some(text) = non_blank(&question.q) {
            composer.paragraph(text, &ParagraphOptions::default())?;
        }
        if let Some(choices) = &question.choices {
            composer.option_list(choices, question.correct_choice())?;
        }
        if let Some(explanation) = non_blank(&question.explanation) {
            composer.paragraph(
                "Explanation:",
                &ParagraphOptions::styled(explanation_label_style, 1.0),
            )?;
            composer.paragraph(
                explanation,
                &ParagraphOptions::styled(TextStyle::BODY.with_color(Color::SUBDUED), 6.0),
            )?;
        }
        composer.advance(4.0);
    }

    Ok(())
}

/// Divider, caption and page number on every page. Runs once all content is laid out, since
/// the page count is only known then.
pub fn draw_footer<C: Canvas>(
    composer: &mut Composer<'_, C>,
    branding: &Branding,
) -> Result<(), ContextError> {
    let geometry = *composer.geometry();
    let divider_y = geometry.content_limit() + 5.0;
    let caption_y = geometry.content_limit() + 12.0;
    let style = TextStyle::FOOTER;
    let caption = single_line(
        &composer
            .typography()
            .prepare(&branding.footer_caption, style.font_style),
    );

    let canvas = composer.canvas();
    let page_count = canvas.page_count();
    for page_index in 0..page_count {
        canvas.set_page(page_index)?;
        canvas.draw_line(
            [geometry.margin, divider_y],
            [geometry.width - geometry.margin, divider_y],
            Color::DIVIDER,
        )?;
        canvas.draw_text(&caption, [geometry.margin, caption_y], &style)?;
        canvas.draw_text(
            &format!("Page {} of {}", page_index + 1, page_count),
            [geometry.width - geometry.margin - 25.0, caption_y],
            &style,
        )?;
    }

    Ok(())
}
