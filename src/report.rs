use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use time::{format_description::well_known::Rfc3339, macros::format_description, Date, OffsetDateTime};

use crate::error::ContextError;

/// One tutoring session as delivered by the application backend. Every field is optional and
/// the report only shows the sections whose data is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub title: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: Option<Timestamp>,
    #[serde(rename = "studentName")]
    pub student_name: Option<String>,
    pub topics: Option<Topics>,
    pub summary: Option<Summary>,
    pub progress: Option<Progress>,
    #[serde(default, deserialize_with = "entry_list")]
    pub quiz: Option<Vec<QuizQuestion>>,
}

impl SessionReport {
    pub fn from_path(report_path: &Path) -> Result<SessionReport, ContextError> {
        let report_content = std::fs::read(report_path).map_err(|error| {
            ContextError::with_error(
                format!("Unable to read the session report {:?}", report_path),
                &error,
            )
        })?;

        SessionReport::from_slice(&report_content).map_err(|error| ContextError {
            context: format!("Unable to parse the session report {:?}", report_path),
            source_error: error.source_error,
        })
    }

    pub fn from_slice(report_content: &[u8]) -> Result<SessionReport, ContextError> {
        serde_json::from_slice(report_content).map_err(|error| {
            ContextError::with_error("Unable to parse the session report", &error)
        })
    }

    /// The quiz questions, if there is at least one.
    pub fn quiz_questions(&self) -> Option<&[QuizQuestion]> {
        self.quiz.as_deref().filter(|questions| !questions.is_empty())
    }
}

/// When the session was created: either a date-time string (RFC 3339 or `YYYY-MM-DD`) or
/// milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Milliseconds(i64),
    Text(String),
}

impl Timestamp {
    /// The calendar date of the timestamp in UTC, if it can be understood.
    pub fn date(&self) -> Option<Date> {
        match self {
            Timestamp::Milliseconds(milliseconds) => {
                OffsetDateTime::from_unix_timestamp_nanos(i128::from(*milliseconds) * 1_000_000)
                    .ok()
                    .map(|date_time| date_time.to_offset(time::UtcOffset::UTC).date())
            }
            Timestamp::Text(text) => {
                let text = text.trim();
                OffsetDateTime::parse(text, &Rfc3339)
                    .map(|date_time| date_time.to_offset(time::UtcOffset::UTC).date())
                    .or_else(|_| Date::parse(text, format_description!("[year]-[month]-[day]")))
                    .ok()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topics {
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "entry_list")]
    pub subtopics: Option<Vec<Subtopic>>,
}

impl Topics {
    pub fn is_present(&self) -> bool {
        non_blank(&self.subject).is_some()
            || self
                .subtopics
                .iter()
                .flatten()
                .any(|subtopic| non_blank(&subtopic.title).is_some())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subtopic {
    pub title: Option<String>,
    pub objective: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub executive: Option<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub key_points: Option<Vec<String>>,
    #[serde(default, deserialize_with = "text_list")]
    pub misconceptions: Option<Vec<String>>,
}

impl Summary {
    pub fn is_present(&self) -> bool {
        non_blank(&self.executive).is_some()
            || has_items(&self.key_points)
            || has_items(&self.misconceptions)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default, deserialize_with = "text_list")]
    pub improvements: Option<Vec<String>>,
    #[serde(default, deserialize_with = "text_list")]
    pub gaps: Option<Vec<String>>,
    #[serde(rename = "nextGoals", default, deserialize_with = "text_list")]
    pub next_goals: Option<Vec<String>>,
}

impl Progress {
    pub fn is_present(&self) -> bool {
        has_items(&self.improvements) || has_items(&self.gaps) || has_items(&self.next_goals)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub q: Option<String>,
    #[serde(default, deserialize_with = "text_list")]
    pub choices: Option<Vec<String>>,
    /// Negative values mark a question without a correct choice.
    pub answer_index: Option<i64>,
    pub explanation: Option<String>,
}

impl QuizQuestion {
    /// The position of the correct choice, if the question has one.
    pub fn correct_choice(&self) -> Option<usize> {
        self.answer_index
            .and_then(|answer_index| usize::try_from(answer_index).ok())
    }
}

/// The text, unless it is missing or only whitespace.
pub fn non_blank(text: &Option<String>) -> Option<&str> {
    text.as_deref().filter(|text| !text.trim().is_empty())
}

/// Whether the list has at least one non-blank item.
pub fn has_items(items: &Option<Vec<String>>) -> bool {
    items
        .iter()
        .flatten()
        .any(|item| !item.trim().is_empty())
}

/// Lists of strings where `null` entries are read as empty strings, which are never drawn.
fn text_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let items: Option<Vec<Option<String>>> = Option::deserialize(deserializer)?;
    Ok(items.map(|items| items.into_iter().map(Option::unwrap_or_default).collect()))
}

/// Lists of objects where `null` entries are dropped.
fn entry_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let entries: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(entries.map(|entries| entries.into_iter().flatten().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_field_names_are_understood() {
        let report = SessionReport::from_slice(
            br#"{
                "title": "Limits",
                "createdAt": "2024-03-05T10:30:00Z",
                "studentName": "Sam",
                "summary": { "executive": "Went well", "key_points": ["One", null] },
                "progress": { "nextGoals": ["Derivatives"] },
                "quiz": [{ "q": "1+1?", "choices": ["2"], "answer_index": 0 }],
                "transcriptId": "ignored"
            }"#,
        )
        .unwrap();

        assert_eq!(report.student_name.as_deref(), Some("Sam"));
        assert_eq!(
            report.summary.unwrap().key_points,
            Some(vec!["One".to_string(), String::new()])
        );
        assert_eq!(
            report.progress.unwrap().next_goals,
            Some(vec!["Derivatives".to_string()])
        );
        assert_eq!(report.quiz.unwrap()[0].answer_index, Some(0));
    }

    #[test]
    fn null_entries_and_negative_answers_are_tolerated() {
        let report = SessionReport::from_slice(
            br#"{
                "topics": { "subtopics": [null, { "title": "Chain rule" }] },
                "quiz": [
                    null,
                    { "q": "Pick one", "choices": ["a", "b"], "answer_index": -1 },
                    { "q": "Pick two", "choices": ["a", "b"], "answer_index": 1 }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(report.topics.as_ref().unwrap().subtopics.as_ref().unwrap().len(), 1);
        let questions = report.quiz_questions().unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].answer_index, Some(-1));
        assert_eq!(questions[0].correct_choice(), None);
        assert_eq!(questions[1].correct_choice(), Some(1));

        let report = SessionReport::from_slice(br#"{ "quiz": [null] }"#).unwrap();
        assert!(report.quiz_questions().is_none());
    }

    #[test]
    fn timestamps_accept_strings_and_milliseconds() {
        let expected = Date::from_calendar_date(2024, time::Month::March, 5).unwrap();

        assert_eq!(
            Timestamp::Text("2024-03-05T23:30:00-00:30".into()).date(),
            Some(Date::from_calendar_date(2024, time::Month::March, 6).unwrap())
        );
        assert_eq!(Timestamp::Text("2024-03-05".into()).date(), Some(expected));
        assert_eq!(Timestamp::Milliseconds(1_709_640_000_000).date(), Some(expected));
        assert_eq!(Timestamp::Text("yesterday".into()).date(), None);
    }

    #[test]
    fn blank_sections_are_not_present() {
        let progress = Progress {
            improvements: Some(vec![]),
            gaps: Some(vec!["  ".into()]),
            next_goals: None,
        };
        assert!(!progress.is_present());

        let topics = Topics {
            subject: None,
            subtopics: Some(vec![Subtopic {
                title: Some("Chain rule".into()),
                objective: None,
            }]),
        };
        assert!(topics.is_present());

        assert!(!Summary::default().is_present());
        assert!(SessionReport::default().quiz_questions().is_none());
    }

    #[test]
    fn malformed_json_reports_the_parser_error() {
        let error = SessionReport::from_slice(b"{ \"title\": 3 }").unwrap_err();
        assert_eq!(error.context, "Unable to parse the session report");
        assert!(error.source_error.is_some());
    }
}
