// src/models/question.rs

use std::{collections::HashSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};

/// One of the four answer letters a multiple-choice question offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    pub const ALL: [AnswerLetter; 4] = [
        AnswerLetter::A,
        AnswerLetter::B,
        AnswerLetter::C,
        AnswerLetter::D,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerLetter::A => "A",
            AnswerLetter::B => "B",
            AnswerLetter::C => "C",
            AnswerLetter::D => "D",
        }
    }
}

impl fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerLetter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" => Ok(AnswerLetter::A),
            "B" => Ok(AnswerLetter::B),
            "C" => Ok(AnswerLetter::C),
            "D" => Ok(AnswerLetter::D),
            other => Err(format!("'{}' is not an answer letter (A-D)", other)),
        }
    }
}

/// A character range carrying one formatting attribute.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormattingRange {
    pub start: u32,
    pub end: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpecialChar {
    pub position: u32,
    #[serde(rename = "char")]
    pub character: String,
}

/// Rich-text metadata extracted alongside the plain text.
/// The service never interprets it, only hands it to the client.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextFormatting {
    pub superscript: Vec<FormattingRange>,
    pub subscript: Vec<FormattingRange>,
    pub bold: Vec<FormattingRange>,
    pub italic: Vec<FormattingRange>,
    #[serde(alias = "specialChars")]
    pub special_chars: Vec<SpecialChar>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub letter: AnswerLetter,
    pub text: String,
    #[serde(default)]
    pub formatting: TextFormatting,
    #[serde(default)]
    pub multiline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionImage {
    pub filename: String,
    #[serde(default)]
    pub page: i32,
    #[serde(default)]
    pub position: String,
}

/// Table-shaped supplementary data stored in `questions.given_info_table`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GivenInfoTable {
    pub has_table: bool,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GivenInformation {
    pub has_table: bool,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub raw_text: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRef {
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionStem {
    pub text: String,
    #[serde(default)]
    pub formatting: TextFormatting,
    #[serde(default)]
    pub multiline: bool,
}

/// A validated multiple-choice question, joined with its topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub original_id: i64,
    pub topic_id: i64,
    pub topic: TopicRef,
    pub page_number: Option<i32>,
    pub stem: QuestionStem,
    pub given_information: Option<GivenInformation>,
    pub choices: Vec<Choice>,
    pub correct_answer: AnswerLetter,
    pub images: Vec<QuestionImage>,
}

impl Question {
    pub fn is_correct(&self, letter: AnswerLetter) -> bool {
        self.correct_answer == letter
    }

    pub fn has_images(&self) -> bool {
        !self.images.is_empty()
    }

    /// Checks the choice invariants: exactly four choices, letters A-D each
    /// used once, and the correct answer names one of them.
    pub fn check_invariants(&self) -> Result<(), String> {
        check_choices(&self.choices, self.correct_answer)
    }

    /// What the data-integrity report flags: broken choices or an empty stem.
    pub fn integrity_error(&self) -> Option<String> {
        if let Err(e) = self.check_invariants() {
            return Some(e);
        }
        self.stem
            .text
            .trim()
            .is_empty()
            .then(|| "question text is empty".to_string())
    }
}

fn check_choices(choices: &[Choice], correct: AnswerLetter) -> Result<(), String> {
    if choices.len() != 4 {
        return Err(format!("expected 4 choices, found {}", choices.len()));
    }

    let letters: HashSet<AnswerLetter> = choices.iter().map(|c| c.letter).collect();
    if letters.len() != 4 {
        return Err("choice letters must be unique".to_string());
    }

    if !letters.contains(&correct) {
        return Err(format!("correct answer {} matches no choice", correct));
    }

    Ok(())
}

/// Row shape of `questions` joined with `topics`.
#[derive(Debug, FromRow)]
pub struct QuestionRow {
    pub id: i64,
    pub original_id: i64,
    pub topic_id: i64,
    pub topic_slug: String,
    pub topic_name: String,
    pub page_number: Option<i32>,
    pub question_text: String,
    pub question_formatting: Json<TextFormatting>,
    pub question_multiline: bool,
    pub has_given_info: bool,
    pub given_info_table: Json<GivenInfoTable>,
    pub given_info_raw: Json<Vec<String>>,
    pub choices: Json<Vec<Choice>>,
    pub correct_answer: String,
    pub images: Json<Vec<QuestionImage>>,
}

impl QuestionRow {
    /// Reason this row is unusable, covering everything the read path rejects.
    pub fn integrity_error(self) -> Option<String> {
        match Question::try_from(self) {
            Ok(q) => q.integrity_error(),
            Err(e) => Some(e),
        }
    }
}

impl TryFrom<QuestionRow> for Question {
    type Error = String;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let correct_answer: AnswerLetter = row
            .correct_answer
            .parse()
            .map_err(|e| format!("question {}: {}", row.original_id, e))?;

        let given_information = if row.has_given_info {
            let table = row.given_info_table.0;
            Some(GivenInformation {
                has_table: table.has_table,
                columns: table.columns,
                rows: table.rows,
                raw_text: row.given_info_raw.0,
            })
        } else {
            None
        };

        let question = Question {
            id: row.id,
            original_id: row.original_id,
            topic_id: row.topic_id,
            topic: TopicRef {
                slug: row.topic_slug,
                name: row.topic_name,
            },
            page_number: row.page_number,
            stem: QuestionStem {
                text: row.question_text,
                formatting: row.question_formatting.0,
                multiline: row.question_multiline,
            },
            given_information,
            choices: row.choices.0,
            correct_answer,
            images: row.images.0,
        };

        question
            .check_invariants()
            .map_err(|e| format!("question {}: {}", question.original_id, e))?;

        Ok(question)
    }
}

// ---- Wire shape ----

#[derive(Debug, Serialize)]
pub struct TopicLabel {
    /// The topic slug; clients address topics by slug only.
    pub id: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AnswerChoices {
    #[serde(rename = "hasHeaders")]
    pub has_headers: bool,
    pub format: &'static str,
    pub choices: Vec<Choice>,
}

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub filename: String,
    pub page: i32,
    pub position: String,
    pub url: String,
}

/// DTO for sending a question to the client.
/// `correct_answer` is omitted when the client must not see it yet.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResponse {
    pub id: i64,
    pub original_id: i64,
    pub topic: TopicLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i32>,
    pub question_stem: QuestionStem,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_information: Option<GivenInformation>,
    pub answer_choices: AnswerChoices,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<AnswerLetter>,
    pub images: Vec<ImageResponse>,
}

impl From<&Question> for QuestionResponse {
    fn from(q: &Question) -> Self {
        QuestionResponse {
            id: q.id,
            original_id: q.original_id,
            topic: TopicLabel {
                id: q.topic.slug.clone(),
                name: q.topic.name.clone(),
            },
            page: q.page_number,
            question_stem: q.stem.clone(),
            given_information: q.given_information.clone(),
            answer_choices: AnswerChoices {
                has_headers: false,
                format: "standard",
                choices: q.choices.clone(),
            },
            correct_answer: Some(q.correct_answer),
            images: q
                .images
                .iter()
                .map(|img| ImageResponse {
                    filename: img.filename.clone(),
                    page: img.page,
                    position: img.position.clone(),
                    url: format!("/api/images/{}", img.filename),
                })
                .collect(),
        }
    }
}

impl QuestionResponse {
    pub fn without_answer(mut self) -> Self {
        self.correct_answer = None;
        self
    }
}

/// Query parameters for listing questions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuestionsParams {
    /// Comma-separated topic slugs.
    pub topics: Option<String>,
    pub has_images: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    #[serde(default)]
    pub randomize: bool,
}

impl ListQuestionsParams {
    pub fn topic_slugs(&self) -> Vec<String> {
        self.topics
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Store-level question filter, topics already resolved to ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    pub topic_ids: Option<Vec<i64>>,
    pub has_images: Option<bool>,
    pub limit: i64,
    pub offset: i64,
    pub randomize: bool,
}

impl QuestionFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 1000;

    pub fn matches(&self, q: &Question) -> bool {
        let topic_ok = self
            .topic_ids
            .as_ref()
            .is_none_or(|ids| ids.contains(&q.topic_id));
        let images_ok = self.has_images.is_none_or(|want| q.has_images() == want);
        topic_ok && images_ok
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStats {
    pub total_questions: i64,
    pub questions_with_images: i64,
    pub questions_with_given_info: i64,
    pub multiline_questions: i64,
}

/// Result of the data-integrity check over stored questions.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataValidation {
    pub issue_count: usize,
    /// Original ids of questions breaking the choice invariants.
    pub issues: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct QuestionPage {
    pub questions: Vec<QuestionResponse>,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::question;

    fn row() -> QuestionRow {
        let q = question(7, 1, AnswerLetter::C);
        QuestionRow {
            id: q.id,
            original_id: 1007,
            topic_id: q.topic_id,
            topic_slug: q.topic.slug.clone(),
            topic_name: q.topic.name.clone(),
            page_number: Some(12),
            question_text: "Which pump?".to_string(),
            question_formatting: Json(TextFormatting::default()),
            question_multiline: false,
            has_given_info: false,
            given_info_table: Json(GivenInfoTable::default()),
            given_info_raw: Json(vec![]),
            choices: Json(q.choices.clone()),
            correct_answer: "C".to_string(),
            images: Json(vec![]),
        }
    }

    #[test]
    fn answer_letter_parses_and_rejects() {
        assert_eq!("B".parse::<AnswerLetter>(), Ok(AnswerLetter::B));
        assert_eq!(" D ".parse::<AnswerLetter>(), Ok(AnswerLetter::D));
        assert!("E".parse::<AnswerLetter>().is_err());
        assert!("a".parse::<AnswerLetter>().is_err());
    }

    #[test]
    fn row_converts_into_valid_question() {
        let q = Question::try_from(row()).expect("row should convert");
        assert_eq!(q.correct_answer, AnswerLetter::C);
        assert_eq!(q.page_number, Some(12));
        assert!(q.given_information.is_none());
    }

    #[test]
    fn row_with_given_info_merges_table_and_raw_text() {
        let mut r = row();
        r.has_given_info = true;
        r.given_info_table = Json(GivenInfoTable {
            has_table: true,
            columns: vec!["Pump".to_string(), "Flow".to_string()],
            rows: vec![vec!["A".to_string(), "100".to_string()]],
        });
        r.given_info_raw = Json(vec!["Given:".to_string()]);

        let q = Question::try_from(r).unwrap();
        let info = q.given_information.unwrap();
        assert!(info.has_table);
        assert_eq!(info.columns.len(), 2);
        assert_eq!(info.raw_text, vec!["Given:".to_string()]);
    }

    #[test]
    fn row_with_bad_correct_answer_is_rejected() {
        let mut r = row();
        r.correct_answer = "E".to_string();
        assert!(Question::try_from(r).is_err());
    }

    #[test]
    fn row_with_three_choices_is_rejected() {
        let mut r = row();
        r.choices.0.pop();
        let err = Question::try_from(r).unwrap_err();
        assert!(err.contains("expected 4 choices"));
    }

    #[test]
    fn duplicate_letters_are_rejected() {
        let mut q = question(1, 1, AnswerLetter::A);
        q.choices[3].letter = AnswerLetter::A;
        assert!(q.check_invariants().is_err());
    }

    #[test]
    fn integrity_check_covers_everything_reads_reject() {
        assert_eq!(row().integrity_error(), None);

        let mut r = row();
        r.choices.0[1].letter = AnswerLetter::A;
        assert!(r.integrity_error().unwrap().contains("unique"));

        let mut r = row();
        r.correct_answer = "X".to_string();
        assert!(r.integrity_error().is_some());

        let mut r = row();
        r.question_text = "  ".to_string();
        assert_eq!(r.integrity_error().as_deref(), Some("question text is empty"));
    }

    #[test]
    fn response_adds_image_urls_and_can_hide_answer() {
        let mut q = question(3, 2, AnswerLetter::B);
        q.images.push(QuestionImage {
            filename: "p12_img1.png".to_string(),
            page: 12,
            position: "above".to_string(),
        });

        let resp = QuestionResponse::from(&q);
        assert_eq!(resp.images[0].url, "/api/images/p12_img1.png");
        assert_eq!(resp.correct_answer, Some(AnswerLetter::B));

        let json = serde_json::to_value(resp.without_answer()).unwrap();
        assert!(json.get("correctAnswer").is_none());
        assert_eq!(json["topic"]["id"], q.topic.slug);
        assert_eq!(json["answerChoices"]["choices"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn formatting_defaults_when_fields_missing() {
        let parsed: TextFormatting = serde_json::from_str(r#"{"bold":[{"start":0,"end":3}]}"#).unwrap();
        assert_eq!(parsed.bold.len(), 1);
        assert!(parsed.superscript.is_empty());
        assert!(parsed.special_chars.is_empty());
    }
}
