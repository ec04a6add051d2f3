// src/quiz/session.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    models::question::{AnswerLetter, Question},
    quiz::{
        QuizMode,
        error::{QuizError, QuizResult},
    },
};

/// A committed answer to one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub question_id: i64,
    pub selected_answer: AnswerLetter,
    pub is_correct: bool,
    /// Time between the question being shown and the answer being committed.
    pub time_spent_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicScore {
    pub correct: u32,
    pub total: u32,
}

impl TopicScore {
    pub fn percentage(&self) -> u32 {
        percentage(self.correct, self.total)
    }
}

/// Final scoring of a completed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResultSummary {
    pub score: u32,
    pub total_questions: u32,
    pub answered_count: u32,
    /// Wall-clock time from session start to completion.
    pub time_spent_ms: u64,
    /// Keyed by topic name. Every topic in the quiz appears, answered or not.
    pub per_topic_breakdown: BTreeMap<String, TopicScore>,
}

impl QuizResultSummary {
    pub fn percentage(&self) -> u32 {
        percentage(self.score, self.total_questions)
    }
}

fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    ((correct as f64 / total as f64) * 100.0).round() as u32
}

/// Result of `select_answer` / `submit_answer`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// The answer was committed.
    Recorded(QuizAnswer),
    /// Practice mode: the choice is held until submitted or navigated away from.
    Selected(AnswerLetter),
    /// Immediate mode: the question already has an answer, nothing changed.
    Locked,
}

/// Result of `advance`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    Moved(usize),
    Completed(QuizResultSummary),
}

/// One attempt at a generated quiz.
///
/// The session owns no clock: every mutating call takes the current instant,
/// so the whole state can be persisted between requests and replayed in tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StoredSession")]
pub struct QuizSession {
    questions: Vec<Question>,
    current_index: usize,
    answers: BTreeMap<i64, QuizAnswer>,
    pending_answer: Option<AnswerLetter>,
    mode: QuizMode,
    started_at: DateTime<Utc>,
    question_shown_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    summary: Option<QuizResultSummary>,
}

/// Session document as read back from storage, checked before use.
#[derive(Deserialize)]
struct StoredSession {
    questions: Vec<Question>,
    current_index: usize,
    answers: BTreeMap<i64, QuizAnswer>,
    pending_answer: Option<AnswerLetter>,
    mode: QuizMode,
    started_at: DateTime<Utc>,
    question_shown_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    summary: Option<QuizResultSummary>,
}

impl TryFrom<StoredSession> for QuizSession {
    type Error = String;

    fn try_from(stored: StoredSession) -> Result<Self, Self::Error> {
        if stored.questions.is_empty() {
            return Err("stored session has no questions".to_string());
        }
        if stored.current_index >= stored.questions.len() {
            return Err(format!(
                "stored session index {} is out of range for {} questions",
                stored.current_index,
                stored.questions.len()
            ));
        }

        Ok(QuizSession {
            questions: stored.questions,
            current_index: stored.current_index,
            answers: stored.answers,
            pending_answer: stored.pending_answer,
            mode: stored.mode,
            started_at: stored.started_at,
            question_shown_at: stored.question_shown_at,
            completed_at: stored.completed_at,
            summary: stored.summary,
        })
    }
}

impl QuizSession {
    pub fn new(questions: Vec<Question>, mode: QuizMode, now: DateTime<Utc>) -> QuizResult<Self> {
        if questions.is_empty() {
            return Err(QuizError::InvalidRequest(
                "a session needs at least one question".to_string(),
            ));
        }

        Ok(Self {
            questions,
            current_index: 0,
            answers: BTreeMap::new(),
            pending_answer: None,
            mode,
            started_at: now,
            question_shown_at: now,
            completed_at: None,
            summary: None,
        })
    }

    // ---- Accessors ----

    pub fn mode(&self) -> QuizMode {
        self.mode
    }

    pub fn status(&self) -> SessionStatus {
        if self.completed_at.is_some() {
            SessionStatus::Completed
        } else {
            SessionStatus::InProgress
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status() == SessionStatus::Completed
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// The question being shown, or `None` once the session is completed.
    pub fn current_question(&self) -> Option<&Question> {
        if self.is_complete() {
            return None;
        }
        self.questions.get(self.current_index)
    }

    pub fn answers(&self) -> &BTreeMap<i64, QuizAnswer> {
        &self.answers
    }

    pub fn answer_for(&self, question_id: i64) -> Option<&QuizAnswer> {
        self.answers.get(&question_id)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn pending_answer(&self) -> Option<AnswerLetter> {
        self.pending_answer
    }

    /// Immediate mode shows the correct answer once the current question is answered.
    pub fn feedback_visible(&self) -> bool {
        self.mode == QuizMode::Immediate && !self.is_complete() && self.current_answered()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn summary(&self) -> Option<&QuizResultSummary> {
        self.summary.as_ref()
    }

    // ---- Transitions ----

    /// Picks an answer for the current question.
    ///
    /// Immediate mode commits it at once and locks the question; later calls
    /// return `Locked`. Practice mode only holds the choice.
    pub fn select_answer(&mut self, letter: AnswerLetter, now: DateTime<Utc>) -> QuizResult<AnswerOutcome> {
        self.ensure_in_progress("select an answer")?;

        match self.mode {
            QuizMode::Immediate => self.submit_answer(letter, now),
            QuizMode::Practice => {
                self.pending_answer = Some(letter);
                Ok(AnswerOutcome::Selected(letter))
            }
        }
    }

    /// Commits an answer for the current question.
    pub fn submit_answer(&mut self, letter: AnswerLetter, now: DateTime<Utc>) -> QuizResult<AnswerOutcome> {
        self.ensure_in_progress("submit an answer")?;

        if self.mode == QuizMode::Immediate && self.current_answered() {
            return Ok(AnswerOutcome::Locked);
        }

        self.pending_answer = None;
        self.record(letter, now)
            .map(AnswerOutcome::Recorded)
            .ok_or_else(|| {
                QuizError::IllegalStateTransition("session has no current question".to_string())
            })
    }

    /// Moves to the next question, completing the session after the last one.
    pub fn advance(&mut self, now: DateTime<Utc>) -> QuizResult<Advance> {
        self.ensure_in_progress("advance")?;

        if self.mode == QuizMode::Immediate && !self.current_answered() {
            return Err(QuizError::IllegalStateTransition(
                "the current question must be answered before advancing in immediate mode"
                    .to_string(),
            ));
        }

        self.commit_pending(now);

        if self.current_index + 1 >= self.questions.len() {
            return Ok(Advance::Completed(self.finish(now)));
        }

        self.current_index += 1;
        self.question_shown_at = now;
        Ok(Advance::Moved(self.current_index))
    }

    /// Moves back one question, stopping at the first. Answers are kept.
    pub fn retreat(&mut self, now: DateTime<Utc>) -> QuizResult<usize> {
        self.ensure_in_progress("go back")?;

        self.commit_pending(now);

        if self.current_index > 0 {
            self.current_index -= 1;
            self.question_shown_at = now;
        }
        Ok(self.current_index)
    }

    /// Ends the session and scores it.
    pub fn complete(&mut self, now: DateTime<Utc>) -> QuizResult<QuizResultSummary> {
        self.ensure_in_progress("complete")?;

        self.commit_pending(now);
        Ok(self.finish(now))
    }

    // ---- Internals ----

    fn ensure_in_progress(&self, action: &str) -> QuizResult<()> {
        if self.is_complete() {
            return Err(QuizError::IllegalStateTransition(format!(
                "cannot {} on a completed session",
                action
            )));
        }
        Ok(())
    }

    fn current(&self) -> Option<&Question> {
        self.questions.get(self.current_index)
    }

    fn current_answered(&self) -> bool {
        self.current()
            .is_some_and(|q| self.answers.contains_key(&q.id))
    }

    fn record(&mut self, letter: AnswerLetter, now: DateTime<Utc>) -> Option<QuizAnswer> {
        let question = self.current()?;
        let answer = QuizAnswer {
            question_id: question.id,
            selected_answer: letter,
            is_correct: question.is_correct(letter),
            time_spent_ms: (now - self.question_shown_at).num_milliseconds().max(0) as u64,
        };
        self.answers.insert(answer.question_id, answer.clone());
        Some(answer)
    }

    fn commit_pending(&mut self, now: DateTime<Utc>) {
        if let Some(letter) = self.pending_answer.take() {
            self.record(letter, now);
        }
    }

    fn finish(&mut self, now: DateTime<Utc>) -> QuizResultSummary {
        let summary = score(&self.questions, &self.answers, self.started_at, now);
        self.pending_answer = None;
        self.completed_at = Some(now);
        self.summary = Some(summary.clone());
        summary
    }
}

/// Scores a set of answers against the quiz questions.
///
/// The breakdown walks every question, so unanswered questions still count
/// toward their topic's `total`.
pub fn score(
    questions: &[Question],
    answers: &BTreeMap<i64, QuizAnswer>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
) -> QuizResultSummary {
    let mut per_topic_breakdown: BTreeMap<String, TopicScore> = BTreeMap::new();
    let mut score = 0;
    let mut answered_count = 0;

    for question in questions {
        let entry = per_topic_breakdown.entry(question.topic.name.clone()).or_default();
        entry.total += 1;

        if let Some(answer) = answers.get(&question.id) {
            answered_count += 1;
            if answer.is_correct {
                score += 1;
                entry.correct += 1;
            }
        }
    }

    QuizResultSummary {
        score,
        total_questions: questions.len() as u32,
        answered_count,
        time_spent_ms: (completed_at - started_at).num_milliseconds().max(0) as u64,
        per_topic_breakdown,
    }
}
