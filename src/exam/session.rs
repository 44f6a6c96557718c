// src/exam/session.rs

//! The exam-in-progress aggregate.
//!
//! Everything here is synchronous and clock-agnostic: timers and request
//! handlers call into it with the current instant, which keeps every
//! transition testable without a runtime.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::Serialize;
use tokio::time::Instant;

use crate::{
    config::{CHEATING_REDIRECT, SECONDS_PER_QUESTION, TIME_NOTICE_DURATION},
    exam::{
        integrity::{IntegrityMonitor, IntegrityState, IntegrityView, Verdict, WindowDimensions},
        status::QuestionStatus,
    },
    models::question::Question,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NoQuestions,
    IndexOutOfRange(usize),
    UnknownOption(i64),
    TimeExpired,
    Terminated,
    AlreadySubmitting,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NoQuestions => f.write_str("No questions available for this subject"),
            SessionError::IndexOutOfRange(idx) => write!(f, "Question index {} is out of range", idx),
            SessionError::UnknownOption(id) => {
                write!(f, "Option {} does not belong to the current question", id)
            }
            SessionError::TimeExpired => f.write_str("Exam time is over"),
            SessionError::Terminated => f.write_str("Session was terminated"),
            SessionError::AlreadySubmitting => f.write_str("Submission already in progress"),
        }
    }
}

impl std::error::Error for SessionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Active,
    /// Exam clock ran out; only submission remains.
    TimeExpired,
    /// Ended by the integrity monitor; nothing gets persisted.
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeNotice {
    HalfRemaining,
    FifthRemaining,
}

impl TimeNotice {
    pub fn message(self) -> &'static str {
        match self {
            TimeNotice::HalfRemaining => "50% of time remaining!",
            TimeNotice::FifthRemaining => "Only 20% of time remaining!",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamMeta {
    pub question_count: usize,
    pub total_marks: u32,
    /// Seconds allotted to the whole exam.
    pub total_time: u32,
    pub mark_per_answer: u32,
}

/// Submit-prompt UI state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmitFlow {
    pub show_modal: bool,
    pub is_submitting: bool,
    pub error: Option<String>,
}

/// Everything the scoring step needs, detached from the session lock.
#[derive(Debug, Clone)]
pub struct SubmissionDraft {
    pub subject: String,
    pub questions: Arc<Vec<Question>>,
    pub answers: BTreeMap<usize, i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NoticeView {
    pub kind: TimeNotice,
    pub message: &'static str,
}

/// Serializable view of a session for the exam client.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub subject: String,
    pub phase: SessionPhase,
    pub current_index: usize,
    pub answers: BTreeMap<usize, i64>,
    pub statuses: Vec<QuestionStatus>,
    pub remaining_seconds: u32,
    pub question_remaining_seconds: u32,
    pub notice: Option<NoticeView>,
    pub integrity: IntegrityView,
    pub submit: SubmitFlow,
    /// Set once the session is terminated; the client must leave.
    pub redirect: Option<&'static str>,
}

#[derive(Debug, Clone)]
pub struct ExamSession {
    subject: String,
    questions: Arc<Vec<Question>>,
    meta: ExamMeta,
    current_index: usize,
    answers: BTreeMap<usize, i64>,
    visited: Vec<bool>,
    marked: Vec<bool>,
    remaining_seconds: u32,
    question_remaining: u32,
    /// Bumped on every navigation so the question timer can re-phase.
    navigation_epoch: u64,
    phase: SessionPhase,
    half_notice_fired: bool,
    fifth_notice_fired: bool,
    notice: Option<(TimeNotice, Instant)>,
    submit: SubmitFlow,
    integrity: IntegrityMonitor,
}

impl ExamSession {
    /// Builds a fresh session positioned on the first question.
    pub fn initialize(
        subject: impl Into<String>,
        questions: Vec<Question>,
        total_time: u32,
        marks_per_answer: u32,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        let count = questions.len();
        let meta = ExamMeta {
            question_count: count,
            total_marks: count as u32 * marks_per_answer,
            total_time,
            mark_per_answer: marks_per_answer,
        };

        Ok(Self {
            subject: subject.into(),
            questions: Arc::new(questions),
            meta,
            current_index: 0,
            answers: BTreeMap::new(),
            visited: vec![false; count],
            marked: vec![false; count],
            remaining_seconds: total_time,
            question_remaining: SECONDS_PER_QUESTION,
            navigation_epoch: 0,
            phase: SessionPhase::Active,
            half_notice_fired: false,
            fifth_notice_fired: false,
            notice: None,
            submit: SubmitFlow::default(),
            integrity: IntegrityMonitor::new(),
        })
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn meta(&self) -> &ExamMeta {
        &self.meta
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn answer(&self, index: usize) -> Option<i64> {
        self.answers.get(&index).copied()
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn question_remaining(&self) -> u32 {
        self.question_remaining
    }

    pub fn navigation_epoch(&self) -> u64 {
        self.navigation_epoch
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn submit_flow(&self) -> &SubmitFlow {
        &self.submit
    }

    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 == self.questions.len()
    }

    pub fn status(&self, index: usize) -> Option<QuestionStatus> {
        if index >= self.questions.len() {
            return None;
        }
        Some(QuestionStatus::derive(
            self.visited[index],
            self.answers.contains_key(&index),
            self.marked[index],
        ))
    }

    pub fn statuses(&self) -> Vec<QuestionStatus> {
        (0..self.questions.len())
            .map(|idx| {
                QuestionStatus::derive(
                    self.visited[idx],
                    self.answers.contains_key(&idx),
                    self.marked[idx],
                )
            })
            .collect()
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        match self.phase {
            SessionPhase::Active => Ok(()),
            SessionPhase::TimeExpired => Err(SessionError::TimeExpired),
            SessionPhase::Terminated => Err(SessionError::Terminated),
        }
    }

    /// Records the answer for the current question.
    pub fn select_option(&mut self, option_id: i64) -> Result<(), SessionError> {
        self.ensure_active()?;

        let question = &self.questions[self.current_index];
        if !question.has_option(option_id) {
            return Err(SessionError::UnknownOption(option_id));
        }

        self.answers.insert(self.current_index, option_id);
        self.visited[self.current_index] = true;
        Ok(())
    }

    /// Flags the current question and moves on unless it is the last one.
    pub fn mark_for_review(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;

        self.marked[self.current_index] = true;
        self.visited[self.current_index] = true;

        if !self.is_last_question() {
            self.go_to_question(self.current_index + 1)?;
        }
        Ok(())
    }

    /// Jumps to `index`, marking it visited and restarting its countdown.
    pub fn go_to_question(&mut self, index: usize) -> Result<(), SessionError> {
        self.ensure_active()?;

        if index >= self.questions.len() {
            return Err(SessionError::IndexOutOfRange(index));
        }

        self.current_index = index;
        self.visited[index] = true;
        self.question_remaining = SECONDS_PER_QUESTION;
        self.navigation_epoch += 1;
        Ok(())
    }

    /// Advances one question; on the last question opens the submit prompt.
    pub fn next(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;

        if self.is_last_question() {
            self.request_submit();
            Ok(())
        } else {
            self.go_to_question(self.current_index + 1)
        }
    }

    pub fn previous(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;

        if self.current_index > 0 {
            self.go_to_question(self.current_index - 1)?;
        }
        Ok(())
    }

    /// One second off the exam clock. Never goes below zero.
    pub fn tick(&mut self) {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
    }

    /// Exam-timer callback: tick, raise threshold notices, expire at zero.
    /// Returns true once the exam clock has run out.
    pub fn on_exam_tick(&mut self, now: Instant) -> bool {
        if self.phase == SessionPhase::Terminated {
            return true;
        }

        self.tick();
        self.raise_time_notices(now);

        if self.remaining_seconds == 0 {
            self.expire();
            return true;
        }
        false
    }

    /// Question-timer callback. Returns true when it auto-advanced.
    ///
    /// Does nothing outside the active phase, so exam expiry wins over a
    /// simultaneous per-question expiry.
    pub fn on_question_tick(&mut self) -> bool {
        if self.phase != SessionPhase::Active || self.remaining_seconds == 0 {
            return false;
        }

        self.question_remaining = self.question_remaining.saturating_sub(1);
        if self.question_remaining > 0 || self.is_last_question() {
            return false;
        }

        self.go_to_question(self.current_index + 1).is_ok()
    }

    fn raise_time_notices(&mut self, now: Instant) {
        let total = u64::from(self.meta.total_time);
        let remaining = u64::from(self.remaining_seconds);

        if !self.half_notice_fired && remaining * 2 <= total {
            self.half_notice_fired = true;
            self.notice = Some((TimeNotice::HalfRemaining, now + TIME_NOTICE_DURATION));
        }

        if !self.fifth_notice_fired && remaining * 5 <= total {
            self.fifth_notice_fired = true;
            self.notice = Some((TimeNotice::FifthRemaining, now + TIME_NOTICE_DURATION));
        }
    }

    /// The threshold notice still on screen at `now`, if any.
    pub fn active_notice(&self, now: Instant) -> Option<TimeNotice> {
        self.notice
            .filter(|(_, until)| now < *until)
            .map(|(notice, _)| notice)
    }

    /// Exam clock ran out: force the submit prompt open for good.
    pub fn expire(&mut self) {
        if self.phase == SessionPhase::Active {
            tracing::info!(subject = %self.subject, "exam time expired");
            self.phase = SessionPhase::TimeExpired;
        }
        self.submit.show_modal = true;
    }

    pub fn request_submit(&mut self) {
        self.submit.show_modal = true;
    }

    /// Closes the submit prompt. Refused once the exam clock is out.
    pub fn cancel_submit(&mut self) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.submit.show_modal = false;
        Ok(())
    }

    /// Flags the submission as running and hands out what scoring needs.
    pub fn begin_submit(&mut self) -> Result<SubmissionDraft, SessionError> {
        if self.phase == SessionPhase::Terminated {
            return Err(SessionError::Terminated);
        }
        if self.submit.is_submitting {
            return Err(SessionError::AlreadySubmitting);
        }

        self.submit.is_submitting = true;
        self.submit.error = None;

        Ok(SubmissionDraft {
            subject: self.subject.clone(),
            questions: Arc::clone(&self.questions),
            answers: self.answers.clone(),
        })
    }

    /// Records an inline submission error; the prompt stays re-enterable.
    pub fn fail_submit(&mut self, message: impl Into<String>) {
        self.submit.is_submitting = false;
        self.submit.error = Some(message.into());
    }

    pub fn report_visibility(&mut self, visible: bool, now: Instant) -> Verdict {
        let verdict = self.integrity.report_visibility(visible, now);
        self.apply_verdict(verdict);
        verdict
    }

    pub fn report_dimensions(&mut self, dims: WindowDimensions) -> Verdict {
        let verdict = self.integrity.report_dimensions(dims);
        self.apply_verdict(verdict);
        verdict
    }

    pub fn dismiss_warning(&mut self) -> bool {
        self.integrity.dismiss_warning()
    }

    pub fn integrity_state(&self) -> IntegrityState {
        self.integrity.state()
    }

    fn apply_verdict(&mut self, verdict: Verdict) {
        if verdict == Verdict::Terminated {
            self.phase = SessionPhase::Terminated;
            self.submit.show_modal = false;
        }
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            subject: self.subject.clone(),
            phase: self.phase,
            current_index: self.current_index,
            answers: self.answers.clone(),
            statuses: self.statuses(),
            remaining_seconds: self.remaining_seconds,
            question_remaining_seconds: self.question_remaining,
            notice: self.active_notice(now).map(|kind| NoticeView {
                kind,
                message: kind.message(),
            }),
            integrity: self.integrity.view(),
            submit: self.submit.clone(),
            redirect: (self.phase == SessionPhase::Terminated).then_some(CHEATING_REDIRECT),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::question::AnswerOption;
    use std::time::Duration;

    /// Questions with ids 1.., options `id * 10 + k`, correct option `k = 0`.
    pub(crate) fn sample_questions(count: usize) -> Vec<Question> {
        (1..=count as i64)
            .map(|id| Question {
                id,
                number: id as usize,
                question: format!("Question {}", id),
                comprehension: None,
                image_url: None,
                options: (0..4)
                    .map(|k| AnswerOption {
                        id: id * 10 + k,
                        option: format!("Option {}", k),
                    })
                    .collect(),
                correct_option_id: Some(id * 10),
            })
            .collect()
    }

    fn session(count: usize) -> ExamSession {
        ExamSession::initialize("math", sample_questions(count), count as u32 * 30, 1).unwrap()
    }

    #[test]
    fn initialize_starts_at_first_question() {
        let s = session(3);
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.remaining_seconds(), 90);
        assert_eq!(s.question_remaining(), SECONDS_PER_QUESTION);
        assert_eq!(s.phase(), SessionPhase::Active);
        assert_eq!(s.meta().total_marks, 3);
        assert!(s.statuses().iter().all(|st| *st == QuestionStatus::NotVisited));
    }

    #[test]
    fn initialize_rejects_empty_set() {
        let err = ExamSession::initialize("math", Vec::new(), 0, 1).unwrap_err();
        assert_eq!(err, SessionError::NoQuestions);
    }

    #[test]
    fn select_option_is_idempotent() {
        let mut s = session(2);
        s.select_option(11).unwrap();
        let first = (s.status(0), s.answer(0));
        s.select_option(11).unwrap();
        assert_eq!((s.status(0), s.answer(0)), first);
        assert_eq!(s.status(0), Some(QuestionStatus::Answered));
    }

    #[test]
    fn select_option_rejects_foreign_option() {
        let mut s = session(2);
        assert_eq!(s.select_option(21), Err(SessionError::UnknownOption(21)));
        assert_eq!(s.answer(0), None);
    }

    #[test]
    fn answering_a_review_question_keeps_the_flag() {
        let mut s = session(2);
        s.go_to_question(1).unwrap();
        s.mark_for_review().unwrap();
        assert_eq!(s.status(1), Some(QuestionStatus::Review));

        s.select_option(20).unwrap();
        assert_eq!(s.status(1), Some(QuestionStatus::AnsweredAndReview));
    }

    #[test]
    fn mark_for_review_advances_unless_last() {
        let mut s = session(2);
        s.select_option(10).unwrap();
        s.mark_for_review().unwrap();
        assert_eq!(s.status(0), Some(QuestionStatus::AnsweredAndReview));
        assert_eq!(s.current_index(), 1);

        s.mark_for_review().unwrap();
        assert_eq!(s.status(1), Some(QuestionStatus::Review));
        assert_eq!(s.current_index(), 1);
    }

    #[test]
    fn go_to_marks_target_visited_and_resets_countdown() {
        let mut s = session(3);
        for _ in 0..12 {
            s.on_question_tick();
        }
        assert_eq!(s.question_remaining(), 18);

        s.go_to_question(2).unwrap();
        assert_eq!(s.current_index(), 2);
        assert_eq!(s.question_remaining(), SECONDS_PER_QUESTION);
        assert_eq!(s.status(2), Some(QuestionStatus::NotAnswered));
        assert_eq!(s.status(1), Some(QuestionStatus::NotVisited));

        s.go_to_question(2).unwrap();
        assert_eq!(s.question_remaining(), SECONDS_PER_QUESTION);
    }

    #[test]
    fn go_to_rejects_out_of_range() {
        let mut s = session(2);
        assert_eq!(s.go_to_question(2), Err(SessionError::IndexOutOfRange(2)));
        assert_eq!(s.current_index(), 0);
    }

    #[test]
    fn next_on_last_question_opens_submit_prompt() {
        let mut s = session(2);
        s.next().unwrap();
        assert_eq!(s.current_index(), 1);
        assert!(!s.submit_flow().show_modal);

        s.next().unwrap();
        assert_eq!(s.current_index(), 1);
        assert!(s.submit_flow().show_modal);

        s.cancel_submit().unwrap();
        assert!(!s.submit_flow().show_modal);
    }

    #[test]
    fn previous_stops_at_first_question() {
        let mut s = session(2);
        s.previous().unwrap();
        assert_eq!(s.current_index(), 0);
        assert_eq!(s.status(0), Some(QuestionStatus::NotVisited));
    }

    #[test]
    fn tick_never_goes_below_zero() {
        let mut s = ExamSession::initialize("math", sample_questions(1), 2, 1).unwrap();
        s.tick();
        s.tick();
        s.tick();
        assert_eq!(s.remaining_seconds(), 0);
    }

    #[test]
    fn question_expiry_advances_then_stops_on_last() {
        let mut s = session(2);
        let mut advanced = false;
        for _ in 0..SECONDS_PER_QUESTION {
            advanced = s.on_question_tick();
        }
        assert!(advanced);
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.question_remaining(), SECONDS_PER_QUESTION);

        for _ in 0..SECONDS_PER_QUESTION + 5 {
            assert!(!s.on_question_tick());
        }
        assert_eq!(s.current_index(), 1);
        assert_eq!(s.question_remaining(), 0);
    }

    #[test]
    fn exam_expiry_locks_the_session() {
        let mut s = ExamSession::initialize("math", sample_questions(2), 3, 1).unwrap();
        let now = Instant::now();

        assert!(!s.on_exam_tick(now));
        assert!(!s.on_exam_tick(now));
        assert!(s.on_exam_tick(now));

        assert_eq!(s.phase(), SessionPhase::TimeExpired);
        assert!(s.submit_flow().show_modal);
        assert_eq!(s.select_option(10), Err(SessionError::TimeExpired));
        assert_eq!(s.go_to_question(1), Err(SessionError::TimeExpired));
        assert_eq!(s.cancel_submit(), Err(SessionError::TimeExpired));
        assert!(!s.on_question_tick());
        assert!(s.begin_submit().is_ok());
    }

    #[test]
    fn threshold_notices_fire_once_each() {
        let mut s = ExamSession::initialize("math", sample_questions(1), 10, 1).unwrap();
        let t0 = Instant::now();

        for _ in 0..4 {
            s.on_exam_tick(t0);
        }
        assert_eq!(s.active_notice(t0), None);

        s.on_exam_tick(t0);
        assert_eq!(s.remaining_seconds(), 5);
        assert_eq!(s.active_notice(t0), Some(TimeNotice::HalfRemaining));
        assert_eq!(s.active_notice(t0 + Duration::from_secs(3)), None);

        let t1 = t0 + Duration::from_secs(4);
        s.on_exam_tick(t1);
        s.on_exam_tick(t1);
        assert_eq!(s.active_notice(t1), None);

        s.on_exam_tick(t1);
        assert_eq!(s.remaining_seconds(), 2);
        assert_eq!(s.active_notice(t1), Some(TimeNotice::FifthRemaining));

        let t2 = t1 + Duration::from_secs(5);
        s.on_exam_tick(t2);
        assert_eq!(s.active_notice(t2), None);
    }

    #[test]
    fn second_violation_terminates() {
        let mut s = session(2);
        let t0 = Instant::now();

        assert_eq!(s.report_visibility(false, t0), Verdict::Warned);
        assert_eq!(s.phase(), SessionPhase::Active);
        assert!(s.dismiss_warning());

        s.report_visibility(true, t0);
        assert_eq!(
            s.report_visibility(false, t0 + Duration::from_secs(5)),
            Verdict::Terminated
        );
        assert_eq!(s.phase(), SessionPhase::Terminated);
        assert_eq!(s.select_option(10), Err(SessionError::Terminated));
        assert_eq!(s.begin_submit().unwrap_err(), SessionError::Terminated);
        assert_eq!(s.snapshot(t0).redirect, Some(CHEATING_REDIRECT));
    }

    #[test]
    fn begin_submit_guards_against_double_submission() {
        let mut s = session(1);
        s.begin_submit().unwrap();
        assert_eq!(s.begin_submit().unwrap_err(), SessionError::AlreadySubmitting);

        s.fail_submit("User not authenticated");
        assert_eq!(s.submit_flow().error.as_deref(), Some("User not authenticated"));
        assert!(s.begin_submit().is_ok());
        assert_eq!(s.submit_flow().error, None);
    }
}
