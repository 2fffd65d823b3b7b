//! Per-thread questionnaire state.
//!
//! A `Conversation` tracks where a reporter is in the intake: the preface
//! steps, the current question, the answers so far, and any model draft
//! waiting for confirmation. The async orchestration lives in `dm_message`; this
//! module only holds the state and its pure transitions.

use crate::base::{
    messages,
    schema::{IncidentField, IncidentReport},
    types::{DraftTurn, TextMode},
};

/// Where the conversation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Walking through the preface steps (1-based).
    Preface { step: usize },
    /// Asking the report questions.
    Collecting,
}

/// An action that needs an explicit `yes` because the questionnaire is incomplete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    Finalize,
    Jira,
}

impl ConfirmAction {
    /// How the action is phrased in the incomplete-answers warning.
    pub fn description(&self) -> &'static str {
        match self {
            ConfirmAction::Finalize => "finalize",
            ConfirmAction::Jira => "create a Jira issue",
        }
    }
}

/// A proposed value for a field, waiting for the reporter to confirm or revise it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDraft {
    pub field: IncidentField,
    pub candidate: String,
    /// The running user/assistant exchange for this field, used for revisions.
    pub history: Vec<DraftTurn>,
}

impl PendingDraft {
    /// A fresh draft whose history starts from the user's text and the proposed value.
    pub fn with_history(field: IncidentField, user_text: &str, draft: &str) -> Self {
        Self {
            field,
            candidate: draft.to_string(),
            history: vec![DraftTurn::user(user_text), DraftTurn::assistant(draft)],
        }
    }

    /// Whether this is a risk assessment still waiting for its detail (only `yes` so far).
    pub fn awaits_risk_detail(&self) -> bool {
        self.field == IncidentField::Risicoafweging && matches!(self.candidate.trim().to_lowercase().as_str(), "" | "ja" | "yes")
    }
}

/// The state of one intake thread.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub phase: Phase,
    pub report: IncidentReport,
    pub questions: Vec<IncidentField>,
    pub index: usize,
    pub mode: TextMode,
    pub pending: Option<PendingDraft>,
    pub confirm_action: Option<ConfirmAction>,
    pub override_incomplete: bool,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::preface()
    }
}

impl Conversation {
    /// A conversation at preface step 1.
    pub fn preface() -> Self {
        Self {
            phase: Phase::Preface { step: 1 },
            report: IncidentReport::default(),
            questions: IncidentField::ALL.to_vec(),
            index: 0,
            mode: TextMode::default(),
            pending: None,
            confirm_action: None,
            override_incomplete: false,
        }
    }

    /// A conversation at question 1 with an empty report.
    pub fn collecting() -> Self {
        Self {
            phase: Phase::Collecting,
            ..Self::preface()
        }
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// The field of the current question, if any remain.
    pub fn current_field(&self) -> Option<IncidentField> {
        self.questions.get(self.index).copied()
    }

    /// Whether answers are missing, or a draft still needs confirmation.
    pub fn is_incomplete(&self) -> bool {
        self.pending.is_some() || self.index < self.questions.len()
    }

    /// The first index at or after `start` whose field has no value yet.
    pub fn next_unanswered_index(&self, start: usize) -> usize {
        let mut i = start;
        while i < self.questions.len() && self.report.is_filled(self.questions[i]) {
            i += 1;
        }
        i
    }

    /// Store a value and clear any draft for that field.
    pub fn commit(&mut self, field: IncidentField, value: impl Into<String>) {
        self.report.set(field, value);
        if self.pending.as_ref().is_some_and(|p| p.field == field) {
            self.pending = None;
        }
    }

    /// Move to the next unanswered question after the current one, returning it.
    pub fn advance(&mut self) -> Option<IncidentField> {
        self.index = self.next_unanswered_index(self.index + 1);
        self.current_field()
    }

    /// Move to the next unanswered question from the current one (inclusive), returning it.
    ///
    /// Used after confirming a draft, where the current field has just been filled.
    pub fn advance_from_current(&mut self) -> Option<IncidentField> {
        self.index = self.next_unanswered_index(self.index);
        self.current_field()
    }

    /// The "what now" hint: the pending draft, the current question, or done.
    pub fn next_step_text(&self) -> String {
        if let Some(pending) = &self.pending {
            return messages::waiting_for_confirmation(pending.field.label());
        }

        match self.current_field() {
            Some(field) => messages::question_progress(self.index, self.total_questions(), &field.question_display()),
            None => messages::no_open_questions_short().to_string(),
        }
    }

    /// A short progress summary for the `status` command.
    pub fn format_status(&self) -> String {
        let remaining = self.total_questions().saturating_sub(self.index);

        let mut lines = vec![
            "Status:".to_string(),
            format!("- Filled fields: {}", self.report.filled_count()),
            format!("- Open questions: {remaining}"),
            format!("- Input mode: {}", self.mode),
        ];

        if let Some(pending) = &self.pending {
            lines.push(format!("- Waiting for confirmation for: {}", pending.field.label()));
        } else if let Some(field) = self.current_field() {
            lines.push(format!("- *Question {}/{}* {}", self.index + 1, self.total_questions(), field.question_display()));
        }

        lines.join("\n")
    }

    /// Every field with a short preview of its value, for the `fields` command.
    pub fn format_fields_list(&self) -> String {
        const PREVIEW_CHARS: usize = 80;

        let mut lines = vec!["Fields (use with `edit <field> <value>`):".to_string()];

        for field in IncidentField::ALL {
            let value = self.report.get(field);
            let mut preview: String = value.chars().take(PREVIEW_CHARS).collect();
            if value.chars().count() > PREVIEW_CHARS {
                preview.push('…');
            }

            lines.push(format!("- {} | {}: {}", field.number(), field.key(), preview));
        }

        lines.join("\n")
    }
}
