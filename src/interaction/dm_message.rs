use serde_json::{Map, Value};
use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::{
    base::{
        config::Config,
        input::{is_accept, is_no, is_yes, parse_mode_prefix},
        messages,
        schema::{IncidentField, IncidentReport},
        types::{DraftTurn, Res, TextMode, Void},
    },
    interaction::{
        command::{Command, EditArgs},
        conversation::{ConfirmAction, Conversation, PendingDraft, Phase},
        event::IncomingMessage,
        intake,
    },
    render::{adf::to_adf, blocks, markdown::render_markdown},
    runtime::Runtime,
};

const PREFACE_STEP_COUNT: usize = messages::PREFACE_STEPS.len();

/// Action ID of the pending-incident picker offered at the start of a thread.
pub const PICK_PENDING_INCIDENT: &str = "pick_pending_incident";

#[instrument(skip_all)]
pub fn handle_dm_message(message: IncomingMessage, runtime: Runtime) {
    tokio::spawn(
        async move {
            let channel_id = message.channel_id.clone();
            let root_ts = message.root_ts().to_string();

            // Process the message.
            let result = handle_dm_message_internal(message, &runtime).await;

            // Log any errors, and let the reporter know.
            if let Err(err) = &result {
                error!("Error while handling DM message: {}", err);

                if let Err(err) = runtime.chat.send_message(&channel_id, &root_ts, messages::could_not_process_message()).await {
                    error!("Error while reporting a failed DM message: {}", err);
                }
            }
        }
        .in_current_span(),
    );
}

/// Route one direct message through the intake.
#[instrument(skip_all, fields(channel = %message.channel_id, root_ts = %message.root_ts()))]
pub async fn handle_dm_message_internal(message: IncomingMessage, runtime: &Runtime) -> Void {
    let channel_id = message.channel_id.as_str();
    let root_ts = message.root_ts();

    if !message.is_user_post() {
        debug!("Ignoring message {} that is not a new user post.", message.ts);
        return Ok(());
    }

    let command = Command::parse(&message.text);

    // Cancel before any session bookkeeping, so no session is recreated.
    if command == Command::Cancel {
        return cancel(runtime, &message).await;
    }

    runtime.store.set_dm_channel(&message.user_id, channel_id);

    let Some(handle) = runtime.store.conversation(channel_id, root_ts) else {
        return start_thread(runtime, &message, &command).await;
    };

    // Messages of one thread are handled one at a time.
    let mut conversation = handle.lock().await;

    match conversation.phase {
        Phase::Preface { step } => handle_preface(runtime, &message, &command, &mut conversation, step).await,
        Phase::Collecting => handle_collecting(runtime, &message, command, &mut conversation).await,
    }
}

async fn cancel(runtime: &Runtime, message: &IncomingMessage) -> Void {
    info!("Canceling intake for {}", message.user_id);

    runtime.store.remove_conversation(&message.channel_id, message.root_ts());

    if !message.user_id.is_empty() {
        runtime.store.remove_session(&message.user_id);
    }

    runtime.chat.send_message(&message.channel_id, message.root_ts(), messages::incident_canceled()).await
}

/// The first message of a thread without a conversation.
async fn start_thread(runtime: &Runtime, message: &IncomingMessage, command: &Command) -> Void {
    let channel_id = message.channel_id.as_str();
    let root_ts = message.root_ts();

    if !message.user_id.is_empty() {
        let pending = runtime.store.get_or_create(&message.user_id).pending_incident_keys;

        // Every new thread gets a fresh session.
        runtime.store.create_session(&message.user_id);
        runtime.store.set_dm_channel(&message.user_id, channel_id);

        if !pending.is_empty() {
            debug!("Offering {} pending incidents", pending.len());

            let picker = blocks::option_picker(messages::pending_incidents_picker(), PICK_PENDING_INCIDENT, "Select incident", &pending);
            runtime.chat.send_blocks(channel_id, root_ts, messages::pending_incidents_prompt(), picker).await?;
        }
    }

    if !message.is_thread_reply() {
        return intake::start_preface_thread(runtime, channel_id, root_ts).await;
    }

    if *command == Command::Start {
        return intake::start_questionnaire_thread(runtime, channel_id, root_ts).await;
    }

    let linked = intake::linked_issue_for_channel(runtime, channel_id);
    runtime.chat.send_message(channel_id, root_ts, &messages::preface_step_text(PREFACE_STEP_COUNT, linked.as_deref())).await
}

// Preface.

async fn handle_preface(runtime: &Runtime, message: &IncomingMessage, command: &Command, conversation: &mut Conversation, step: usize) -> Void {
    let channel_id = message.channel_id.as_str();
    let root_ts = message.root_ts();
    let linked = intake::linked_issue_for_channel(runtime, channel_id);

    // The last step is only passed with `start`.
    if step >= PREFACE_STEP_COUNT {
        if *command == Command::Start {
            return intake::begin_questionnaire(runtime, channel_id, root_ts, conversation).await;
        }

        return runtime.chat.send_message(channel_id, root_ts, &messages::preface_step_text(step, linked.as_deref())).await;
    }

    if is_accept(&message.text) || is_yes(&message.text) {
        conversation.phase = Phase::Preface { step: step + 1 };
        return runtime.chat.send_message(channel_id, root_ts, &messages::preface_step_text(step + 1, linked.as_deref())).await;
    }

    runtime.chat.send_message(channel_id, root_ts, &messages::preface_step_incomplete(step)).await
}

// Questionnaire.

async fn handle_collecting(runtime: &Runtime, message: &IncomingMessage, command: Command, conversation: &mut Conversation) -> Void {
    let channel_id = message.channel_id.as_str();
    let root_ts = message.root_ts();
    let text = message.text.trim();

    // A pending finalize/jira confirmation takes the reply first.
    let command = match conversation.confirm_action {
        Some(action) if is_accept(text) => {
            conversation.confirm_action = None;
            conversation.override_incomplete = true;

            match action {
                ConfirmAction::Finalize => Command::Finalize,
                ConfirmAction::Jira => Command::Jira,
            }
        }
        Some(_) if is_no(text) => {
            conversation.confirm_action = None;
            return runtime.chat.send_message(channel_id, root_ts, &conversation.next_step_text()).await;
        }
        Some(_) => {
            let text = format!("{} {}", messages::proceed_or_cancel_instruction(), conversation.next_step_text());
            return runtime.chat.send_message(channel_id, root_ts, &text).await;
        }
        None => command,
    };

    match command {
        Command::Help => runtime.chat.send_message(channel_id, root_ts, messages::HELP_TEXT).await,
        Command::Finalize => {
            if needs_confirmation(conversation, ConfirmAction::Finalize) {
                return runtime.chat.send_message(channel_id, root_ts, &messages::warning_incomplete(ConfirmAction::Finalize.description())).await;
            }

            let markdown = render_markdown(&conversation.report);
            runtime.chat.send_message(channel_id, root_ts, &messages::final_document(&markdown)).await
        }
        Command::Jira => {
            if needs_confirmation(conversation, ConfirmAction::Jira) {
                return runtime.chat.send_message(channel_id, root_ts, &messages::warning_incomplete(ConfirmAction::Jira.description())).await;
            }

            post_to_jira(runtime, message, &conversation.report).await
        }
        Command::Status => {
            runtime.chat.send_message(channel_id, root_ts, &conversation.format_status()).await?;
            runtime.chat.send_message(channel_id, root_ts, &conversation.next_step_text()).await
        }
        Command::Fields => {
            runtime.chat.send_message(channel_id, root_ts, &conversation.format_fields_list()).await?;
            runtime.chat.send_message(channel_id, root_ts, &conversation.next_step_text()).await
        }
        Command::Show => {
            let markdown = render_markdown(&conversation.report);
            runtime.chat.send_message(channel_id, root_ts, &messages::current_markdown(&markdown)).await?;
            runtime.chat.send_message(channel_id, root_ts, &conversation.next_step_text()).await
        }
        Command::Continue => runtime.chat.send_message(channel_id, root_ts, &conversation.next_step_text()).await,
        Command::Mode(Some(mode)) => {
            conversation.mode = mode;
            runtime.chat.send_message(channel_id, root_ts, &messages::input_mode_set(mode)).await?;
            runtime.chat.send_message(channel_id, root_ts, &conversation.next_step_text()).await
        }
        Command::Mode(None) => runtime.chat.send_message(channel_id, root_ts, messages::usage_mode()).await,
        Command::ShowMode => runtime.chat.send_message(channel_id, root_ts, &messages::current_input_mode(conversation.mode)).await,
        Command::Edit(None) => runtime.chat.send_message(channel_id, root_ts, messages::usage_edit_example()).await,
        Command::Edit(Some(args)) => handle_edit(runtime, message, args, conversation).await,
        Command::Cancel => cancel(runtime, message).await,
        Command::Start | Command::Answer => handle_answer(runtime, message, conversation).await,
    }
}

/// Whether `action` must wait for an explicit `yes` first; arms the confirmation when it must.
///
/// A previous `yes` override is consumed either way.
fn needs_confirmation(conversation: &mut Conversation, action: ConfirmAction) -> bool {
    let overridden = std::mem::take(&mut conversation.override_incomplete);

    if conversation.is_incomplete() && !overridden {
        conversation.confirm_action = Some(action);
        return true;
    }

    false
}

async fn handle_edit(runtime: &Runtime, message: &IncomingMessage, args: EditArgs, conversation: &mut Conversation) -> Void {
    let channel_id = message.channel_id.as_str();
    let root_ts = message.root_ts();

    let Some(field) = IncidentField::resolve(&args.field_token) else {
        return runtime.chat.send_message(channel_id, root_ts, &messages::unknown_field(&args.field_token)).await;
    };

    let (forced, body) = parse_mode_prefix(&args.value);

    match forced.unwrap_or(conversation.mode) {
        TextMode::Story => {
            let value = intake::rewrite_or_raw(runtime, field, &body).await;
            conversation.pending = Some(PendingDraft::with_history(field, &body, &value));

            runtime.chat.send_message(channel_id, root_ts, &messages::proposal_edit(field.label(), &value)).await
        }
        TextMode::Literal => {
            conversation.commit(field, body);

            runtime.chat.send_message(channel_id, root_ts, &messages::changed_field(field)).await
        }
    }
}

/// Free text: a draft confirmation or revision, or an answer to the current question.
async fn handle_answer(runtime: &Runtime, message: &IncomingMessage, conversation: &mut Conversation) -> Void {
    let channel_id = message.channel_id.as_str();
    let root_ts = message.root_ts();
    let text = message.text.trim();

    if let Some(pending) = conversation.pending.clone() {
        return handle_pending(runtime, message, pending, conversation).await;
    }

    let Some(field) = conversation.current_field() else {
        return intake::send_closeout(runtime, channel_id, root_ts).await;
    };

    let (forced, body) = parse_mode_prefix(text);

    // The risk assessment is a yes/no question, with a follow-up for `yes`.
    if field == IncidentField::Risicoafweging {
        if is_yes(&body) {
            conversation.report.set(field, "yes");
            conversation.pending = Some(PendingDraft {
                field,
                candidate: "yes".to_string(),
                history: Vec::new(),
            });

            return runtime.chat.send_message(channel_id, root_ts, messages::risk_assessment_followup_question()).await;
        }

        if is_no(&body) {
            conversation.report.set(field, "no");
            return advance(runtime, channel_id, root_ts, conversation, Ack::ThankYou).await;
        }

        return runtime.chat.send_message(channel_id, root_ts, &messages::risk_assessment_yesno_prompt(&field.question_display())).await;
    }

    match forced.unwrap_or(conversation.mode) {
        TextMode::Story => {
            let value = intake::rewrite_or_raw(runtime, field, &body).await;
            conversation.pending = Some(PendingDraft::with_history(field, &body, &value));

            runtime.chat.send_message(channel_id, root_ts, &messages::proposal(field.label(), &value)).await
        }
        TextMode::Literal => {
            conversation.commit(field, body);
            advance(runtime, channel_id, root_ts, conversation, Ack::ThankYou).await
        }
    }
}

async fn handle_pending(runtime: &Runtime, message: &IncomingMessage, pending: PendingDraft, conversation: &mut Conversation) -> Void {
    let channel_id = message.channel_id.as_str();
    let root_ts = message.root_ts();
    let text = message.text.trim();
    let field = pending.field;
    let label = field.label();

    // After a risk assessment `yes`, the next message is the detail.
    if pending.awaits_risk_detail() {
        if is_accept(text) {
            return runtime.chat.send_message(channel_id, root_ts, messages::need_risk_assessment_detail()).await;
        }

        let (forced, body) = parse_mode_prefix(text);
        let detail = match forced.unwrap_or(conversation.mode) {
            TextMode::Story => intake::rewrite_or_raw(runtime, field, &body).await,
            TextMode::Literal => body,
        };
        let combined = format!("yes: {detail}");

        conversation.pending = Some(PendingDraft::with_history(field, text, &combined));

        return runtime.chat.send_message(channel_id, root_ts, &messages::proposal(label, &combined)).await;
    }

    if is_accept(text) {
        conversation.commit(field, pending.candidate);
        return advance(runtime, channel_id, root_ts, conversation, Ack::Confirmed).await;
    }

    // `new <value>` replaces the draft.
    if let Some(replacement) = strip_new_keyword(text) {
        let (forced, body) = parse_mode_prefix(replacement);

        return match forced.unwrap_or(conversation.mode) {
            TextMode::Literal => {
                conversation.commit(field, body);
                advance(runtime, channel_id, root_ts, conversation, Ack::Confirmed).await
            }
            TextMode::Story => {
                let value = intake::rewrite_or_raw(runtime, field, &body).await;
                conversation.pending = Some(PendingDraft::with_history(field, &body, &value));

                runtime.chat.send_message(channel_id, root_ts, &messages::proposal(label, &value)).await
            }
        };
    }

    // Anything else revises the draft.
    let mut history = pending.history;
    history.push(DraftTurn::user(text));

    let revised = intake::revise_or_keep(runtime, &history, text, &pending.candidate).await;
    history.push(DraftTurn::assistant(revised.clone()));

    conversation.pending = Some(PendingDraft {
        field,
        candidate: revised.clone(),
        history,
    });

    runtime.chat.send_message(channel_id, root_ts, &messages::proposal(label, &revised)).await
}

/// The remainder of a `new` / `new <value>` reply, keeping its case.
fn strip_new_keyword(text: &str) -> Option<&str> {
    let lower = text.to_lowercase();

    if lower == "new" {
        return Some("");
    }

    if lower.starts_with("new ") {
        return text.split_once(' ').map(|(_, rest)| rest);
    }

    None
}

/// How a step forward is acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ack {
    /// A draft was confirmed; its field may be another than the current question.
    Confirmed,
    /// A literal answer or a risk assessment `no` was stored for the current question.
    ThankYou,
}

impl Ack {
    fn prefix(self) -> &'static str {
        match self {
            Ack::Confirmed => "Confirmed",
            Ack::ThankYou => "Thank you",
        }
    }

    fn all_answered(self) -> &'static str {
        match self {
            Ack::Confirmed => messages::all_questions_answered(),
            Ack::ThankYou => messages::all_questions_answered_thank_you(),
        }
    }
}

/// Move to the next unanswered question, or wrap up when none remain.
///
/// A confirmation keeps the current index as a candidate, since the confirmed
/// draft may belong to another field.
async fn advance(runtime: &Runtime, channel_id: &str, root_ts: &str, conversation: &mut Conversation, ack: Ack) -> Void {
    let next = match ack {
        Ack::Confirmed => conversation.advance_from_current(),
        Ack::ThankYou => conversation.advance(),
    };

    match next {
        Some(field) => runtime.chat.send_message(channel_id, root_ts, &messages::next_question(ack.prefix(), &field.question_display())).await,
        None => {
            runtime.chat.send_message(channel_id, root_ts, ack.all_answered()).await?;
            intake::send_closeout(runtime, channel_id, root_ts).await
        }
    }
}

// Jira.

/// The configured custom fields with a value in the report.
pub fn jira_custom_fields(config: &Config, report: &IncidentReport) -> Map<String, Value> {
    let mut fields = Map::new();

    for (field_key, jira_field_id) in &config.jira_field_map {
        let Some(field) = IncidentField::from_key(field_key) else {
            warn!("Ignoring Jira field mapping for unknown report field `{}`", field_key);
            continue;
        };

        let value = report.get(field);
        if !value.is_empty() {
            fields.insert(jira_field_id.clone(), Value::String(value.to_string()));
        }
    }

    fields
}

/// File the report: update the session's linked issue, or create a new one.
async fn post_to_jira(runtime: &Runtime, message: &IncomingMessage, report: &IncidentReport) -> Void {
    let channel_id = message.channel_id.as_str();
    let root_ts = message.root_ts();

    let markdown = render_markdown(report);
    let linked = runtime.store.session(&message.user_id).and_then(|s| s.linked_issue_key);

    let (key, text) = match file_report(runtime, linked.as_deref(), report, &markdown).await {
        Ok(key) => {
            // The attachment is a convenience; the issue itself already holds the report.
            if let Err(err) = runtime.tracker.attach_markdown(&key, "incident.md", &markdown).await {
                warn!("Could not attach report to {}: {}", key, err);
            }

            let text = if linked.is_some() { messages::jira_updated(&key) } else { messages::jira_created(&key) };
            (Some(key), text)
        }
        Err(err) => {
            warn!("Filing the report failed: {}", err);
            (None, messages::could_not_create_jira(&err))
        }
    };

    runtime.chat.send_message(channel_id, root_ts, &text).await?;

    post_to_docs(runtime, channel_id, root_ts, key.as_deref(), &markdown).await
}

/// Publish the report as a Google Doc, titled with the issue key when there is one.
async fn post_to_docs(runtime: &Runtime, channel_id: &str, root_ts: &str, key: Option<&str>, markdown: &str) -> Void {
    let title = document_title(&runtime.config.jira_summary, key);

    match runtime.docs.create_document(&title, markdown).await {
        Ok(Some(link)) => runtime.chat.send_message(channel_id, root_ts, &messages::google_doc_created(&link)).await,
        Ok(None) => Ok(()),
        Err(err) => {
            warn!("Creating the Google Doc failed: {}", err);
            runtime.chat.send_message(channel_id, root_ts, &messages::could_not_create_google_doc(&err)).await
        }
    }
}

fn document_title(base: &str, key: Option<&str>) -> String {
    match key {
        Some(key) => format!("{} {}", base.trim(), key).trim().to_string(),
        None => base.trim().to_string(),
    }
}

async fn file_report(runtime: &Runtime, linked: Option<&str>, report: &IncidentReport, markdown: &str) -> Res<String> {
    let mut fields = jira_custom_fields(&runtime.config, report);

    match linked {
        Some(key) => {
            fields.insert("description".to_string(), to_adf(markdown));
            runtime.tracker.update_issue(key, fields).await?;

            Ok(key.to_string())
        }
        None => runtime.tracker.create_issue(&runtime.config.jira_summary, markdown, fields).await,
    }
}
