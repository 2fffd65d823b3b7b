//! Intake steps shared by the DM and button handlers.

use tracing::{info, warn};

use crate::{
    base::{
        messages,
        schema::IncidentField,
        types::{DraftTurn, Void},
    },
    interaction::conversation::{Conversation, Phase},
    runtime::Runtime,
};

/// The Jira issue linked to the session that owns a DM channel.
pub fn linked_issue_for_channel(runtime: &Runtime, channel_id: &str) -> Option<String> {
    runtime.store.session_for_channel(channel_id).and_then(|s| s.linked_issue_key)
}

/// Reset the conversation to preface step 1, and send the intro and the first step.
pub async fn begin_preface(runtime: &Runtime, channel_id: &str, root_ts: &str, conversation: &mut Conversation) -> Void {
    info!("Starting preface in {} / {}", channel_id, root_ts);

    *conversation = Conversation::preface();

    let linked = linked_issue_for_channel(runtime, channel_id);

    runtime.chat.send_message(channel_id, root_ts, messages::PREFACE_TEXT).await?;
    runtime.chat.send_message(channel_id, root_ts, &messages::preface_step_text(1, linked.as_deref())).await?;

    Ok(())
}

/// Reset the conversation to question 1, and send the form introduction and the first question.
pub async fn begin_questionnaire(runtime: &Runtime, channel_id: &str, root_ts: &str, conversation: &mut Conversation) -> Void {
    info!("Starting questionnaire in {} / {}", channel_id, root_ts);

    *conversation = Conversation::collecting();

    for part in messages::FORM_TEXT_PARTS {
        runtime.chat.send_message(channel_id, root_ts, part).await?;
    }

    let text = match conversation.current_field() {
        Some(field) => messages::first_question(conversation.total_questions(), &field.question_display()),
        None => messages::no_open_questions_short().to_string(),
    };

    runtime.chat.send_message(channel_id, root_ts, &text).await
}

/// Start a new preface conversation in a thread.
pub async fn start_preface_thread(runtime: &Runtime, channel_id: &str, root_ts: &str) -> Void {
    let handle = runtime.store.insert_conversation(channel_id, root_ts, Conversation::preface());
    let mut conversation = handle.lock().await;

    begin_preface(runtime, channel_id, root_ts, &mut conversation).await
}

/// Start a new questionnaire conversation in a thread.
pub async fn start_questionnaire_thread(runtime: &Runtime, channel_id: &str, root_ts: &str) -> Void {
    let handle = runtime.store.insert_conversation(channel_id, root_ts, Conversation::collecting());
    let mut conversation = handle.lock().await;

    begin_questionnaire(runtime, channel_id, root_ts, &mut conversation).await
}

/// The closeout nudging `jira`/`finalize`, followed by the follow-up steps.
pub async fn send_closeout(runtime: &Runtime, channel_id: &str, root_ts: &str) -> Void {
    runtime.chat.send_message(channel_id, root_ts, messages::no_open_questions_with_jira()).await?;
    runtime.chat.send_message(channel_id, root_ts, messages::FOLLOWUP_STEPS_TEXT).await
}

/// Re-send the latest prompt of a thread's conversation, or start the preface when there is none.
pub async fn resume_latest_prompt(runtime: &Runtime, channel_id: &str, root_ts: &str) -> Void {
    let Some(handle) = runtime.store.conversation(channel_id, root_ts) else {
        return start_preface_thread(runtime, channel_id, root_ts).await;
    };

    let conversation = handle.lock().await;

    let text = match conversation.phase {
        Phase::Preface { step } => messages::preface_step_text(step, linked_issue_for_channel(runtime, channel_id).as_deref()),
        Phase::Collecting => match (&conversation.pending, conversation.current_field()) {
            (Some(pending), _) => messages::proposal(pending.field.label(), &pending.candidate),
            (None, Some(_)) => conversation.next_step_text(),
            (None, None) => messages::no_open_questions_with_jira().to_string(),
        },
    };

    runtime.chat.send_message(channel_id, root_ts, &text).await
}

// Model calls.

/// Rewrite an answer for a field, falling back to the answer itself when the model fails.
pub async fn rewrite_or_raw(runtime: &Runtime, field: IncidentField, raw: &str) -> String {
    match runtime.llm.rewrite_field(field.label(), raw).await {
        Ok(value) => value,
        Err(err) => {
            warn!("Rewrite for {} failed, using the raw answer: {}", field.key(), err);
            raw.trim().to_string()
        }
    }
}

/// Revise a draft, falling back to `current` when the model fails.
pub async fn revise_or_keep(runtime: &Runtime, history: &[DraftTurn], instructions: &str, current: &str) -> String {
    match runtime.llm.revise_field(history, instructions).await {
        Ok(value) => value,
        Err(err) => {
            warn!("Revision failed, keeping the current draft: {}", err);
            current.to_string()
        }
    }
}
