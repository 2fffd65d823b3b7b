//! User-facing message texts and builders.
//!
//! Everything the bot says in a thread is assembled here, so the interaction
//! layer only decides _which_ message to send.

use crate::base::schema::IncidentField;

use super::types::TextMode;

// Preface.

/// Intro sent when a new intake thread is started.
pub const PREFACE_TEXT: &str = "*Security incident intake*\n\
Thanks for reaching out. I will guide you through reporting a security incident. \
We first go through a few short steps to make sure the incident is handled correctly, \
after which I will ask the questions of the incident report one by one.\n\n\
You can type `help` at any time, or `cancel` to stop.";

/// Preface steps. All but the last require an explicit `yes`/`ok`; the last requires `start`.
pub const PREFACE_STEPS: [&str; 7] = [
    "*Step 1/7: Contain.* If the incident is still ongoing, take immediate measures to limit the damage \
     (e.g. disconnect an affected device from the network, revoke a leaked credential). Reply `ok` once done.",
    "*Step 2/7: Inform.* Inform your manager and the security officer about the incident. Reply `ok` once done.",
    "*Step 3/7: Personal data.* Determine whether personal data is involved. If so, the privacy officer must be \
     informed within 24 hours, as a data breach may have to be reported to the authority within 72 hours. Reply `ok` once done.",
    "*Step 4/7: Preserve evidence.* Do not delete logs, e-mails or files related to the incident. Reply `ok` once done.",
    "*Step 5/7: Register.* Make sure the incident is registered in Jira. If you already shared an issue link, it will be linked \
     to this conversation. Reply `ok` to continue.",
    "*Step 6/7: Communicate.* Agree with the security officer who communicates with customers or other stakeholders, \
     if needed. Reply `ok` once done.",
    "*Step 7/7: Report.* We will now fill in the incident report together. I will ask one question at a time. \
     Type `start` to begin.",
];

/// The text of a preface step (1-based), mentioning the linked issue when there is one.
pub fn preface_step_text(step: usize, linked_issue_key: Option<&str>) -> String {
    let index = step.clamp(1, PREFACE_STEPS.len()) - 1;
    let text = PREFACE_STEPS[index];

    match linked_issue_key {
        Some(key) => format!("{text}\n\n_Linked Jira issue: {key}_"),
        None => text.to_string(),
    }
}

pub fn preface_step_incomplete(step: usize) -> String {
    format!("Step {step} has not been confirmed yet. Reply `yes` or `ok` once it is done, or `cancel` to stop.")
}

// Form.

/// The form introduction, sent as three consecutive messages before question 1.
pub const FORM_TEXT_PARTS: [&str; 3] = [
    "*Incident report*\nThe report follows the deviation and corrective action procedure. It has six chapters: \
     description, measures, analysis, assessment of measures, lessons learned and the relation to ISO 27001 Annex A.",
    "*How answering works*\nIn `story` mode (default) I rewrite your answer into concise prose and ask you to confirm it. \
     Reply `yes` to accept, `new <text>` to replace it, or type instructions to change it. \
     In `literal` mode your answer is stored as-is. Switch with `mode story` or `mode literal`, \
     or prefix a single answer with `story` or `literal`.",
    "*Useful commands*\n`status`, `fields`, `show`, `edit <field> <value>`, `finalize`, `jira`, `help`, `cancel`.",
];

pub const HELP_TEXT: &str = "*Commands*\n\
• `status`: show progress and the current question\n\
• `fields`: list all fields with their current values\n\
• `show`: preview the report as Markdown\n\
• `continue`: repeat the current question\n\
• `mode story` / `mode literal`: switch how answers are processed\n\
• `showmode`: show the current mode\n\
• `edit <field> <value>`: change a field (field by number, e.g. `2.1`, or by name)\n\
• `new <value>`: replace the proposal that is waiting for confirmation\n\
• `finalize`: print the final report\n\
• `jira`: create (or update) the Jira issue with the report attached\n\
• `cancel`: stop this intake";

pub const FOLLOWUP_STEPS_TEXT: &str = "*Follow-up*\n\
1. Make sure the actions from chapter 2 and 3 are planned in Jira.\n\
2. Chapter 4 is completed once the Jira actions are done: evaluate the effectiveness of the measures.\n\
3. Discuss the lessons learned in the next team meeting.";

// Questionnaire.

pub fn first_question(total: usize, question_display: &str) -> String {
    format!("*Question 1/{total}*\n{question_display}")
}

pub fn question_progress(index: usize, total: usize, question_display: &str) -> String {
    format!("*Question {}/{total}*\n{question_display}", index + 1)
}

/// The standard proposal message asking the user to confirm or revise.
pub fn proposal(label: &str, value: &str) -> String {
    format!("Proposal for {label}:\n{value}\n\nConfirm with `yes`/`ok`, provide an alternative via `new <value>`, or type instructions how to change it.")
}

pub fn proposal_edit(label: &str, value: &str) -> String {
    format!("Proposal (edit) for {label}:\n{value}\n\nConfirm with `yes`/`ok`, provide an alternative via `new <value>`, or type instructions how to change it.")
}

/// The next-question message with a prefix such as `Confirmed` or `Thank you`.
pub fn next_question(prefix: &str, question_display: &str) -> String {
    format!("{prefix}. Next question: {question_display}")
}

pub fn waiting_for_confirmation(label: &str) -> String {
    format!("Waiting for confirmation for {label}. Confirm with `yes`/`ok`, or provide an alternative (e.g., `literal ...` or `story ...`).")
}

pub fn all_questions_answered() -> &'static str {
    "Confirmed. All questions answered. Send `finalize` to finish."
}

pub fn all_questions_answered_thank_you() -> &'static str {
    "Thank you. All questions answered. Send `finalize` to finish."
}

pub fn no_open_questions_short() -> &'static str {
    "No open questions left. Send `finalize` to finish."
}

pub fn no_open_questions_with_jira() -> &'static str {
    "No open questions left. *Please create a Jira issue for this report using the `jira` command*. Type `finalize` to print the final report (markdown)."
}

pub fn risk_assessment_followup_question() -> &'static str {
    "For making a risk assessment, contact the holder of the risk inventory. What was agreed as a result of this discussion?"
}

pub fn risk_assessment_yesno_prompt(question_display: &str) -> String {
    format!("Please answer `yes` or `no` for 2.3 Risk assessment.\n\nQuestion: {question_display}")
}

pub fn need_risk_assessment_detail() -> &'static str {
    "Please first describe what was agreed for the risk assessment before confirming."
}

// Commands.

/// Warning about incomplete answers before finalizing or filing.
pub fn warning_incomplete(action_text: &str) -> String {
    format!("Warning: You have not answered all the questions yet. Are you sure you want to {action_text}? Reply `yes` to proceed or `no` to cancel and continue with the questions.")
}

pub fn proceed_or_cancel_instruction() -> &'static str {
    "Please answer `yes` to proceed or `no` to cancel."
}

pub fn input_mode_set(mode: TextMode) -> String {
    format!("Input mode set to `{mode}`.")
}

pub fn current_input_mode(mode: TextMode) -> String {
    format!("Current input mode: `{mode}`.")
}

pub fn usage_mode() -> &'static str {
    "Usage: `mode story` or `mode literal`."
}

pub fn usage_edit_example() -> &'static str {
    "Usage: `edit <field> <value>`, e.g. `edit 2.1 The laptop was wiped remotely.` or `edit gevolgen literal: No customer impact.`"
}

pub fn unknown_field(token: &str) -> String {
    format!("Unknown field `{token}`. Type `fields` to see the available fields.")
}

pub fn changed_field(field: IncidentField) -> String {
    format!("Field {} updated.", field.label())
}

pub fn current_markdown(markdown: &str) -> String {
    format!("Current report:\n```\n{markdown}\n```")
}

pub fn final_document(markdown: &str) -> String {
    format!("Final report:\n```\n{markdown}\n```")
}

pub fn could_not_process_message() -> &'static str {
    "Sorry, I could not process that message. Type `help` for the available commands."
}

pub fn incident_canceled() -> &'static str {
    "Incident intake canceled. Send a new message to start over."
}

// Jira.

pub fn jira_created(key: &str) -> String {
    format!("Jira issue created: {key}")
}

pub fn jira_updated(key: &str) -> String {
    format!("Jira issue updated: {key}")
}

pub fn could_not_create_jira(err: &impl std::fmt::Display) -> String {
    format!("Could not create Jira issue: {err}")
}

// Google Docs.

pub fn google_doc_created(link: &str) -> String {
    format!("Google Doc created: {link}")
}

pub fn could_not_create_google_doc(err: &impl std::fmt::Display) -> String {
    format!("Could not create Google Doc: {err}")
}

// Issue linking.

pub fn issue_linked(key: &str) -> String {
    format!("{key} linked.")
}

pub fn issue_not_linked() -> &'static str {
    "Issue not linked."
}

pub fn incident_invitation(key: &str) -> String {
    format!("You just reported a security incident in issue *{key}*.\nDo you want to go through the full security incident handling process together?")
}

pub fn link_request(key: &str) -> String {
    format!("A new ISO issue has been reported: {key}. Do you want to link this incident to this conversation?")
}

pub fn pending_incidents_prompt() -> &'static str {
    "You reported incidents earlier. Do you want to link one?"
}

pub fn pending_incidents_picker() -> &'static str {
    "Choose an incident to link"
}

// App home.

pub const APP_HOME_TITLE: &str = "Security Incident Agent — Usage";

pub const USAGE_UNAVAILABLE: &str = "Usage guide unavailable. Make sure USAGE.md exists at the configured path.";
