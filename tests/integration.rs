#![cfg(test)]

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use incident_bot::{
    base::{
        config::{Config, ConfigInner},
        messages,
        schema::IncidentField,
        types::{DraftTurn, Res, ThreadSummary, Void},
    },
    interaction::{
        app_home::handle_app_home_opened_internal,
        block_action::handle_block_action_internal,
        conversation::{Conversation, Phase},
        dm_message::{PICK_PENDING_INCIDENT, handle_dm_message_internal},
        event::{BlockAction, IncomingMessage, SharedLink},
        link_shared::{LINK_INCIDENT_CONFIRM, LINK_INCIDENT_DECLINE, handle_link_shared_internal},
    },
    runtime::Runtime,
    service::{
        chat::{ChatClient, GenericChatClient},
        docs::{DocsClient, GenericDocsClient},
        llm::{GenericLlmClient, LlmClient},
        state::{SessionState, StateStore},
        tracker::{GenericTrackerClient, TrackerClient},
    },
};
use mockall::mock;
use serde_json::{Map, Value};

// Mocks.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        fn bot_user_id(&self) -> &str;
        async fn start(&self) -> Void;
        async fn send_message(&self, channel_id: &str, thread_ts: &str, text: &str) -> Void;
        async fn send_blocks(&self, channel_id: &str, thread_ts: &str, text: &str, blocks: Value) -> Void;
        async fn open_dm(&self, user_id: &str) -> Res<String>;
        async fn get_message_text(&self, channel_id: &str, ts: &str) -> Res<Option<String>>;
        async fn find_user_by_name(&self, name: &str) -> Res<Option<String>>;
        async fn recent_threads(&self, channel_id: &str, limit: u16) -> Res<Vec<ThreadSummary>>;
        async fn publish_home(&self, user_id: &str, view: Value) -> Void;
    }
}

mock! {
    pub Llm {}

    #[async_trait]
    impl GenericLlmClient for Llm {
        async fn rewrite_field(&self, label: &str, raw: &str) -> Res<String>;
        async fn revise_field(&self, history: &[DraftTurn], instructions: &str) -> Res<String>;
    }
}

mock! {
    pub Docs {}

    #[async_trait]
    impl GenericDocsClient for Docs {
        async fn create_document(&self, title: &str, markdown: &str) -> Res<Option<String>>;
    }
}

mock! {
    pub Tracker {}

    #[async_trait]
    impl GenericTrackerClient for Tracker {
        async fn create_issue(&self, summary: &str, description_markdown: &str, extra_fields: Map<String, Value>) -> Res<String>;
        async fn update_issue(&self, key: &str, fields: Map<String, Value>) -> Void;
        async fn attach_markdown(&self, key: &str, filename: &str, content: &str) -> Void;
    }
}

// Fixtures.

const DM: &str = "D1";
const USER: &str = "U1";
const ROOT: &str = "1.0";

/// A message or block prompt the bot posted.
#[derive(Debug, Clone)]
struct Post {
    channel: String,
    thread: String,
    text: String,
    blocks: Option<Value>,
}

type Posts = Arc<Mutex<Vec<Post>>>;

/// What the mocked chat platform answers with.
#[derive(Default)]
struct ChatFixture {
    /// The channel `open_dm` returns; opening fails without one.
    dm_channel: Option<String>,
    message_text: Option<String>,
    threads: Vec<ThreadSummary>,
}

struct Harness {
    runtime: Runtime,
    posts: Posts,
    homes: Arc<Mutex<Vec<Value>>>,
}

impl Harness {
    fn new(tracker: MockTracker) -> Self {
        Self::with_chat(dm_fixture(), tracker)
    }

    fn with_chat(fixture: ChatFixture, tracker: MockTracker) -> Self {
        Self::build(fixture, get_mock_llm(), tracker, DocsClient::disabled())
    }

    fn with_llm(llm: MockLlm) -> Self {
        Self::build(dm_fixture(), llm, idle_tracker(), DocsClient::disabled())
    }

    fn with_docs(tracker: MockTracker, docs: MockDocs) -> Self {
        Self::build(dm_fixture(), get_mock_llm(), tracker, DocsClient::new(Arc::new(docs)))
    }

    fn build(fixture: ChatFixture, llm: MockLlm, tracker: MockTracker, docs: DocsClient) -> Self {
        let posts: Posts = Arc::new(Mutex::new(Vec::new()));
        let homes = Arc::new(Mutex::new(Vec::new()));

        let config = test_config();
        let store = StateStore::new(&config);
        let chat = ChatClient::new(Arc::new(get_mock_chat(fixture, posts.clone(), homes.clone())));
        let llm = LlmClient::new(Arc::new(llm));
        let tracker = TrackerClient::new(Arc::new(tracker));

        Self {
            runtime: Runtime {
                config,
                store,
                llm,
                tracker,
                docs,
                chat,
            },
            posts,
            homes,
        }
    }

    fn texts(&self) -> Vec<String> {
        self.posts.lock().unwrap().iter().map(|p| p.text.clone()).collect()
    }

    fn last_text(&self) -> String {
        self.texts().last().cloned().unwrap_or_default()
    }

    fn clear(&self) {
        self.posts.lock().unwrap().clear();
    }

    async fn say(&self, text: &str) {
        handle_dm_message_internal(reply(text), &self.runtime).await.unwrap();
    }

    fn conversation(&self, conversation: Conversation) {
        self.runtime.store.insert_conversation(DM, ROOT, conversation);
    }

    async fn current(&self) -> Conversation {
        let handle = self.runtime.store.conversation(DM, ROOT).expect("conversation exists");
        handle.lock().await.clone()
    }
}

fn dm_fixture() -> ChatFixture {
    ChatFixture {
        dm_channel: Some(DM.to_string()),
        ..Default::default()
    }
}

fn test_config() -> Config {
    Config {
        inner: Arc::new(ConfigInner {
            openai_api_key: "test_key".to_string(),
            slack_app_token: "xapp-test".to_string(),
            slack_bot_token: "xoxb-test".to_string(),
            jira_summary: "Security incident".to_string(),
            linked_issue_pattern: r"/browse/(ISO-\d+)".to_string(),
            session_max_age_hours: 48,
            usage_path: PathBuf::from("does/not/exist/USAGE.md"),
            ..Default::default()
        }),
    }
}

fn get_mock_chat(fixture: ChatFixture, posts: Posts, homes: Arc<Mutex<Vec<Value>>>) -> MockChat {
    let mut mock = MockChat::new();

    mock.expect_bot_user_id().return_const("UBOT".to_string());
    mock.expect_start().returning(|| Ok(()));

    let sent = posts.clone();
    mock.expect_send_message().returning(move |channel, thread, text| {
        sent.lock().unwrap().push(Post {
            channel: channel.to_string(),
            thread: thread.to_string(),
            text: text.to_string(),
            blocks: None,
        });
        Ok(())
    });

    let sent = posts;
    mock.expect_send_blocks().returning(move |channel, thread, text, blocks| {
        sent.lock().unwrap().push(Post {
            channel: channel.to_string(),
            thread: thread.to_string(),
            text: text.to_string(),
            blocks: Some(blocks),
        });
        Ok(())
    });

    let dm_channel = fixture.dm_channel;
    mock.expect_open_dm()
        .returning(move |user_id| dm_channel.clone().ok_or_else(|| anyhow::anyhow!("cannot_dm_bot: {user_id}")));

    let message_text = fixture.message_text;
    mock.expect_get_message_text().returning(move |_, _| Ok(message_text.clone()));

    mock.expect_find_user_by_name().returning(|_| Ok(None));

    let threads = fixture.threads;
    mock.expect_recent_threads().returning(move |_, _| Ok(threads.clone()));

    mock.expect_publish_home().returning(move |_, view| {
        homes.lock().unwrap().push(view);
        Ok(())
    });

    mock
}

/// A model that fails every call.
fn failing_llm() -> MockLlm {
    let mut mock = MockLlm::new();

    mock.expect_rewrite_field().returning(|_, _| Err(anyhow::anyhow!("model overloaded")));
    mock.expect_revise_field().returning(|_, _| Err(anyhow::anyhow!("model overloaded")));

    mock
}

fn get_mock_llm() -> MockLlm {
    let mut mock = MockLlm::new();

    mock.expect_rewrite_field().returning(|_, raw| Ok(format!("Rewritten: {}", raw.trim())));
    mock.expect_revise_field().returning(|_, instructions| Ok(format!("Revised: {}", instructions.trim())));

    mock
}

/// A tracker that must not be called.
fn idle_tracker() -> MockTracker {
    let mut mock = MockTracker::new();

    mock.expect_create_issue().never();
    mock.expect_update_issue().never();
    mock.expect_attach_markdown().never();

    mock
}

fn top_level(text: &str) -> IncomingMessage {
    IncomingMessage {
        channel_id: DM.to_string(),
        channel_type: Some("im".to_string()),
        user_id: USER.to_string(),
        ts: ROOT.to_string(),
        thread_ts: None,
        text: text.to_string(),
        is_bot: false,
        is_system: false,
    }
}

fn reply(text: &str) -> IncomingMessage {
    IncomingMessage {
        ts: "2.0".to_string(),
        thread_ts: Some(ROOT.to_string()),
        ..top_level(text)
    }
}

fn complete_conversation() -> Conversation {
    let mut conversation = Conversation::collecting();
    for field in IncidentField::ALL {
        conversation.report.set(field, format!("Answer for {}", field.key()));
    }
    conversation.index = conversation.total_questions();
    conversation
}

// Tests.

#[tokio::test]
async fn first_message_starts_the_preface() {
    let harness = Harness::new(idle_tracker());

    handle_dm_message_internal(top_level("Our laptop was stolen"), &harness.runtime).await.unwrap();

    assert_eq!(harness.texts(), vec![messages::PREFACE_TEXT.to_string(), messages::preface_step_text(1, None)]);
    assert!(harness.posts.lock().unwrap().iter().all(|p| p.channel == DM && p.thread == ROOT));
    assert_eq!(harness.current().await.phase, Phase::Preface { step: 1 });

    let session = harness.runtime.store.session(USER).unwrap();
    assert_eq!(session.dm_channel.as_deref(), Some(DM));
}

#[tokio::test]
async fn edits_and_bot_posts_do_not_start_an_intake() {
    let harness = Harness::new(idle_tracker());

    let edited = IncomingMessage {
        ts: "9.9".to_string(),
        is_system: true,
        ..top_level("Our laptop was stolen (edited)")
    };
    let anonymous = IncomingMessage {
        user_id: String::new(),
        ..top_level("Our laptop was stolen")
    };
    let bot = IncomingMessage {
        is_bot: true,
        ..top_level("Step 1/7")
    };

    for message in [edited, anonymous, bot] {
        handle_dm_message_internal(message, &harness.runtime).await.unwrap();
    }

    assert!(harness.texts().is_empty());
    assert!(harness.runtime.store.conversation(DM, ROOT).is_none());
    assert!(harness.runtime.store.session(USER).is_none());
}

#[tokio::test]
async fn edits_in_a_running_thread_are_ignored() {
    let harness = Harness::new(idle_tracker());
    harness.conversation(Conversation::collecting());

    let edited = IncomingMessage {
        is_system: true,
        ..reply("A laptop was stolen")
    };

    handle_dm_message_internal(edited, &harness.runtime).await.unwrap();

    assert!(harness.texts().is_empty());
    assert!(harness.current().await.pending.is_none());
}

#[tokio::test]
async fn preface_steps_need_confirmation() {
    let harness = Harness::new(idle_tracker());
    harness.conversation(Conversation::preface());

    harness.say("ok").await;
    assert_eq!(harness.last_text(), messages::preface_step_text(2, None));

    harness.say("maybe later").await;
    assert_eq!(harness.last_text(), messages::preface_step_incomplete(2));
    assert_eq!(harness.current().await.phase, Phase::Preface { step: 2 });
}

#[tokio::test]
async fn last_preface_step_waits_for_start() {
    let harness = Harness::new(idle_tracker());
    harness.conversation(Conversation {
        phase: Phase::Preface { step: 7 },
        ..Conversation::preface()
    });

    harness.say("ok").await;
    assert_eq!(harness.last_text(), messages::preface_step_text(7, None));

    harness.clear();
    harness.say("start").await;

    let texts = harness.texts();
    assert_eq!(texts.len(), messages::FORM_TEXT_PARTS.len() + 1);
    assert_eq!(texts[0], messages::FORM_TEXT_PARTS[0]);
    assert_eq!(texts[3], messages::first_question(14, &IncidentField::BeschrijvingAfwijking.question_display()));
    assert_eq!(harness.current().await.phase, Phase::Collecting);
}

#[tokio::test]
async fn start_in_a_thread_without_conversation_opens_the_questionnaire() {
    let harness = Harness::new(idle_tracker());

    harness.say("start").await;

    assert_eq!(harness.texts().len(), 4);
    assert_eq!(harness.current().await.index, 0);
}

#[tokio::test]
async fn story_answer_is_proposed_then_accepted() {
    let harness = Harness::new(idle_tracker());
    harness.conversation(Conversation::collecting());

    harness.say("A laptop was stolen from a car").await;

    let label = IncidentField::BeschrijvingAfwijking.label();
    assert_eq!(harness.last_text(), messages::proposal(label, "Rewritten: A laptop was stolen from a car"));

    harness.say("yes").await;

    let next = IncidentField::MaatregelenBeheersenCorrigeren;
    assert_eq!(harness.last_text(), messages::next_question("Confirmed", &next.question_display()));

    let conversation = harness.current().await;
    assert_eq!(conversation.report.get(IncidentField::BeschrijvingAfwijking), "Rewritten: A laptop was stolen from a car");
    assert_eq!(conversation.index, 1);
    assert!(conversation.pending.is_none());
}

#[tokio::test]
async fn instructions_revise_the_draft() {
    let harness = Harness::new(idle_tracker());
    harness.conversation(Conversation::collecting());

    harness.say("A laptop was stolen").await;
    harness.say("mention it was encrypted").await;

    let label = IncidentField::BeschrijvingAfwijking.label();
    assert_eq!(harness.last_text(), messages::proposal(label, "Revised: mention it was encrypted"));

    let pending = harness.current().await.pending.unwrap();
    assert_eq!(pending.candidate, "Revised: mention it was encrypted");
    assert_eq!(pending.history.len(), 4);
}

#[tokio::test]
async fn failed_rewrite_proposes_the_raw_answer() {
    let harness = Harness::with_llm(failing_llm());
    harness.conversation(Conversation::collecting());

    harness.say("  A laptop was stolen  ").await;

    let label = IncidentField::BeschrijvingAfwijking.label();
    assert_eq!(harness.last_text(), messages::proposal(label, "A laptop was stolen"));
    assert_eq!(harness.current().await.pending.unwrap().candidate, "A laptop was stolen");
}

#[tokio::test]
async fn failed_revision_keeps_the_draft() {
    let harness = Harness::with_llm(failing_llm());
    harness.conversation(Conversation::collecting());

    harness.say("A laptop was stolen").await;
    harness.say("mention it was encrypted").await;

    let label = IncidentField::BeschrijvingAfwijking.label();
    assert_eq!(harness.last_text(), messages::proposal(label, "A laptop was stolen"));

    let conversation = harness.current().await;
    let pending = conversation.pending.unwrap();
    assert_eq!(pending.candidate, "A laptop was stolen");
    assert_eq!(pending.history.len(), 4);
    assert_eq!(conversation.report.get(IncidentField::BeschrijvingAfwijking), "");

    // Accepting commits the unchanged draft.
    harness.say("yes").await;
    assert_eq!(harness.current().await.report.get(IncidentField::BeschrijvingAfwijking), "A laptop was stolen");
}

#[tokio::test]
async fn new_keyword_replaces_the_draft() {
    let harness = Harness::new(idle_tracker());
    harness.conversation(Conversation::collecting());

    harness.say("A laptop was stolen").await;
    harness.say("new literal Phone lost on the train").await;

    let conversation = harness.current().await;
    assert_eq!(conversation.report.get(IncidentField::BeschrijvingAfwijking), "Phone lost on the train");
    assert_eq!(conversation.index, 1);
}

#[tokio::test]
async fn literal_answers_are_stored_verbatim() {
    let harness = Harness::new(idle_tracker());
    harness.conversation(Conversation::collecting());

    harness.say("literal The laptop was stolen").await;

    let next = IncidentField::MaatregelenBeheersenCorrigeren;
    assert_eq!(harness.last_text(), messages::next_question("Thank you", &next.question_display()));
    assert_eq!(harness.current().await.report.get(IncidentField::BeschrijvingAfwijking), "The laptop was stolen");
}

#[tokio::test]
async fn literal_mode_skips_already_filled_fields() {
    let harness = Harness::new(idle_tracker());

    let mut conversation = Conversation::collecting();
    conversation.report.set(IncidentField::MaatregelenBeheersenCorrigeren, "Wiped remotely.");
    harness.conversation(conversation);

    harness.say("mode literal").await;
    harness.say("Stolen laptop").await;

    let next = IncidentField::AanpassenConsequenties;
    assert_eq!(harness.last_text(), messages::next_question("Thank you", &next.question_display()));
    assert_eq!(harness.current().await.index, 2);
}

#[tokio::test]
async fn risk_assessment_yes_asks_for_the_agreement() {
    let harness = Harness::new(idle_tracker());
    harness.conversation(Conversation {
        index: 3,
        ..Conversation::collecting()
    });

    harness.say("yes").await;
    assert_eq!(harness.last_text(), messages::risk_assessment_followup_question());

    harness.say("ok").await;
    assert_eq!(harness.last_text(), messages::need_risk_assessment_detail());

    harness.say("We accept the residual risk").await;
    let label = IncidentField::Risicoafweging.label();
    assert_eq!(harness.last_text(), messages::proposal(label, "yes: Rewritten: We accept the residual risk"));

    harness.say("ok").await;

    let conversation = harness.current().await;
    assert_eq!(conversation.report.get(IncidentField::Risicoafweging), "yes: Rewritten: We accept the residual risk");
    assert_eq!(conversation.current_field(), Some(IncidentField::OorzaakOntstaan));
}

#[tokio::test]
async fn risk_assessment_no_moves_on() {
    let harness = Harness::new(idle_tracker());
    harness.conversation(Conversation {
        index: 3,
        ..Conversation::collecting()
    });

    harness.say("perhaps").await;
    assert_eq!(harness.last_text(), messages::risk_assessment_yesno_prompt(&IncidentField::Risicoafweging.question_display()));

    harness.say("no").await;

    let next = IncidentField::OorzaakOntstaan;
    assert_eq!(harness.last_text(), messages::next_question("Thank you", &next.question_display()));
    assert_eq!(harness.current().await.report.get(IncidentField::Risicoafweging), "no");
}

#[tokio::test]
async fn risk_assessment_no_on_the_last_open_question_closes_out() {
    let harness = Harness::new(idle_tracker());

    let mut conversation = complete_conversation();
    conversation.report.set(IncidentField::Risicoafweging, "");
    conversation.index = 3;
    harness.conversation(conversation);

    harness.say("no").await;

    assert_eq!(
        harness.texts(),
        vec![
            messages::all_questions_answered_thank_you().to_string(),
            messages::no_open_questions_with_jira().to_string(),
            messages::FOLLOWUP_STEPS_TEXT.to_string(),
        ]
    );
    assert_eq!(harness.current().await.report.get(IncidentField::Risicoafweging), "no");
}

#[tokio::test]
async fn edit_changes_any_field() {
    let harness = Harness::new(idle_tracker());
    harness.conversation(Conversation::collecting());

    harness.say("edit leerpunten literal Patch faster").await;
    assert_eq!(harness.last_text(), messages::changed_field(IncidentField::Leerpunten));

    harness.say("edit nonsense value").await;
    assert_eq!(harness.last_text(), messages::unknown_field("nonsense"));

    harness.say("edit 2.3").await;
    assert_eq!(harness.last_text(), messages::usage_edit_example());

    let conversation = harness.current().await;
    assert_eq!(conversation.report.get(IncidentField::Leerpunten), "Patch faster");
    assert_eq!(conversation.index, 0);
}

#[tokio::test]
async fn incomplete_finalize_needs_a_yes() {
    let harness = Harness::new(idle_tracker());
    harness.conversation(Conversation::collecting());

    harness.say("finalize").await;
    assert_eq!(harness.last_text(), messages::warning_incomplete("finalize"));

    harness.say("yes").await;
    assert!(harness.last_text().starts_with("Final report:"));

    // The override is spent.
    harness.say("finalize").await;
    assert_eq!(harness.last_text(), messages::warning_incomplete("finalize"));

    harness.say("no").await;
    let conversation = harness.current().await;
    assert_eq!(harness.last_text(), conversation.next_step_text());
    assert_eq!(conversation.confirm_action, None);
}

#[tokio::test]
async fn last_answer_sends_the_closeout() {
    let harness = Harness::new(idle_tracker());

    let mut conversation = complete_conversation();
    conversation.report.set(IncidentField::RelatieIso27001AnnexA, "");
    conversation.index = 13;
    harness.conversation(conversation);

    harness.say("literal A.5.25").await;

    let texts = harness.texts();
    assert_eq!(
        texts,
        vec![
            messages::all_questions_answered_thank_you().to_string(),
            messages::no_open_questions_with_jira().to_string(),
            messages::FOLLOWUP_STEPS_TEXT.to_string(),
        ]
    );
}

#[tokio::test]
async fn accepted_last_draft_confirms_and_closes_out() {
    let harness = Harness::new(idle_tracker());

    let mut conversation = complete_conversation();
    conversation.report.set(IncidentField::RelatieIso27001AnnexA, "");
    conversation.index = 13;
    harness.conversation(conversation);

    harness.say("A.5.25").await;
    harness.clear();
    harness.say("yes").await;

    assert_eq!(
        harness.texts(),
        vec![
            messages::all_questions_answered().to_string(),
            messages::no_open_questions_with_jira().to_string(),
            messages::FOLLOWUP_STEPS_TEXT.to_string(),
        ]
    );
}

#[tokio::test]
async fn jira_creates_an_issue_without_a_linked_one() {
    let mut tracker = MockTracker::new();
    tracker
        .expect_create_issue()
        .withf(|summary, description, _| summary == "Security incident" && description.contains("Answer for leerpunten"))
        .times(1)
        .returning(|_, _, _| Ok("ISO-100".to_string()));
    tracker.expect_update_issue().never();
    tracker
        .expect_attach_markdown()
        .withf(|key, filename, _| key == "ISO-100" && filename == "incident.md")
        .times(1)
        .returning(|_, _, _| Ok(()));

    let harness = Harness::new(tracker);
    harness.conversation(complete_conversation());

    harness.say("jira").await;

    assert_eq!(harness.last_text(), messages::jira_created("ISO-100"));
}

#[tokio::test]
async fn jira_updates_the_linked_issue() {
    let mut tracker = MockTracker::new();
    tracker.expect_create_issue().never();
    tracker
        .expect_update_issue()
        .withf(|key, fields| key == "ISO-7" && fields.contains_key("description"))
        .times(1)
        .returning(|_, _| Ok(()));
    tracker.expect_attach_markdown().times(1).returning(|_, _, _| Err(anyhow::anyhow!("attachments disabled")));

    let harness = Harness::new(tracker);
    harness.runtime.store.link_issue(USER, "ISO-7");
    harness.conversation(complete_conversation());

    harness.say("jira").await;

    assert_eq!(harness.last_text(), messages::jira_updated("ISO-7"));
}

#[tokio::test]
async fn jira_failure_is_reported() {
    let mut tracker = MockTracker::new();
    tracker.expect_create_issue().times(1).returning(|_, _, _| Err(anyhow::anyhow!("Jira returned 400")));
    tracker.expect_attach_markdown().never();

    let harness = Harness::new(tracker);
    harness.conversation(complete_conversation());

    harness.say("jira").await;

    assert_eq!(harness.last_text(), messages::could_not_create_jira(&"Jira returned 400"));
}

#[tokio::test]
async fn jira_posts_the_google_doc_link() {
    let mut tracker = MockTracker::new();
    tracker.expect_create_issue().times(1).returning(|_, _, _| Ok("ISO-100".to_string()));
    tracker.expect_attach_markdown().times(1).returning(|_, _, _| Ok(()));

    let mut docs = MockDocs::new();
    docs.expect_create_document()
        .withf(|title, markdown| title == "Security incident ISO-100" && markdown.contains("Answer for leerpunten"))
        .times(1)
        .returning(|_, _| Ok(Some("https://docs.google.com/document/d/doc-1".to_string())));

    let harness = Harness::with_docs(tracker, docs);
    harness.conversation(complete_conversation());

    harness.say("jira").await;

    let texts = harness.texts();
    assert_eq!(texts[texts.len() - 2], messages::jira_created("ISO-100"));
    assert_eq!(texts[texts.len() - 1], messages::google_doc_created("https://docs.google.com/document/d/doc-1"));
}

#[tokio::test]
async fn google_doc_is_still_created_when_jira_fails() {
    let mut tracker = MockTracker::new();
    tracker.expect_create_issue().times(1).returning(|_, _, _| Err(anyhow::anyhow!("Jira returned 400")));
    tracker.expect_attach_markdown().never();

    let mut docs = MockDocs::new();
    docs.expect_create_document()
        .withf(|title, _| title == "Security incident")
        .times(1)
        .returning(|_, _| Err(anyhow::anyhow!("Invalid token")));

    let harness = Harness::with_docs(tracker, docs);
    harness.conversation(complete_conversation());

    harness.say("jira").await;

    let texts = harness.texts();
    assert_eq!(texts[texts.len() - 2], messages::could_not_create_jira(&"Jira returned 400"));
    assert_eq!(texts[texts.len() - 1], messages::could_not_create_google_doc(&"Invalid token"));
}

#[tokio::test]
async fn google_doc_without_a_link_posts_nothing_more() {
    let mut tracker = MockTracker::new();
    tracker.expect_create_issue().times(1).returning(|_, _, _| Ok("ISO-101".to_string()));
    tracker.expect_attach_markdown().times(1).returning(|_, _, _| Ok(()));

    let mut docs = MockDocs::new();
    docs.expect_create_document().times(1).returning(|_, _| Ok(None));

    let harness = Harness::with_docs(tracker, docs);
    harness.conversation(complete_conversation());

    harness.say("jira").await;

    assert_eq!(harness.last_text(), messages::jira_created("ISO-101"));
}

#[tokio::test]
async fn cancel_drops_conversation_and_session() {
    let harness = Harness::new(idle_tracker());
    harness.runtime.store.link_issue(USER, "ISO-7");
    harness.conversation(Conversation::collecting());

    harness.say("cancel").await;

    assert_eq!(harness.last_text(), messages::incident_canceled());
    assert!(harness.runtime.store.conversation(DM, ROOT).is_none());
    assert!(harness.runtime.store.session(USER).is_none());
}

#[tokio::test]
async fn new_thread_offers_pending_incidents() {
    let harness = Harness::new(idle_tracker());
    harness.runtime.store.add_pending(USER, "ISO-9");

    handle_dm_message_internal(top_level("Hello"), &harness.runtime).await.unwrap();

    let posts = harness.posts.lock().unwrap().clone();
    assert_eq!(posts[0].text, messages::pending_incidents_prompt());

    let blocks = posts[0].blocks.as_ref().unwrap();
    assert_eq!(blocks[0]["accessory"]["action_id"], PICK_PENDING_INCIDENT);
    assert_eq!(blocks[0]["accessory"]["options"][0]["value"], "ISO-9");

    assert_eq!(posts[1].text, messages::PREFACE_TEXT);

    // The session was renewed.
    assert!(harness.runtime.store.session(USER).unwrap().pending_incident_keys.is_empty());
}

#[tokio::test]
async fn shared_link_invites_a_new_reporter() {
    let harness = Harness::with_chat(
        ChatFixture {
            dm_channel: Some("D2".to_string()),
            ..Default::default()
        },
        idle_tracker(),
    );

    let link = SharedLink {
        channel_id: "C1".to_string(),
        message_ts: String::new(),
        user_id: "U2".to_string(),
        urls: vec!["https://jira.example.com/browse/ISO-12".to_string()],
    };

    handle_link_shared_internal(link, &harness.runtime).await.unwrap();

    let posts = harness.posts.lock().unwrap().clone();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].channel, "D2");
    assert_eq!(posts[0].thread, "");
    assert_eq!(posts[0].text, messages::incident_invitation("ISO-12"));

    let buttons = &posts[0].blocks.as_ref().unwrap()[1]["elements"];
    assert_eq!(buttons[0]["action_id"], LINK_INCIDENT_CONFIRM);
    assert_eq!(buttons[1]["action_id"], LINK_INCIDENT_DECLINE);
    assert_eq!(buttons[0]["value"], "ISO-12");

    let session = harness.runtime.store.session("U2").unwrap();
    assert_eq!(session.pending_incident_keys, vec!["ISO-12".to_string()]);
    assert_eq!(session.dm_channel.as_deref(), Some("D2"));
}

#[tokio::test]
async fn failed_dm_leaves_no_session_behind() {
    let harness = Harness::with_chat(ChatFixture::default(), idle_tracker());

    let link = SharedLink {
        channel_id: "C1".to_string(),
        message_ts: String::new(),
        user_id: "U2".to_string(),
        urls: vec!["https://jira.example.com/browse/ISO-12".to_string()],
    };

    let result = handle_link_shared_internal(link, &harness.runtime).await;

    assert!(result.is_err());
    assert!(harness.texts().is_empty());
    assert!(harness.runtime.store.session("U2").is_none());
}

#[tokio::test]
async fn shared_link_asks_a_waiting_reporter_in_their_thread() {
    let harness = Harness::with_chat(
        ChatFixture {
            dm_channel: Some("D3".to_string()),
            message_text: Some("Reported by <@U3> just now".to_string()),
            threads: vec![
                ThreadSummary {
                    ts: "10.0".to_string(),
                    user: Some("U3".to_string()),
                    latest_reply: Some("30.0".to_string()),
                    ..Default::default()
                },
                ThreadSummary {
                    ts: "20.0".to_string(),
                    user: Some("U3".to_string()),
                    ..Default::default()
                },
                ThreadSummary {
                    ts: "40.0".to_string(),
                    is_bot: true,
                    ..Default::default()
                },
            ],
        },
        idle_tracker(),
    );
    harness.runtime.store.create_session("U3");

    let link = SharedLink {
        channel_id: "C1".to_string(),
        message_ts: "5.0".to_string(),
        user_id: "U9".to_string(),
        urls: vec!["https://jira.example.com/browse/ISO-13".to_string()],
    };

    handle_link_shared_internal(link, &harness.runtime).await.unwrap();

    let posts = harness.posts.lock().unwrap().clone();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].thread, "10.0");
    assert_eq!(posts[0].text, messages::link_request("ISO-13"));
    assert_eq!(harness.runtime.store.session("U3").unwrap().pending_incident_keys, vec!["ISO-13".to_string()]);
}

#[tokio::test]
async fn shared_link_is_ignored_for_linked_sessions_and_other_urls() {
    let harness = Harness::new(idle_tracker());
    harness.runtime.store.link_issue("U2", "ISO-1");

    let mut link = SharedLink {
        channel_id: "C1".to_string(),
        message_ts: String::new(),
        user_id: "U2".to_string(),
        urls: vec!["https://jira.example.com/browse/ISO-12".to_string()],
    };

    handle_link_shared_internal(link.clone(), &harness.runtime).await.unwrap();

    link.urls = vec!["https://example.com/docs".to_string()];
    handle_link_shared_internal(link, &harness.runtime).await.unwrap();

    assert!(harness.texts().is_empty());
}

#[tokio::test]
async fn confirm_button_links_and_resumes_the_thread() {
    let harness = Harness::new(idle_tracker());
    harness.runtime.store.add_pending(USER, "ISO-12");
    harness.conversation(Conversation::collecting());

    let action = BlockAction {
        user_id: USER.to_string(),
        action_id: LINK_INCIDENT_CONFIRM.to_string(),
        value: "ISO-12".to_string(),
        thread_ts: Some(ROOT.to_string()),
    };

    handle_block_action_internal(action, &harness.runtime).await.unwrap();

    let conversation = harness.current().await;
    assert_eq!(harness.texts(), vec![messages::issue_linked("ISO-12"), conversation.next_step_text()]);

    let session = harness.runtime.store.session(USER).unwrap();
    assert_eq!(session.state, SessionState::Active);
    assert_eq!(session.linked_issue_key.as_deref(), Some("ISO-12"));
    assert!(session.pending_incident_keys.is_empty());
}

#[tokio::test]
async fn picking_an_incident_without_conversation_starts_the_preface() {
    let harness = Harness::new(idle_tracker());

    let action = BlockAction {
        user_id: USER.to_string(),
        action_id: PICK_PENDING_INCIDENT.to_string(),
        value: "ISO-9".to_string(),
        thread_ts: Some(ROOT.to_string()),
    };

    handle_block_action_internal(action, &harness.runtime).await.unwrap();

    assert_eq!(
        harness.texts(),
        vec![
            messages::issue_linked("ISO-9"),
            messages::PREFACE_TEXT.to_string(),
            messages::preface_step_text(1, Some("ISO-9")),
        ]
    );
}

#[tokio::test]
async fn empty_picker_selection_does_nothing() {
    let harness = Harness::new(idle_tracker());

    let action = BlockAction {
        user_id: USER.to_string(),
        action_id: PICK_PENDING_INCIDENT.to_string(),
        value: "NONE".to_string(),
        thread_ts: None,
    };

    handle_block_action_internal(action, &harness.runtime).await.unwrap();

    assert!(harness.texts().is_empty());
    assert!(harness.runtime.store.session(USER).is_none());
}

#[tokio::test]
async fn decline_button_keeps_the_session_waiting() {
    let harness = Harness::new(idle_tracker());
    harness.runtime.store.create_session(USER);

    let action = BlockAction {
        user_id: USER.to_string(),
        action_id: LINK_INCIDENT_DECLINE.to_string(),
        value: "ISO-12".to_string(),
        thread_ts: None,
    };

    handle_block_action_internal(action, &harness.runtime).await.unwrap();

    let posts = harness.posts.lock().unwrap().clone();
    assert_eq!(posts[0].text, messages::issue_not_linked());
    assert_eq!(posts[0].thread, "");
    assert_eq!(harness.runtime.store.session(USER).unwrap().state, SessionState::WaitingForIncident);
}

#[tokio::test]
async fn app_home_falls_back_when_the_guide_is_missing() {
    let harness = Harness::new(idle_tracker());

    handle_app_home_opened_internal(USER.to_string(), &harness.runtime).await.unwrap();

    let homes = harness.homes.lock().unwrap().clone();
    assert_eq!(homes.len(), 1);
    assert_eq!(homes[0]["type"], "home");
    assert_eq!(homes[0]["blocks"][0]["text"]["text"], messages::APP_HOME_TITLE);
    assert!(homes[0].to_string().contains("Usage guide unavailable"));
}
