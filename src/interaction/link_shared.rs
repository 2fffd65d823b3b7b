//! Offer an intake when a reporter shares an incident issue link.

use regex::Regex;
use tracing::{Instrument, debug, error, info, instrument};

use crate::{
    base::{messages, types::Void},
    interaction::event::SharedLink,
    render::blocks,
    runtime::Runtime,
    service::state::SessionState,
};

/// Action ID of the button that links a shared issue and starts the intake.
pub const LINK_INCIDENT_CONFIRM: &str = "link_incident_confirm";
/// Action ID of the button that declines linking a shared issue.
pub const LINK_INCIDENT_DECLINE: &str = "link_incident_decline";

/// How many history messages are scanned for the most recent user thread.
const THREAD_SCAN_LIMIT: u16 = 100;

#[instrument(skip_all)]
pub fn handle_link_shared(link: SharedLink, runtime: Runtime) {
    tokio::spawn(
        async move {
            let result = handle_link_shared_internal(link, &runtime).await;

            if let Err(err) = &result {
                error!("Error while handling shared link: {}", err);
            }
        }
        .in_current_span(),
    );
}

#[instrument(skip_all, fields(channel = %link.channel_id))]
pub async fn handle_link_shared_internal(link: SharedLink, runtime: &Runtime) -> Void {
    let pattern = Regex::new(&runtime.config.linked_issue_pattern)?;

    let Some(issue_key) = find_issue_key(&pattern, &link.urls) else {
        debug!("No incident issue among {} shared links", link.urls.len());
        return Ok(());
    };

    let user_id = resolve_reporter(runtime, &link).await;
    if user_id.is_empty() {
        info!("Issue {} shared, but no reporter could be determined", issue_key);
        return Ok(());
    }

    info!("Issue {} shared by {}", issue_key, user_id);

    match runtime.store.session(&user_id) {
        None => {
            // No session is left behind when the DM cannot be opened.
            let dm_channel = runtime.chat.open_dm(&user_id).await?;

            runtime.store.create_session(&user_id);
            runtime.store.set_dm_channel(&user_id, &dm_channel);
            runtime.store.add_pending(&user_id, &issue_key);

            let text = messages::incident_invitation(&issue_key);
            let prompt = blocks::confirm_buttons(
                &text,
                &issue_key,
                (LINK_INCIDENT_CONFIRM, "Yes, start the process"),
                (LINK_INCIDENT_DECLINE, "No thank you"),
            );

            runtime.chat.send_blocks(&dm_channel, "", &text, prompt).await
        }
        Some(session) if session.state == SessionState::WaitingForIncident => {
            let dm_channel = runtime.chat.open_dm(&user_id).await?;
            runtime.store.set_dm_channel(&user_id, &dm_channel);
            runtime.store.add_pending(&user_id, &issue_key);

            let root_ts = most_recent_user_thread(runtime, &dm_channel).await.unwrap_or_default();

            let text = messages::link_request(&issue_key);
            let prompt = blocks::confirm_buttons(&text, &issue_key, (LINK_INCIDENT_CONFIRM, "Yes, link"), (LINK_INCIDENT_DECLINE, "No"));

            runtime.chat.send_blocks(&dm_channel, &root_ts, &text, prompt).await
        }
        Some(_) => {
            debug!("Session of {} is already linked; ignoring {}", user_id, issue_key);
            Ok(())
        }
    }
}

/// The first issue key captured from the shared URLs.
pub fn find_issue_key(pattern: &Regex, urls: &[String]) -> Option<String> {
    urls.iter().find_map(|url| pattern.captures(url)?.get(1).map(|m| m.as_str().to_string()))
}

/// A `<@U…>` mention in a message text.
pub fn mentioned_user(text: &str) -> Option<String> {
    let mention = Regex::new(r"<@([UW][A-Z0-9]+)>").ok()?;
    mention.captures(text)?.get(1).map(|m| m.as_str().to_string())
}

/// The name in a "<Name> heeft onder issue …" notification.
pub fn reporter_name(text: &str) -> Option<String> {
    let prefix = Regex::new(r"(?i)^([^\n]+?)\s+heeft\s+onder\s+issue\s+").ok()?;
    prefix.captures(text)?.get(1).map(|m| m.as_str().trim().to_string())
}

/// Who reported the shared issue: a mention, a named reporter, or the sharing user.
async fn resolve_reporter(runtime: &Runtime, link: &SharedLink) -> String {
    if !link.channel_id.is_empty() && !link.message_ts.is_empty() {
        match runtime.chat.get_message_text(&link.channel_id, &link.message_ts).await {
            Ok(Some(text)) => {
                if let Some(user_id) = mentioned_user(&text) {
                    return user_id;
                }

                if let Some(name) = reporter_name(&text) {
                    match runtime.chat.find_user_by_name(&name).await {
                        Ok(Some(user_id)) => return user_id,
                        Ok(None) => debug!("No user named `{}`", name),
                        Err(err) => debug!("User lookup failed: {}", err),
                    }
                }
            }
            Ok(None) => debug!("Shared message not found"),
            Err(err) => debug!("Could not read shared message: {}", err),
        }
    }

    link.user_id.clone()
}

/// The root of the most recently active thread a user started in a DM channel.
pub async fn most_recent_user_thread(runtime: &Runtime, dm_channel: &str) -> Option<String> {
    let threads = match runtime.chat.recent_threads(dm_channel, THREAD_SCAN_LIMIT).await {
        Ok(threads) => threads,
        Err(err) => {
            debug!("Could not read DM history: {}", err);
            return None;
        }
    };

    threads
        .into_iter()
        .filter(|t| !t.is_bot && t.user.is_some() && t.is_root())
        .max_by(|a, b| a.last_activity().total_cmp(&b.last_activity()))
        .map(|t| t.ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_key_comes_from_first_matching_url() {
        let pattern = Regex::new(r"/browse/(ISO-\d+)").unwrap();
        let urls = vec![
            "https://example.com/docs".to_string(),
            "https://jira.example.com/browse/ISO-42".to_string(),
            "https://jira.example.com/browse/ISO-43".to_string(),
        ];

        assert_eq!(find_issue_key(&pattern, &urls), Some("ISO-42".to_string()));
        assert_eq!(find_issue_key(&pattern, &urls[..1]), None);
    }

    #[test]
    fn mention_wins_as_reporter() {
        assert_eq!(mentioned_user("Reported by <@U0ABC123> under ISO-1"), Some("U0ABC123".to_string()));
        assert_eq!(mentioned_user("no mention"), None);
    }

    #[test]
    fn reporter_name_is_parsed_from_notification() {
        assert_eq!(reporter_name("Jamie Doe heeft onder issue ISO-5 een incident gemeld"), Some("Jamie Doe".to_string()));
        assert_eq!(reporter_name("ISO-5 was created"), None);
    }
}
