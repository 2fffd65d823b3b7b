//! Button clicks and picker selections in the reporter's DM.

use tracing::{Instrument, debug, error, info, instrument, warn};

use crate::{
    base::{messages, types::Void},
    interaction::{
        dm_message::PICK_PENDING_INCIDENT,
        event::BlockAction,
        intake,
        link_shared::{LINK_INCIDENT_CONFIRM, LINK_INCIDENT_DECLINE},
    },
    runtime::Runtime,
};

/// Picker placeholder value meaning "nothing selected".
const NO_SELECTION: &str = "NONE";

/// How many history messages are scanned for the most recent thread.
const THREAD_SCAN_LIMIT: u16 = 50;

#[instrument(skip_all)]
pub fn handle_block_action(action: BlockAction, runtime: Runtime) {
    tokio::spawn(
        async move {
            let result = handle_block_action_internal(action, &runtime).await;

            if let Err(err) = &result {
                error!("Error while handling block action: {}", err);
            }
        }
        .in_current_span(),
    );
}

#[instrument(skip_all, fields(action_id = %action.action_id))]
pub async fn handle_block_action_internal(action: BlockAction, runtime: &Runtime) -> Void {
    match action.action_id.as_str() {
        LINK_INCIDENT_CONFIRM | PICK_PENDING_INCIDENT => link_and_resume(action, runtime).await,
        LINK_INCIDENT_DECLINE => decline(action, runtime).await,
        other => {
            warn!("Ignoring unknown block action `{}`", other);
            Ok(())
        }
    }
}

/// Link the chosen issue, acknowledge it, and pick the conversation back up.
async fn link_and_resume(action: BlockAction, runtime: &Runtime) -> Void {
    let issue_key = action.value.trim();
    if issue_key.is_empty() || issue_key == NO_SELECTION {
        debug!("No issue selected");
        return Ok(());
    }

    runtime.store.link_issue(&action.user_id, issue_key);
    info!("Linked {} for {}", issue_key, action.user_id);

    let dm_channel = runtime.chat.open_dm(&action.user_id).await?;
    runtime.store.set_dm_channel(&action.user_id, &dm_channel);

    let thread_ts = match action.thread_ts {
        Some(thread_ts) => Some(thread_ts),
        None => most_recent_thread(runtime, &dm_channel).await,
    };

    let Some(root_ts) = thread_ts else {
        return runtime.chat.send_message(&dm_channel, "", &messages::issue_linked(issue_key)).await;
    };

    runtime.chat.send_message(&dm_channel, &root_ts, &messages::issue_linked(issue_key)).await?;

    intake::resume_latest_prompt(runtime, &dm_channel, &root_ts).await
}

async fn decline(action: BlockAction, runtime: &Runtime) -> Void {
    runtime.store.set_waiting(&action.user_id);

    let dm_channel = runtime.chat.open_dm(&action.user_id).await?;
    let thread_ts = action.thread_ts.unwrap_or_default();

    runtime.chat.send_message(&dm_channel, &thread_ts, messages::issue_not_linked()).await
}

/// The most recently active thread of the DM channel, whoever started it.
async fn most_recent_thread(runtime: &Runtime, dm_channel: &str) -> Option<String> {
    match runtime.chat.recent_threads(dm_channel, THREAD_SCAN_LIMIT).await {
        Ok(threads) => threads.into_iter().max_by(|a, b| a.last_activity().total_cmp(&b.last_activity())).map(|t| t.ts),
        Err(err) => {
            debug!("Could not read DM history: {}", err);
            None
        }
    }
}
