use tracing::{Instrument, error, info, instrument, warn};

use crate::{
    base::{messages, types::Void},
    render::blocks::home_view,
    runtime::Runtime,
};

#[instrument(skip_all)]
pub fn handle_app_home_opened(user_id: String, runtime: Runtime) {
    tokio::spawn(
        async move {
            let result = handle_app_home_opened_internal(user_id, &runtime).await;

            if let Err(err) = &result {
                error!("Error while publishing App Home: {}", err);
            }
        }
        .in_current_span(),
    );
}

/// Publish the usage guide as the user's Home tab.
#[instrument(skip_all, fields(user = %user_id))]
pub async fn handle_app_home_opened_internal(user_id: String, runtime: &Runtime) -> Void {
    let usage = match tokio::fs::read_to_string(&runtime.config.usage_path).await {
        Ok(usage) => usage,
        Err(err) => {
            warn!("Could not read usage guide at {}: {}", runtime.config.usage_path.display(), err);
            messages::USAGE_UNAVAILABLE.to_string()
        }
    };

    info!("Publishing App Home ...");

    runtime.chat.publish_home(&user_id, home_view(messages::APP_HOME_TITLE, &usage)).await
}
