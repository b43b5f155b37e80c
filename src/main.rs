mod decoder;
mod dispatch;
mod dto;
mod metadata;
mod mqtt_processor;
mod persist;
mod pipeline;
mod record;
#[cfg(test)]
mod testutil;
mod util;

use std::process::exit;
use std::sync::Arc;
use tracing::{error, info};
use util::{config::Settings, setup_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    setup_tracing();

    if let (Some(git_describe), Some(git_sha), Some(build_timestamp)) = (
        option_env!("VERGEN_GIT_DESCRIBE"),
        option_env!("VERGEN_GIT_SHA"),
        option_env!("VERGEN_BUILD_TIMESTAMP"),
    ) {
        info!(
            "Climatebridge {} ({} {})",
            git_describe, git_sha, build_timestamp
        );
    }

    let settings = match Settings::load() {
        Ok(settings) => Arc::new(settings),
        Err(err) => {
            error!("Invalid configuration: {:?}", err);
            exit(1)
        }
    };

    info!(
        "Dispatching to {} endpoint(s) for environment {:?}",
        settings.endpoints.len(),
        settings.environment
    );

    handle_result(mqtt_processor::start_server(settings).await);

    Ok(())
}

fn handle_result(res: anyhow::Result<()>) {
    if let Err(err) = res {
        error!("An error occurred: {:?}", err);
        exit(1)
    }
}
