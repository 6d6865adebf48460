//! `job wait` command.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::cli::args::JobWaitArgs;
use crate::cli::output::render_json;
use crate::core::clock::{Clock, SystemClock};
use crate::core::http::build_client;
use crate::core::job_poller::JobPoller;
use crate::core::translate::HttpAssetFetcher;
use crate::error::Result;
use crate::providers::ali::{DashScopeTaskClient, ImageTaskHandler};
use crate::storage::config::Config;

/// Poll a submitted image task and print the canonical image response.
pub async fn wait(args: &JobWaitArgs, config: &Config, pretty: bool) -> Result<()> {
    let client = build_client(config.timeout())?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let handler = ImageTaskHandler::new(
        DashScopeTaskClient::new(client.clone(), args.base_url.as_str(), args.key.as_str()),
        JobPoller::new(clock.clone(), config.poll_policy()),
        Arc::new(HttpAssetFetcher::new(client)),
        clock,
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    tracing::debug!(task_id = %args.task_id, format = ?args.format, "Waiting for task");
    let response = handler
        .wait_and_translate(&args.task_id, args.format.into(), &cancel)
        .await?;
    println!("{}", render_json(&response, pretty)?);
    Ok(())
}
