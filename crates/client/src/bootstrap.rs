//! Startup handshake with the keeper server
//!
//! The client asks the server for its download information before doing
//! anything else. Transient failures (dropped connections, 5xx, throttling,
//! attempt timeouts) are retried on the configured policy; anything else
//! ends the handshake immediately.

use keeper_common::as_millis_u64;
use keeper_common::error::ErrorClassification;
use keeper_common::resilience::repeater::{
    Context, DoneEvent, DoneReceiver, Repeater, RepeaterConfig, RepeaterError, RetryEvent,
    RetryReceiver,
};
use tracing::{error, info, warn};

use crate::error::{BootstrapError, ClientError};
use crate::http::{ClientInfo, ServerClient};

pub type HandshakeRepeater = Repeater<(), ClientInfo, ClientError>;

/// Stop on success and on errors that another attempt would not fix.
pub fn stop_unless_retryable(err: Option<&RepeaterError<ClientError>>) -> bool {
    err.map_or(true, |err| !err.is_retryable())
}

/// Repeater fetching [`ClientInfo`] from `client` under `policy`.
pub fn handshake_repeater(client: &ServerClient, policy: &RepeaterConfig) -> HandshakeRepeater {
    let client = client.clone();

    Repeater::new()
        .with_operation(move |ctx: Context, ()| {
            let client = client.clone();
            async move { client.client_info(&ctx).await }
        })
        .with_condition(stop_unless_retryable)
        .with_config(policy)
}

/// Run the handshake to completion, logging every retry and the outcome.
pub async fn run(
    ctx: &Context,
    client: &ServerClient,
    policy: &RepeaterConfig,
) -> Result<ClientInfo, BootstrapError> {
    let address = client.base_url().to_string();
    info!(
        %address,
        max_retries = policy.max_retries(),
        attempt_limit_ms = as_millis_u64(&policy.attempt_limit),
        total_limit_ms = as_millis_u64(&policy.total_limit),
        "starting handshake"
    );

    let (done, retries) = handshake_repeater(client, policy).run(ctx, ());
    let done = drain(done, retries).await.ok_or(BootstrapError::Aborted)?;

    let attempts = done.attempts;
    let elapsed_ms = as_millis_u64(&done.elapsed);

    match done.into_result() {
        Ok(info) => {
            info!(attempts, elapsed_ms, path = %info.path, os = ?info.os, "handshake complete");
            Ok(info)
        }
        Err(source) => {
            error!(attempts, elapsed_ms, kind = source.kind(), error = %source, "handshake failed");
            Err(BootstrapError::Handshake { address, source })
        }
    }
}

/// Consume both streams of a run; `None` when the run task vanished
/// without publishing a completion.
async fn drain(
    mut done: DoneReceiver<ClientInfo, ClientError>,
    mut retries: RetryReceiver<ClientError>,
) -> Option<DoneEvent<ClientInfo, ClientError>> {
    let mut retries_open = true;

    let outcome = loop {
        tokio::select! {
            biased;
            event = retries.recv(), if retries_open => match event {
                Some(event) => log_retry(&event),
                None => retries_open = false,
            },
            outcome = &mut done => break outcome.ok(),
        }
    };

    while let Ok(event) = retries.try_recv() {
        log_retry(&event);
    }

    outcome
}

fn log_retry(event: &RetryEvent<ClientError>) {
    let wait_ms = as_millis_u64(&event.wait);
    match &event.error {
        Some(err) => warn!(attempt = event.attempt, wait_ms, error = %err, "handshake retry"),
        None => warn!(attempt = event.attempt, wait_ms, "handshake retry after rejected result"),
    }
}
