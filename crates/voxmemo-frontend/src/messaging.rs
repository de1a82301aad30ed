//! Reliable request delivery to the backend.
//!
//! A [`Channel`] performs a single attempt. [`SafeMessenger`] retries
//! transient failures with linear backoff and gives up at once when the
//! channel is permanently gone.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;
use voxmemo_bridge::{
    BridgeRequest, ChannelError, ChannelErrorKind, ErrorKind, Failure, Request, Response,
    config::MessagingConfig,
};

/// One attempt at delivering a request and receiving its reply.
#[async_trait]
pub trait Channel: Send + Sync {
    async fn call(&self, request: Request) -> Result<Response, ChannelError>;
}

/// [`Channel`] over the in-process bridge.
#[derive(Clone)]
pub struct BridgeChannel {
    to_backend: Sender<BridgeRequest>,
}

impl BridgeChannel {
    pub fn new(to_backend: Sender<BridgeRequest>) -> Self {
        Self { to_backend }
    }
}

#[async_trait]
impl Channel for BridgeChannel {
    async fn call(&self, request: Request) -> Result<Response, ChannelError> {
        let (message, reply) = BridgeRequest::new(request);
        self.to_backend.send(message).await.map_err(|_| {
            ChannelError::new(
                ChannelErrorKind::ReceivingEndMissing,
                "Receiving end does not exist",
            )
        })?;

        // Fire-and-forget requests are done once delivered.
        let Some(reply) = reply else {
            return Ok(Response::ok());
        };
        reply.await.map_err(|_| {
            ChannelError::new(
                ChannelErrorKind::ConnectionNotEstablished,
                "Could not establish connection: the backend dropped the request",
            )
        })
    }
}

/// Sends requests through a [`Channel`] with bounded retries.
pub struct SafeMessenger<C> {
    channel: C,
    max_attempts: u32,
    retry_delay: Duration,
}

impl<C: Channel> SafeMessenger<C> {
    pub fn new(channel: C, config: &MessagingConfig) -> Self {
        Self::with_policy(
            channel,
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    pub fn with_policy(channel: C, max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            channel,
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Sends a request and returns its successful response.
    ///
    /// Transport failures are retried up to `max_attempts` times, waiting
    /// `retry_delay * attempt` after each failure. A permanently invalid
    /// channel, which can happen on any attempt, ends the sequence with
    /// [`ErrorKind::ChannelInvalid`]. A failure envelope from the backend is
    /// returned as is.
    pub async fn send(&self, request: Request) -> Result<Response, Failure> {
        let kind = request.kind();
        let mut last_error = None;

        for attempt in 1..=self.max_attempts {
            match self.channel.call(request.clone()).await {
                Ok(response) => return response.into_result(),
                Err(err) if err.kind.is_permanent() => {
                    log::error!("{kind} cannot be delivered, the channel is gone: {err}");
                    return Err(Failure::new(ErrorKind::ChannelInvalid, err.message));
                }
                Err(err) => {
                    log::warn!(
                        "Attempt {attempt}/{} to send {kind} failed: {err}",
                        self.max_attempts
                    );
                    last_error = Some(err);
                    if attempt < self.max_attempts {
                        tokio::time::sleep(self.retry_delay * attempt).await;
                    }
                }
            }
        }

        let reason = last_error.map(|err| err.message).unwrap_or_default();
        Err(Failure::new(
            ErrorKind::Transport,
            format!(
                "{kind} failed after {} attempts: {reason}",
                self.max_attempts
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replays scripted outcomes and counts attempts.
    struct ScriptedChannel {
        outcomes: Mutex<VecDeque<Result<Response, ChannelError>>>,
        attempts: Mutex<u32>,
    }

    impl ScriptedChannel {
        fn new(outcomes: Vec<Result<Response, ChannelError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                attempts: Mutex::new(0),
            }
        }

        fn attempts(&self) -> u32 {
            *self.attempts.lock().unwrap()
        }
    }

    #[async_trait]
    impl Channel for ScriptedChannel {
        async fn call(&self, _request: Request) -> Result<Response, ChannelError> {
            *self.attempts.lock().unwrap() += 1;
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Response::ok()))
        }
    }

    fn transient() -> Result<Response, ChannelError> {
        Err(ChannelError::from_message("message port closed"))
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_the_third_attempt_after_backing_off() {
        let delay = Duration::from_millis(100);
        let messenger = SafeMessenger::with_policy(
            ScriptedChannel::new(vec![transient(), transient(), Ok(Response::with_text("hi"))]),
            3,
            delay,
        );

        let started = Instant::now();
        let response = messenger.send(Request::GetAllMemos).await.unwrap();
        assert_eq!(response.text.as_deref(), Some("hi"));
        assert_eq!(messenger.channel.attempts(), 3);
        assert!(started.elapsed() >= delay + delay * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_receiver_is_not_retried() {
        let messenger = SafeMessenger::with_policy(
            ScriptedChannel::new(vec![Err(ChannelError::from_message(
                "Could not establish connection. Receiving end does not exist.",
            ))]),
            3,
            Duration::from_millis(100),
        );

        let failure = messenger.send(Request::GetAllMemos).await.unwrap_err();
        assert_eq!(failure.kind, ErrorKind::ChannelInvalid);
        assert_eq!(messenger.channel.attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalidation_mid_sequence_stops_retrying() {
        let messenger = SafeMessenger::with_policy(
            ScriptedChannel::new(vec![
                transient(),
                Err(ChannelError::from_message("Extension context invalidated.")),
            ]),
            5,
            Duration::from_millis(10),
        );

        let failure = messenger.send(Request::GetRecordingState).await.unwrap_err();
        assert_eq!(failure.kind, ErrorKind::ChannelInvalid);
        assert_eq!(messenger.channel.attempts(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_are_a_transport_failure() {
        let messenger = SafeMessenger::with_policy(
            ScriptedChannel::new(vec![transient(), transient(), transient()]),
            3,
            Duration::from_millis(10),
        );
        let failure = messenger.send(Request::GetAllMemos).await.unwrap_err();
        assert_eq!(failure.kind, ErrorKind::Transport);
        assert_eq!(messenger.channel.attempts(), 3);
    }

    #[tokio::test]
    async fn failure_envelopes_are_not_retried() {
        let messenger = SafeMessenger::with_policy(
            ScriptedChannel::new(vec![Ok(Response::failure(ErrorKind::Storage, "disk full"))]),
            3,
            Duration::from_millis(10),
        );
        let failure = messenger.send(Request::ClearAllMemos).await.unwrap_err();
        assert_eq!(failure, Failure::new(ErrorKind::Storage, "disk full"));
        assert_eq!(messenger.channel.attempts(), 1);
    }

    #[tokio::test]
    async fn closed_bridge_means_receiving_end_missing() {
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        drop(rx);
        let err = BridgeChannel::new(tx)
            .call(Request::GetAllMemos)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ChannelErrorKind::ReceivingEndMissing);
    }

    #[tokio::test]
    async fn fire_and_forget_completes_on_delivery() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        let response = BridgeChannel::new(tx)
            .call(Request::SetRecordingState { is_recording: true })
            .await
            .unwrap();
        assert!(response.success);
        assert!(rx.recv().await.unwrap().reply.is_none());
    }
}
