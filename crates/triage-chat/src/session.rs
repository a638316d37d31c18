//! Chat session orchestrator.
//!
//! Owns the conversation log and runs one exchange at a time:
//! `Idle → Sending → Streaming → Finalized | Failed`. Observers follow the
//! log and the status through `watch` channels; every log update is a new
//! copy-on-write snapshot, so a receiver holding an older one is unaffected.
//! Failures never escape `submit`: the log is rolled back to its pre-submit
//! contents and the status carries the reason.

use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use triage_core::config::DEFAULT_MAX_PENDING_BYTES;
use triage_core::{Conversation, Message};
use triage_stream::{decode_stream, Accumulator, Decoded};

use crate::status::{ExchangeOutcome, ExchangeStatus, FailureReason, ResponseClass};
use crate::transport::ChatTransport;

pub struct ChatSession {
    transport: Box<dyn ChatTransport>,
    log: watch::Sender<Conversation>,
    status: watch::Sender<ExchangeStatus>,
    /// Token of the in-flight exchange, if any.
    cancel: Mutex<Option<CancellationToken>>,
    max_pending_bytes: usize,
}

impl ChatSession {
    pub fn new(transport: Box<dyn ChatTransport>) -> Self {
        Self::with_history(transport, Conversation::new())
    }

    /// Start from prior messages supplied by the caller.
    pub fn with_history(transport: Box<dyn ChatTransport>, history: Conversation) -> Self {
        Self {
            transport,
            log: watch::Sender::new(history),
            status: watch::Sender::new(ExchangeStatus::Idle),
            cancel: Mutex::new(None),
            max_pending_bytes: DEFAULT_MAX_PENDING_BYTES,
        }
    }

    pub fn with_max_pending_bytes(mut self, max_pending_bytes: usize) -> Self {
        self.max_pending_bytes = max_pending_bytes;
        self
    }

    /// Receiver of log snapshots; the current one is marked seen.
    pub fn observe_log(&self) -> watch::Receiver<Conversation> {
        self.log.subscribe()
    }

    /// Log snapshots as a `Stream`, starting with the current one.
    pub fn log_updates(&self) -> WatchStream<Conversation> {
        WatchStream::new(self.log.subscribe())
    }

    pub fn observe_status(&self) -> watch::Receiver<ExchangeStatus> {
        self.status.subscribe()
    }

    pub fn snapshot(&self) -> Conversation {
        self.log.borrow().clone()
    }

    pub fn status(&self) -> ExchangeStatus {
        *self.status.borrow()
    }

    /// True while an exchange is running and no reply text has arrived yet.
    pub fn awaiting_reply(&self) -> bool {
        self.status().is_in_flight() && !self.log.borrow().ends_with_assistant()
    }

    /// Abort the in-flight exchange, if any. It fails with `Cancelled`.
    pub fn cancel(&self) {
        if let Some(token) = self.cancel_slot().as_ref() {
            info!("cancelling in-flight exchange");
            token.cancel();
        }
    }

    /// Send `text` as a new user message and stream the reply into the log.
    ///
    /// Rejected without side effects when `text` is blank or another
    /// exchange is in flight.
    pub async fn submit(&self, text: &str) -> ExchangeOutcome {
        let text = text.trim();
        if text.is_empty() {
            debug!("ignoring blank submission");
            return ExchangeOutcome::Rejected;
        }

        let cancel = CancellationToken::new();
        let mut checkpoint = 0;
        // the user message is in the log before anyone can observe `Sending`
        let accepted = self.status.send_if_modified(|status| {
            if status.is_in_flight() {
                return false;
            }
            *self.cancel_slot() = Some(cancel.clone());
            self.log.send_modify(|log| {
                checkpoint = log.len();
                log.push(Message::user(text));
            });
            *status = ExchangeStatus::Sending;
            true
        });
        if !accepted {
            debug!("exchange already in flight, submission rejected");
            return ExchangeOutcome::Rejected;
        }

        let span = info_span!("exchange", exchange_id = %Uuid::now_v7());
        self.run(checkpoint, cancel).instrument(span).await
    }

    async fn run(&self, checkpoint: usize, cancel: CancellationToken) -> ExchangeOutcome {
        let request = self.snapshot();
        info!(
            messages = request.len(),
            transport = %self.transport.name(),
            "submitting chat exchange"
        );

        let result = self.exchange(&request, &cancel).await;
        self.cancel_slot().take();

        match result {
            Ok(incomplete) => {
                info!(incomplete, "exchange finalized");
                self.status.send_replace(ExchangeStatus::Finalized);
                ExchangeOutcome::Finalized { incomplete }
            }
            Err(reason) => {
                warn!(%reason, "exchange failed, rolling back");
                self.log.send_modify(|log| log.truncate(checkpoint));
                self.status.send_replace(ExchangeStatus::Failed(reason));
                ExchangeOutcome::Failed(reason)
            }
        }
    }

    /// Send the request and drive the decode loop. `Ok(true)` means the
    /// stream closed with undecodable data left behind.
    async fn exchange(
        &self,
        request: &Conversation,
        cancel: &CancellationToken,
    ) -> Result<bool, FailureReason> {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FailureReason::Cancelled),
            resp = self.transport.send(request.messages()) => resp.map_err(|e| {
                warn!(error = %e, "chat request could not be sent");
                FailureReason::ConnectionFailed
            })?,
        };

        if let Some(reason) = ResponseClass::from_status(response.status).failure() {
            warn!(status = response.status, %reason, "endpoint refused exchange");
            return Err(reason);
        }
        let Some(body) = response.body else {
            warn!(status = response.status, "endpoint response has no body");
            return Err(FailureReason::ConnectionFailed);
        };

        self.status.send_replace(ExchangeStatus::Streaming);
        debug!(status = response.status, "streaming reply");

        let mut events = Box::pin(decode_stream(body, self.max_pending_bytes));
        let mut accumulator = Accumulator::new();
        let mut incomplete = false;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FailureReason::Cancelled),
                next = events.next() => next,
            };

            match next {
                Some(Ok(Decoded::Delta(text))) => {
                    debug!(len = text.len(), "text delta");
                    self.log.send_modify(|log| {
                        accumulator.apply(log, &text);
                    });
                }
                Some(Ok(Decoded::Done)) | None => break,
                Some(Ok(Decoded::Truncated { discarded_bytes })) => {
                    warn!(discarded_bytes, "reply stream ended mid-payload");
                    incomplete = true;
                }
                Some(Err(e)) => {
                    warn!(error = %e, "reply stream failed");
                    return Err(FailureReason::TransportError);
                }
            }
        }

        debug!(
            deltas = accumulator.applied(),
            chars = accumulator.content().len(),
            "reply stream closed"
        );
        Ok(incomplete)
    }

    fn cancel_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.cancel.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
