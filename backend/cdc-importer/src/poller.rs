//! Poll loop: subscription → normalizer → sink
//!
//! One loop owns the subscription and handles every event to completion
//! before polling again, so per-partition order is preserved end to end.
//! The subscription is closed exactly once on every exit path: normal
//! stop, broker error, halting decode/sink failure, or the poller being
//! dropped mid-run.

use std::str::FromStr;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::cdc::{normalize, Position, RawEvent};
use crate::error::{ConfigError, PollerError, Result, SubscriptionError};
use crate::kafka::{PollOutcome, StreamSubscription};
use crate::metrics::PollerMetrics;
use crate::sink::SinkClient;

/// What to do when an event cannot be normalized or delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Stop the consumer; the failing offset is not committed
    Halt,
    /// Log the position, commit past it and keep going
    Skip,
}

impl FromStr for ErrorPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "halt" => Ok(ErrorPolicy::Halt),
            "skip" => Ok(ErrorPolicy::Skip),
            other => Err(ConfigError::Invalid(format!(
                "Unknown error policy '{}' (expected halt or skip)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Upper bound for a single poll
    pub poll_timeout: Duration,
    pub on_decode_error: ErrorPolicy,
    pub on_sink_error: ErrorPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(5),
            on_decode_error: ErrorPolicy::Halt,
            on_sink_error: ErrorPolicy::Halt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Idle,
    Subscribed,
    Polling,
    ShuttingDown,
    /// Terminal
    Closed,
}

pub struct Poller<S: StreamSubscription, K: SinkClient> {
    subscription: S,
    sink: K,
    config: PollerConfig,
    shutdown_rx: watch::Receiver<bool>,
    state: PollerState,
    running: bool,
    iterations: u64,
    metrics: PollerMetrics,
}

impl<S: StreamSubscription, K: SinkClient> Poller<S, K> {
    /// `shutdown_rx` stops the loop once it reads `true` or its sender is gone
    pub fn new(
        subscription: S,
        sink: K,
        config: PollerConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            subscription,
            sink,
            config,
            shutdown_rx,
            state: PollerState::Idle,
            running: false,
            iterations: 0,
            metrics: PollerMetrics::new(),
        }
    }

    pub fn with_metrics(mut self, metrics: PollerMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    /// The run flag
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn metrics(&self) -> &PollerMetrics {
        &self.metrics
    }

    pub fn subscription(&self) -> &S {
        &self.subscription
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Subscribe and poll until stopped or a fatal error occurs, then shut down.
    ///
    /// Can only be run once; the subscription is closed when this returns.
    pub async fn run(&mut self) -> Result<()> {
        if self.state != PollerState::Idle {
            return Err(PollerError::Subscribe(SubscriptionError::Closed));
        }

        let result = self.poll_loop().await;
        if let Err(e) = &result {
            error!("Poller terminated with error: {}", e);
        }

        self.shutdown();
        result
    }

    async fn poll_loop(&mut self) -> Result<()> {
        self.subscription.subscribe()?;
        self.state = PollerState::Subscribed;
        self.running = true;
        info!(topics = ?self.subscription.topics(), "Poller subscribed");

        self.state = PollerState::Polling;
        while self.running {
            if self.stop_requested() {
                info!("Stop requested, leaving poll loop");
                break;
            }

            self.iterations += 1;
            self.metrics.polls_total.inc();
            debug!("Polling ({})...", self.iterations);

            match self.subscription.poll(self.config.poll_timeout).await {
                PollOutcome::NoEvent => continue,
                PollOutcome::EndOfPartition(end) => {
                    self.metrics.partition_eof_total.inc();
                    info!(partition = end.partition, "Reached end of partition");
                }
                PollOutcome::BrokerError(err) => {
                    error!(code = %err.code, "Broker error: {}", err.message);
                    return Err(PollerError::Broker {
                        code: err.code,
                        message: err.message,
                    });
                }
                PollOutcome::Data(event) => self.handle_event(event).await?,
            }
        }

        Ok(())
    }

    fn stop_requested(&self) -> bool {
        *self.shutdown_rx.borrow() || self.shutdown_rx.has_changed().is_err()
    }

    async fn handle_event(&mut self, event: RawEvent) -> Result<()> {
        let position = event.position.clone();
        debug!(
            topic = %position.topic,
            partition = position.partition,
            offset = position.offset,
            tombstone = event.is_tombstone(),
            "Received event"
        );

        let command = match normalize(&event) {
            Ok(command) => command,
            Err(source) => {
                self.metrics.decode_errors_total.inc();
                error!(%position, "Failed to normalize event: {}", source);
                match self.config.on_decode_error {
                    ErrorPolicy::Halt => return Err(PollerError::Decode { position, source }),
                    ErrorPolicy::Skip => {
                        warn!(%position, "Skipping undecodable event");
                        self.ack(&position);
                        return Ok(());
                    }
                }
            }
        };

        if command.is_suppressed() {
            self.metrics.tombstones_suppressed_total.inc();
            info!(%position, "No request sent: tombstone message");
            self.ack(&position);
            return Ok(());
        }

        self.metrics.commands_sent_total.inc();
        match self.sink.send(&command).await {
            Ok(response) if response.is_success() => {
                debug!(
                    %position,
                    operation = command.operation.as_str(),
                    status = response.status,
                    "Command delivered"
                );
            }
            Ok(response) => {
                warn!(
                    %position,
                    operation = command.operation.as_str(),
                    status = response.status,
                    body = %response.body,
                    "Importer API rejected command"
                );
            }
            Err(source) => {
                self.metrics.sink_errors_total.inc();
                error!(%position, "Failed to send command: {}", source);
                match self.config.on_sink_error {
                    ErrorPolicy::Halt => return Err(PollerError::Sink { position, source }),
                    ErrorPolicy::Skip => warn!(%position, "Skipping undeliverable command"),
                }
            }
        }

        self.ack(&position);
        Ok(())
    }

    /// Offset storage failures are not fatal; the event is re-delivered after a restart
    fn ack(&mut self, position: &Position) {
        if let Err(e) = self.subscription.ack(position) {
            warn!(%position, "Failed to store offset: {}", e);
        }
    }

    fn shutdown(&mut self) {
        if self.state == PollerState::Closed {
            return;
        }

        self.state = PollerState::ShuttingDown;
        info!("Closing subscription, clearing run flag");

        if let Err(e) = self.subscription.close() {
            error!("Failed to close subscription cleanly: {}", e);
        }

        self.running = false;
        self.state = PollerState::Closed;
        self.metrics.log_summary();
    }
}

impl<S: StreamSubscription, K: SinkClient> Drop for Poller<S, K> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
