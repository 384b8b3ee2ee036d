//! Poll and write cycles
//!
//! The transport is an external collaborator reached through
//! [`RegisterTransport`]. The poller turns its failures into status codes:
//! a timed-out or garbled read never becomes an `Err`, it degrades the
//! shared model's status and leaves the last good values in place.
//!
//! # Design Principles
//! - **Decode off the lock**: blocks decode into a staging copy
//! - **Publish once**: one write-locked refresh per successful cycle
//! - **Errors are schema errors**: `Err` means the model definition is wrong

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::batch::WritePlanner;
use crate::block::{BlockAggregator, ReadRequest};
use crate::error::Result;
use crate::schema::DeviceKind;
use crate::shared::SharedModel;
use crate::status::StatusCode;

// ============================================================================
// Transport seam
// ============================================================================

/// Failures reported by a register transport
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    /// No reply within the request timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Link is down
    #[error("Not connected")]
    NotConnected,

    /// Send/receive failed
    #[error("Communication error: {0}")]
    Communication(String),

    /// Device answered with an exception code
    #[error("Device exception code {0}")]
    DeviceException(u8),

    /// Reply could not be parsed
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn communication(msg: impl Into<String>) -> Self {
        Self::Communication(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Status a model takes when a cycle fails with this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Timeout(_) => StatusCode::BadTimeout,
            Self::NotConnected => StatusCode::BadServerNotConnected,
            Self::Communication(_) => StatusCode::BadCommunicationError,
            Self::DeviceException(_) => StatusCode::BadDeviceFailure,
            Self::Malformed(_) => StatusCode::BadDecodingError,
        }
    }
}

/// Register-level access to one device
#[async_trait]
pub trait RegisterTransport: Send {
    /// Read `count` registers starting at `offset`
    async fn read_registers(
        &mut self,
        offset: u16,
        count: u16,
    ) -> std::result::Result<Vec<u16>, TransportError>;

    /// Write `words` starting at `offset`
    async fn write_registers(
        &mut self,
        offset: u16,
        words: &[u16],
    ) -> std::result::Result<(), TransportError>;
}

// ============================================================================
// Poller
// ============================================================================

/// Poll cycle timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Time between poll cycles
    pub poll_interval_ms: u64,
    /// Limit for one transport request
    pub request_timeout_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            request_timeout_ms: 500,
        }
    }
}

impl PollConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Drives reads and writes of one device through a transport
pub struct DevicePoller<K: DeviceKind, T: RegisterTransport> {
    model: SharedModel<K>,
    transport: T,
    config: PollConfig,
    plan: Vec<ReadRequest>,
}

impl<K: DeviceKind, T: RegisterTransport> DevicePoller<K, T> {
    pub fn new(model: SharedModel<K>, transport: T, config: PollConfig) -> Result<Self> {
        let plan = BlockAggregator::read_plan(K::schema()?);
        debug!(
            "Poller for {} reads {} block(s) per cycle",
            K::schema()?.name(),
            plan.len()
        );
        Ok(Self {
            model,
            transport,
            config,
            plan,
        })
    }

    /// Handle to the shared model this poller publishes into
    pub fn model(&self) -> &SharedModel<K> {
        &self.model
    }

    pub fn read_plan(&self) -> &[ReadRequest] {
        &self.plan
    }

    /// Read and decode every block, then publish the result
    ///
    /// Returns the status the shared model ends up with.
    pub async fn poll_once(&mut self) -> Result<StatusCode> {
        let schema = K::schema()?;
        let mut staged = self.model.staging();

        for request in self.plan.clone() {
            let read = timed(
                self.config.request_timeout(),
                self.transport.read_registers(request.offset, request.count),
            )
            .await;

            let words = match read {
                Ok(words) if words.len() == usize::from(request.count) => words,
                Ok(words) => {
                    let err = TransportError::malformed(format!(
                        "{} registers returned, {} requested",
                        words.len(),
                        request.count
                    ));
                    return Ok(self.degrade(request.block, &err));
                },
                Err(err) => return Ok(self.degrade(request.block, &err)),
            };

            BlockAggregator::decode(&mut staged, schema.block(request.block)?, &words)?;
        }

        staged.mark(StatusCode::Good);
        self.model.publish(&staged);
        debug!("Poll of {} complete", schema.name());
        Ok(StatusCode::Good)
    }

    fn degrade(&self, block: &str, err: &TransportError) -> StatusCode {
        let code = err.status_code();
        warn!(
            "{} poll degraded at block {}: {} ({})",
            K::schema().map(|s| s.name()).unwrap_or("device"),
            block,
            err,
            code
        );
        self.model.mark(code);
        code
    }

    /// Write the current values of `fields` to the device
    ///
    /// Stage values first with [`crate::DeviceModel::stage_write`]. A
    /// transport failure is returned as its status code; the model's status
    /// is not changed by a failed write.
    pub async fn write(&mut self, fields: &[K::Field]) -> Result<StatusCode> {
        let requests = self.model.read(|m| WritePlanner::plan(m, fields))?;

        for request in &requests {
            let result = timed(
                self.config.request_timeout(),
                self.transport.write_registers(request.offset, &request.words),
            )
            .await;
            if let Err(err) = result {
                warn!(
                    "Write of {:?} at {} failed: {}",
                    request.fields, request.offset, err
                );
                return Ok(err.status_code());
            }
            debug!(
                "Wrote {} register(s) at {} ({:?})",
                request.words.len(),
                request.offset,
                request.fields
            );
        }
        Ok(StatusCode::Good)
    }

    /// Poll on the configured interval until `shutdown` resolves
    pub async fn run(&mut self, shutdown: impl Future<Output = ()>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.poll_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!("Polling {} every {:?}", K::schema()?.name(), self.config.poll_interval());
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Poller for {} stopped", K::schema()?.name());
                    return Ok(());
                },
                _ = ticker.tick() => {
                    self.poll_once().await?;
                },
            }
        }
    }
}

/// Run a transport request under the request timeout
async fn timed<R>(
    limit: Duration,
    op: impl Future<Output = std::result::Result<R, TransportError>>,
) -> std::result::Result<R, TransportError> {
    match tokio::time::timeout(limit, op).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::timeout(format!(
            "no reply within {}ms",
            limit.as_millis()
        ))),
    }
}
