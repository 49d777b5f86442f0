//! Plan publication: hand finished plans to presentation layers

use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::info;

use crate::domain::Plan;
use crate::error::{Result, SamError};

/// Consumer of finished plans. Errors are logged by the engine, never fatal.
#[async_trait]
pub trait PlanPublisher: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn publish(&self, plan: Arc<Plan>) -> Result<()>;
}

/// Logs a one-line summary per plan
#[derive(Debug, Default)]
pub struct TracingPublisher;

#[async_trait]
impl PlanPublisher for TracingPublisher {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn publish(&self, plan: Arc<Plan>) -> Result<()> {
        let top = plan.entries.first().map(|e| e.suggestion.title.as_str());
        info!(
            version = plan.snapshot_version,
            entries = plan.len(),
            ready = plan.feasible().count(),
            top = top.unwrap_or("-"),
            "plan published"
        );
        Ok(())
    }
}

/// Forwards plans into an mpsc channel
pub struct ChannelPublisher {
    tx: mpsc::Sender<Arc<Plan>>,
}

impl ChannelPublisher {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Arc<Plan>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl PlanPublisher for ChannelPublisher {
    fn name(&self) -> &str {
        "channel"
    }

    async fn publish(&self, plan: Arc<Plan>) -> Result<()> {
        self.tx
            .send(plan)
            .await
            .map_err(|_| SamError::Internal("plan channel closed".into()))
    }
}

/// Writes each plan as one JSON line
pub struct JsonLinesPublisher {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesPublisher {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }
}

#[async_trait]
impl PlanPublisher for JsonLinesPublisher {
    fn name(&self) -> &str {
        "json_lines"
    }

    async fn publish(&self, plan: Arc<Plan>) -> Result<()> {
        let line = serde_json::to_string(plan.as_ref())?;
        let mut writer = self.writer.lock().await;
        writeln!(writer, "{line}")?;
        writer.flush()?;
        Ok(())
    }
}
