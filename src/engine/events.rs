// src/engine/events.rs

//! Outbound event stream.
//!
//! Every run transition and every task status change is reported, in the
//! order it was applied, to an [`EventSink`]. Persisting the stream (e.g. a
//! checkpoint writer) is the sink's business.

use std::io::Write;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::info;

use crate::errors::{Result, TaskwardenError};
use crate::task::{ProcessTransition, TaskStateEvent};

/// One entry of the outbound event stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SupervisorEvent {
    Process(ProcessTransition),
    Task(TaskStateEvent),
}

/// Consumer of the event stream.
pub trait EventSink: Send {
    fn record(&mut self, event: &SupervisorEvent) -> Result<()>;
}

/// Writes each event as a structured `tracing` record.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn record(&mut self, event: &SupervisorEvent) -> Result<()> {
        match event {
            SupervisorEvent::Process(t) => info!(
                process = %t.process_name,
                attempt = t.attempt_index,
                from = %t.old_state,
                to = %t.new_state,
                "process transition"
            ),
            SupervisorEvent::Task(s) => match &s.reason {
                Some(reason) => info!(state = %s.state, %reason, "task state"),
                None => info!(state = %s.state, "task state"),
            },
        }
        Ok(())
    }
}

/// Keeps every event in memory behind a shared handle.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    events: Arc<Mutex<Vec<SupervisorEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<SupervisorEvent> {
        match self.events.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, event: &SupervisorEvent) -> Result<()> {
        let mut guard = self
            .events
            .lock()
            .map_err(|_| TaskwardenError::Other(anyhow::anyhow!("event log lock poisoned")))?;
        guard.push(event.clone());
        Ok(())
    }
}

/// Appends one JSON document per event.
#[derive(Debug)]
pub struct JsonLinesSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn record(&mut self, event: &SupervisorEvent) -> Result<()> {
        let line = serde_json::to_string(event).map_err(anyhow::Error::from)?;
        writeln!(self.writer, "{line}")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Forwards every event to each inner sink in turn; the first error wins
/// but every sink still sees the event.
#[derive(Default)]
pub struct FanOutSink {
    sinks: Vec<Box<dyn EventSink>>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl EventSink + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }
}

impl EventSink for FanOutSink {
    fn record(&mut self, event: &SupervisorEvent) -> Result<()> {
        let mut first_err = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.record(event) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
