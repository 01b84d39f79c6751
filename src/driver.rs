//! The keyboard driver sink the runtime fires key events into.
//!
//! The interpreter core treats key injection as an external collaborator
//! behind the [`KeyDriver`] trait: synchronous calls whose errors mean
//! transport failure only. Transport failures are non-fatal to the runtime;
//! they are reported and the offending iteration becomes a no-op.

use anyhow::Result;
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

use crate::keys::{self, ScanCode};

/// A sink for synthetic key events.
pub trait KeyDriver {
    /// Inject a key-down event.
    fn down(&mut self, code: ScanCode) -> Result<()>;

    /// Inject a key-up event.
    fn up(&mut self, code: ScanCode) -> Result<()>;

    /// Bring the window with the given title to the foreground. Best-effort.
    fn focus(&mut self, title: &str) -> Result<()>;
}

/// Returned by [`default_driver`] when no key-injection backend can be
/// opened; the CLI maps it to its own exit code.
#[derive(Debug)]
pub struct DriverUnavailable(pub String);

impl fmt::Display for DriverUnavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "keyboard driver unavailable: {}", self.0)
    }
}

impl std::error::Error for DriverUnavailable {}

/// Opens the default driver for this process.
///
/// The built-in default is [`TraceDriver`]; an OS-level injector would be
/// detected here and reported through [`DriverUnavailable`] when missing.
pub fn default_driver() -> Result<Box<dyn KeyDriver>> {
    Ok(Box::new(TraceDriver))
}

/// A driver that logs every event instead of injecting it. Useful for dry
/// runs and as the fallback sink when no injector is present.
#[derive(Debug, Default)]
pub struct TraceDriver;

impl KeyDriver for TraceDriver {
    fn down(&mut self, code: ScanCode) -> Result<()> {
        tracing::info!(code = code.as_u16(), key = keys::name_of(code), "key down");
        Ok(())
    }

    fn up(&mut self, code: ScanCode) -> Result<()> {
        tracing::info!(code = code.as_u16(), key = keys::name_of(code), "key up");
        Ok(())
    }

    fn focus(&mut self, title: &str) -> Result<()> {
        tracing::info!(title, "focus window");
        Ok(())
    }
}

/// One event captured by a [`RecordingDriver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    Down(ScanCode),
    Up(ScanCode),
    Focus(String),
}

/// A captured event together with the instant it was delivered.
#[derive(Debug, Clone)]
pub struct TimedEvent {
    pub event: DriverEvent,
    pub at: Instant,
}

/// A driver that records every event with its delivery instant.
///
/// The capture buffer is shared: clone the handle from [`Self::events`]
/// before moving the driver into the runtime, then inspect it afterwards.
#[derive(Debug, Default)]
pub struct RecordingDriver {
    events: Arc<Mutex<Vec<TimedEvent>>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared handle to the capture buffer.
    pub fn events(&self) -> Arc<Mutex<Vec<TimedEvent>>> {
        self.events.clone()
    }

    fn record(&self, event: DriverEvent) {
        self.events.lock().unwrap().push(TimedEvent {
            event,
            at: Instant::now(),
        });
    }
}

impl KeyDriver for RecordingDriver {
    fn down(&mut self, code: ScanCode) -> Result<()> {
        self.record(DriverEvent::Down(code));
        Ok(())
    }

    fn up(&mut self, code: ScanCode) -> Result<()> {
        self.record(DriverEvent::Up(code));
        Ok(())
    }

    fn focus(&mut self, title: &str) -> Result<()> {
        self.record(DriverEvent::Focus(title.to_string()));
        Ok(())
    }
}
