//! Diagnostics bridge between the render graph and the editor.
//!
//! Any thread may report a [`Message`] through a [`DiagnosticsSender`]; the
//! editor drains them one at a time on its own schedule. The queue is bounded:
//! once it is full, further messages are dropped and counted instead of
//! blocking the reporter, which keeps one broken declaration from flooding
//! the UI with a cascade of follow-up errors.

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    fn log_level(&self) -> log::Level {
        match self {
            Severity::Info => log::Level::Info,
            Severity::Warning | Severity::Error => log::Level::Warn,
        }
    }
}

/// A diagnostic with optional source provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub severity: Severity,
    pub path: Option<PathBuf>,
    /// 1-based line number
    pub line: Option<u32>,
    /// Column range on `line`
    pub columns: Option<Range<u32>>,
    pub text: String,
}

impl Message {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            path: None,
            line: None,
            columns: None,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Severity::Error, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, text)
    }

    /// Attribute the message to a file and optional line.
    pub fn at(mut self, path: impl AsRef<Path>, line: Option<u32>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self.line = line;
        self
    }

    pub fn with_columns(mut self, columns: Range<u32>) -> Self {
        self.columns = Some(columns);
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(path) = &self.path {
            write!(f, "{}", path.display())?;
            if let Some(line) = self.line {
                write!(f, ":{}", line)?;
                if let Some(columns) = &self.columns {
                    write!(f, ":{}", columns.start)?;
                }
            }
            write!(f, ": ")?;
        }
        write!(f, "{}: {}", self.severity.as_str(), self.text)
    }
}

/// Cloneable producer side of the diagnostics queue.
#[derive(Debug, Clone)]
pub struct DiagnosticsSender {
    sender: Sender<Message>,
    dropped: Arc<AtomicUsize>,
}

impl DiagnosticsSender {
    /// Queue a message. Returns false if it was dropped.
    pub fn report(&self, message: Message) -> bool {
        log::log!(message.severity.log_level(), "{}", message);
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                    log::warn!("Diagnostics queue full, dropping further messages");
                }
                false
            }
            // The bridge owns a receiver, so this only happens after it is gone.
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Bounded multi-producer, single-consumer diagnostics queue.
#[derive(Debug)]
pub struct DiagnosticsBridge {
    sender: DiagnosticsSender,
    receiver: Receiver<Message>,
    capacity: usize,
}

impl DiagnosticsBridge {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Self {
            sender: DiagnosticsSender {
                sender,
                dropped: Arc::new(AtomicUsize::new(0)),
            },
            receiver,
            capacity,
        }
    }

    /// A producer handle for another thread or component.
    pub fn sender(&self) -> DiagnosticsSender {
        self.sender.clone()
    }

    pub fn report(&self, message: Message) -> bool {
        self.sender.report(message)
    }

    /// Take the oldest queued message, if any.
    ///
    /// Draining an empty queue re-arms the "queue full" warning.
    pub fn drain_one(&self) -> Option<Message> {
        let message = self.receiver.try_recv().ok();
        if message.is_none() {
            self.sender.dropped.store(0, Ordering::Relaxed);
        }
        message
    }

    pub fn drain_all(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.receiver.len());
        while let Some(message) = self.drain_one() {
            messages.push(message);
        }
        messages
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Messages dropped since the queue was last seen empty.
    pub fn dropped(&self) -> usize {
        self.sender.dropped.load(Ordering::Relaxed)
    }
}
