//! User-visible messages.
//!
//! The core reports what the user should see ("search hit BOTTOM,
//! continuing at TOP", "E486: Pattern not found: foo") through a
//! [`MessageSink`] owned by the host. Diagnostics go to `tracing` instead.

use tracing::{info, warn};

/// Where the core sends messages for the status line.
pub trait MessageSink {
    /// An error; the host usually highlights it and may beep.
    fn error(&mut self, text: &str);

    /// Informational text.
    fn status(&mut self, text: &str);
}

/// One message as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Error(String),
    Status(String),
}

impl Message {
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Error(text) | Self::Status(text) => text,
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Keeps every message in memory. For headless hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The newest message.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Drain everything received so far.
    pub fn take(&mut self) -> Vec<Message> {
        std::mem::take(&mut self.messages)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl MessageSink for MessageLog {
    fn error(&mut self, text: &str) {
        self.messages.push(Message::Error(text.to_string()));
    }

    fn status(&mut self, text: &str) {
        self.messages.push(Message::Status(text.to_string()));
    }
}

/// Forwards messages to `tracing` (errors at `warn`, status at `info`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl MessageSink for TracingSink {
    fn error(&mut self, text: &str) {
        warn!(target: "n_vi::message", "{text}");
    }

    fn status(&mut self, text: &str) {
        info!(target: "n_vi::message", "{text}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn log_keeps_order_and_kind() {
        let mut log = MessageLog::new();
        log.status("search hit BOTTOM, continuing at TOP");
        log.error("E486: Pattern not found: x");

        assert!(log.last().is_some_and(Message::is_error));
        let texts: Vec<_> = log.messages().iter().map(Message::text).collect();
        assert_eq!(
            texts,
            vec!["search hit BOTTOM, continuing at TOP", "E486: Pattern not found: x"]
        );
        assert_eq!(log.take().len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn tracing_sink_accepts_messages() {
        let mut sink = TracingSink;
        sink.status("ok");
        sink.error("bad");
    }
}
