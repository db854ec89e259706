//! Message Queue
//!
//! External processes talk to the mascot by writing a small JSON object into
//! a window property:
//!
//! ```json
//! {"method": "message", "content": "Build finished", "link": "https://ci/42"}
//! {"method": "jump"}
//! ```
//!
//! Each accepted notification becomes a [`Message`] appended to a FIFO
//! [`MessageQueue`]. The animation state machine looks at the head to decide
//! whether to pause or jump, and consumes it when done.
//!
//! Malformed payloads never reach the queue. They are logged at debug level
//! and otherwise ignored: partial external input must not disturb the mascot.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a message asks the mascot to do
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Stop, hold up the sign, and show `content`
    Message,
    /// Hop right away
    Jump,
}

/// One unit of external input
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Requested action
    pub method: Method,
    /// Text for the sign
    #[serde(default)]
    pub content: Option<String>,
    /// Related link; carried along but not rendered
    #[serde(default)]
    pub link: Option<String>,
}

impl Message {
    /// A text message for the sign
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            method: Method::Message,
            content: Some(content.into()),
            link: None,
        }
    }

    /// A jump request
    #[must_use]
    pub fn jump() -> Self {
        Self {
            method: Method::Jump,
            content: None,
            link: None,
        }
    }

    /// Attach a link
    #[must_use]
    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Decode a notification payload
    ///
    /// Returns `None` for anything that is not a JSON object with a known
    /// `method` and string-valued `content`/`link`.
    #[must_use]
    pub fn from_notification(payload: &[u8]) -> Option<Self> {
        // Property values are often NUL-terminated by C writers
        let trimmed = match payload.iter().rposition(|&b| b != 0) {
            Some(end) => &payload[..=end],
            None => return None,
        };

        match serde_json::from_slice::<Self>(trimmed) {
            Ok(message) => Some(message),
            Err(e) => {
                debug!(error = %e, len = payload.len(), "Dropping undecodable notification");
                None
            }
        }
    }

    /// Whether this message asks for a pause with the sign
    #[must_use]
    pub fn is_display(&self) -> bool {
        self.method == Method::Message
    }
}

/// FIFO of pending messages
#[derive(Clone, Debug, Default)]
pub struct MessageQueue {
    pending: VecDeque<Message>,
}

impl MessageQueue {
    /// Create an empty queue
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail
    pub fn enqueue(&mut self, message: Message) {
        self.pending.push_back(message);
    }

    /// First message without removing it
    #[must_use]
    pub fn peek_head(&self) -> Option<&Message> {
        self.pending.front()
    }

    /// Remove and return the first message
    pub fn dequeue(&mut self) -> Option<Message> {
        self.pending.pop_front()
    }

    /// Decode a notification payload and enqueue it
    ///
    /// Returns `true` if a message was accepted.
    pub fn push_notification(&mut self, payload: &[u8]) -> bool {
        match Message::from_notification(payload) {
            Some(message) => {
                debug!(method = ?message.method, pending = self.pending.len() + 1, "Message queued");
                self.enqueue(message);
                true
            }
            None => false,
        }
    }

    /// Number of pending messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
