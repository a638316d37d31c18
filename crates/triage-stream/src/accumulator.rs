use triage_core::{Conversation, Message, TailUpdate};

/// Running total of the assistant reply for one stream.
///
/// The total lives here, never re-read from the log: each delta extends the
/// running string and the whole string is written to the log tail.
#[derive(Debug, Default)]
pub struct Accumulator {
    content: String,
    applied: usize,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `delta` and publish the running total as the assistant tail.
    pub fn apply(&mut self, log: &mut Conversation, delta: &str) -> TailUpdate {
        self.content.push_str(delta);
        self.applied += 1;
        log.replace_last_or_append(Message::assistant(self.content.clone()))
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Number of deltas applied so far.
    pub fn applied(&self) -> usize {
        self.applied
    }
}
