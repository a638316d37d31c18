use std::io::{self, Write};

use triage_core::{Conversation, Role};

pub const DISCLAIMER: &str = "Medical Disclaimer: This AI assistant provides general health \
information only. It is not a substitute for professional medical advice, diagnosis, or \
treatment. Always consult a qualified healthcare provider for any medical concerns or \
emergencies.";

/// Prints the assistant reply of one exchange as it grows.
///
/// The reply lives at a fixed index in the log; each render writes only the
/// text appended since the previous one.
pub struct ReplyPrinter<W: Write> {
    out: W,
    index: usize,
    printed: usize,
}

impl<W: Write> ReplyPrinter<W> {
    /// `index` is where the assistant message will appear in the log.
    pub fn new(out: W, index: usize) -> Self {
        Self {
            out,
            index,
            printed: 0,
        }
    }

    pub fn render(&mut self, log: &Conversation) -> io::Result<()> {
        let Some(reply) = log.messages().get(self.index) else {
            return Ok(());
        };
        if reply.role != Role::Assistant {
            return Ok(());
        }
        if let Some(fresh) = reply.content.get(self.printed..) {
            if !fresh.is_empty() {
                self.out.write_all(fresh.as_bytes())?;
                self.out.flush()?;
                self.printed = reply.content.len();
            }
        }
        Ok(())
    }

    /// True once any reply text has been written.
    pub fn started(&self) -> bool {
        self.printed > 0
    }

    /// End the reply line if one was started.
    pub fn finish(&mut self) -> io::Result<()> {
        if self.started() {
            writeln!(self.out)?;
        }
        self.out.flush()
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}
