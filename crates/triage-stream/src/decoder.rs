//! Per-stream decoding state machine.
//!
//! A `data: ` line whose JSON does not parse is not dropped: it becomes the
//! decoder's single pending partial and later lines are tried as its
//! continuation. Some upstreams break a JSON object across what looks like a
//! line boundary, so a parse failure means "frame not complete yet".

use tracing::{debug, warn};

use crate::frame::{classify_line, data_field, FrameDecoder, Line};
use crate::payload::{parse_payload, Payload};
use triage_core::config::DEFAULT_MAX_PENDING_BYTES;

/// Event produced by the decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// Non-empty content fragment to append to the assistant message.
    Delta(String),
    /// The `[DONE]` sentinel; nothing after it is decoded.
    Done,
    /// The stream closed while undecodable data was still buffered.
    /// Only produced by `StreamDecoder::finish`.
    Truncated { discarded_bytes: usize },
}

/// Incremental SSE decoder for one response body.
#[derive(Debug)]
pub struct StreamDecoder {
    frames: FrameDecoder,
    /// A payload that failed to parse, awaiting its continuation.
    pending: Option<String>,
    max_pending_bytes: usize,
    /// Set once the sentinel has been seen.
    finished: bool,
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::with_max_pending(DEFAULT_MAX_PENDING_BYTES)
    }

    pub fn with_max_pending(max_pending_bytes: usize) -> Self {
        Self {
            frames: FrameDecoder::new(),
            pending: None,
            max_pending_bytes,
            finished: false,
        }
    }

    /// True once the terminal sentinel has been decoded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The payload currently held for continuation, if any.
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    /// Feed one network chunk and drain every complete line it finished.
    ///
    /// Returns the deltas in order, followed by `Done` if the sentinel was
    /// reached. Chunks fed after `Done` are ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Decoded> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }

        self.frames.push(chunk);
        while let Some(line) = self.frames.next_line() {
            match self.decode_line(&line) {
                Some(Decoded::Done) => {
                    debug!("stream sentinel reached");
                    self.finished = true;
                    out.push(Decoded::Done);
                    break;
                }
                Some(event) => out.push(event),
                None => {}
            }
        }
        out
    }

    /// Close the stream. Reports `Truncated` when a pending partial or an
    /// unterminated line had to be thrown away. Nothing is reported after
    /// the sentinel: trailing bytes there are ignored on purpose.
    pub fn finish(&mut self) -> Option<Decoded> {
        let pending = self.pending.take().map(|p| p.len()).unwrap_or(0);
        let remainder = self.frames.discard_remainder();
        if self.finished {
            return None;
        }

        let discarded_bytes = pending + remainder;
        if discarded_bytes == 0 {
            return None;
        }
        warn!(
            pending_bytes = pending,
            remainder_bytes = remainder,
            "stream ended with undecoded data"
        );
        Some(Decoded::Truncated { discarded_bytes })
    }

    fn decode_line(&mut self, line: &str) -> Option<Decoded> {
        let frame = classify_line(line);
        match (self.pending.take(), frame) {
            (None, Line::Comment | Line::Blank) => None,
            // a split before a JSON colon looks like a comment
            (Some(partial), Line::Comment | Line::Blank) => self.try_framing(partial, line),
            (None, Line::Other) => None,
            (None, Line::Data(payload)) => match parse_payload(payload) {
                Payload::Malformed => {
                    self.hold(data_field(line).to_string());
                    None
                }
                parsed => emit(parsed),
            },
            (Some(partial), frame) => self.resume(partial, line, frame),
        }
    }

    /// Try `line` as the continuation of a held partial.
    fn resume(&mut self, partial: String, line: &str, frame: Line<'_>) -> Option<Decoded> {
        let mut joined = partial;
        joined.push_str(data_field(line));

        match parse_payload(joined.trim_end()) {
            Payload::Malformed => {
                // a complete frame of its own means the old partial never finishes
                if let Line::Data(own) = frame {
                    let standalone = parse_payload(own);
                    if standalone != Payload::Malformed {
                        warn!(
                            dropped_bytes = joined.len() - own.len(),
                            "abandoning unparseable partial payload"
                        );
                        return emit(standalone);
                    }
                }
                self.hold(joined);
                None
            }
            parsed => {
                debug!(len = joined.len(), "partial payload completed");
                emit(parsed)
            }
        }
    }

    /// Try a comment or blank line as the continuation of a held partial.
    /// When the join does not parse, the line was framing after all and the
    /// partial is kept unchanged.
    fn try_framing(&mut self, mut partial: String, line: &str) -> Option<Decoded> {
        let held = partial.len();
        partial.push_str(line);

        match parse_payload(partial.trim_end()) {
            Payload::Malformed => {
                partial.truncate(held);
                self.pending = Some(partial);
                None
            }
            parsed => {
                debug!(len = partial.len(), "partial payload completed by comment-shaped line");
                emit(parsed)
            }
        }
    }

    fn hold(&mut self, payload: String) {
        if payload.len() > self.max_pending_bytes {
            warn!(
                len = payload.len(),
                max = self.max_pending_bytes,
                "partial payload exceeds limit, dropping"
            );
            return;
        }
        debug!(len = payload.len(), "payload incomplete, holding for continuation");
        self.pending = Some(payload);
    }
}

fn emit(payload: Payload) -> Option<Decoded> {
    match payload {
        Payload::Terminal => Some(Decoded::Done),
        Payload::Delta(text) => Some(Decoded::Delta(text)),
        Payload::Empty | Payload::Malformed => None,
    }
}
