//! Incremental decoding of chat-completion SSE bodies.
//!
//! Bytes flow through four stages:
//! - `utf8` - chunk bytes to text, carrying split code points
//! - `frame` - text to terminated lines, line classification
//! - `payload` - `data: ` payload to delta / terminal / empty / malformed
//! - `decoder` - the per-stream state machine tying them together
//!
//! `Accumulator` folds the resulting deltas into a `Conversation`, and
//! `decode_stream` adapts any byte-chunk `Stream` into decoded events.

pub mod accumulator;
pub mod decoder;
pub mod frame;
pub mod payload;
pub mod stream;
pub mod utf8;

pub use accumulator::Accumulator;
pub use decoder::{Decoded, StreamDecoder};
pub use frame::{classify_line, FrameDecoder, Line};
pub use payload::{parse_payload, Payload, DONE_SENTINEL};
pub use stream::decode_stream;
