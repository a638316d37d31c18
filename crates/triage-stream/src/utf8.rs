//! Streaming UTF-8 decoding.
//!
//! Network chunk boundaries do not respect character boundaries, so a code
//! point may arrive split across two reads. The incomplete tail of one chunk
//! is carried and completed by the next. Invalid sequences become U+FFFD.

/// Incremental UTF-8 decoder.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    /// Leading bytes of a code point whose continuation has not arrived yet.
    carry: Vec<u8>,
}

impl Utf8Decoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk`, prefixed with any bytes carried from the previous call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let bytes = if self.carry.is_empty() {
            chunk.to_vec()
        } else {
            let mut combined = std::mem::take(&mut self.carry);
            combined.extend_from_slice(chunk);
            combined
        };

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(invalid) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[invalid..];
                        }
                        None => {
                            // truncated sequence at the end: wait for more bytes
                            self.carry = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Number of bytes held back waiting for the rest of a code point.
    pub fn carried(&self) -> usize {
        self.carry.len()
    }

    /// Forget any carried bytes, returning how many were dropped.
    pub fn reset(&mut self) -> usize {
        std::mem::take(&mut self.carry).len()
    }
}
