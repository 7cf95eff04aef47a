/// Incremental UTF-8 decoder for a chunked byte stream.
///
/// A multi-byte character split across two chunks is held back until the rest
/// of it arrives, so chunk boundaries never produce replacement characters.
/// Bytes that can never form valid UTF-8 decode to U+FFFD.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `chunk` together with any bytes held back from earlier chunks.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut decoded = String::with_capacity(self.pending.len());
        let mut consumed = 0;

        while consumed < self.pending.len() {
            let rest = &self.pending[consumed..];
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    decoded.push_str(valid);
                    consumed = self.pending.len();
                }
                Err(error) => {
                    let valid_len = error.valid_up_to();
                    decoded.push_str(&String::from_utf8_lossy(&rest[..valid_len]));
                    consumed += valid_len;
                    match error.error_len() {
                        Some(invalid_len) => {
                            decoded.push(char::REPLACEMENT_CHARACTER);
                            consumed += invalid_len;
                        }
                        // Truncated sequence at the tail; wait for the next chunk.
                        None => break,
                    }
                }
            }
        }

        self.pending.drain(..consumed);
        decoded
    }

    /// Flushes the decoder at end of stream. A dangling partial sequence
    /// becomes a single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        self.pending.clear();
        char::REPLACEMENT_CHARACTER.to_string()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
