//! Frame assembly state machine
//!
//! Accumulates bytes across polls and extracts at most one completed frame
//! per poll according to the configured prefix / delimiter / fixed-length
//! rules. The caller owns the leftover buffer and hands it in by value on
//! every poll; the parser hands the updated leftover back.

/// Result of feeding one poll's bytes through the parser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Completed frame, if this poll finished one
    pub frame: Option<Vec<u8>>,
    /// Bytes read but not yet consumed into a frame
    pub leftover: Vec<u8>,
}

/// Cross-poll parse state, re-derived from the configuration after every
/// completed frame
#[derive(Debug, Clone)]
struct ParserState {
    prefix_found: bool,
    delimiter_found: bool,
    bytes_needed: usize,
    parsed_event: Vec<u8>,
}

/// Stateful frame parser for prefix / delimiter / fixed-length framing
#[derive(Debug)]
pub struct FrameParser {
    prefix: Option<Vec<u8>>,
    delimiter: Option<Vec<u8>>,
    fixed_length: usize,
    state: ParserState,
}

impl FrameParser {
    /// Create a parser for the given framing rules. A `fixed_length` of
    /// `None` disables length-based completion.
    pub fn new(
        prefix: Option<Vec<u8>>,
        delimiter: Option<Vec<u8>>,
        fixed_length: Option<usize>,
    ) -> Self {
        let mut parser = Self {
            prefix,
            delimiter,
            fixed_length: fixed_length.unwrap_or(0),
            state: ParserState {
                prefix_found: true,
                delimiter_found: true,
                bytes_needed: 0,
                parsed_event: Vec::new(),
            },
        };
        parser.reset();
        parser
    }

    /// Reset cross-poll state to its configuration-derived initial values.
    /// Nothing from a previously completed frame survives.
    pub fn reset(&mut self) {
        self.state = ParserState {
            prefix_found: self.prefix.is_none(),
            delimiter_found: self.delimiter.is_none(),
            bytes_needed: self.fixed_length,
            parsed_event: Vec::new(),
        };
    }

    /// Feed one poll's newly read bytes, together with the previous poll's
    /// leftover buffer.
    ///
    /// Emits at most one frame per call even when the buffered bytes
    /// already contain several complete frames; the remainder is returned
    /// as leftover and drains on subsequent polls.
    pub fn feed(&mut self, leftover: Vec<u8>, incoming: &[u8]) -> ParseOutcome {
        // The delimiter gate below latches on the residual buffer as it
        // stood before this poll's bytes were appended.
        let had_residual = !leftover.is_empty();
        let mut buffer = leftover;
        buffer.extend_from_slice(incoming);

        if !self.state.prefix_found {
            if let Some(prefix) = &self.prefix {
                if buffer.len() >= prefix.len() {
                    if let Some(at) = find_subsequence(&buffer, prefix) {
                        buffer.drain(..at + prefix.len());
                        self.state.prefix_found = true;
                    }
                }
                if !self.state.prefix_found {
                    // No prefix yet: keep everything and wait for more bytes.
                    return ParseOutcome {
                        frame: None,
                        leftover: buffer,
                    };
                }
            }
        }

        if !self.state.delimiter_found {
            if let Some(delimiter) = &self.delimiter {
                // Delimiter search only runs once a previous poll has left
                // residual bytes behind, so a delimiter arriving in the same
                // poll as a previously-empty buffer is found one poll late.
                if had_residual && buffer.len() >= delimiter.len() {
                    if let Some(at) = find_subsequence(&buffer, delimiter) {
                        self.state.parsed_event.extend_from_slice(&buffer[..at]);
                        let rest = buffer.split_off(at + delimiter.len());
                        let frame = std::mem::take(&mut self.state.parsed_event);
                        self.reset();
                        return ParseOutcome {
                            frame: Some(frame),
                            leftover: rest,
                        };
                    }
                }
            }
        }

        if self.state.bytes_needed > 0 && !buffer.is_empty() {
            let take = self.state.bytes_needed.min(buffer.len());
            let rest = buffer.split_off(take);
            self.state.parsed_event.append(&mut buffer);
            self.state.bytes_needed -= take;
            if self.state.bytes_needed == 0 {
                let frame = std::mem::take(&mut self.state.parsed_event);
                self.reset();
                return ParseOutcome {
                    frame: Some(frame),
                    leftover: rest,
                };
            }
            // Short read: everything was consumed into the pending frame.
            return ParseOutcome {
                frame: None,
                leftover: rest,
            };
        }

        ParseOutcome {
            frame: None,
            leftover: buffer,
        }
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delimiter_parser(delimiter: &[u8]) -> FrameParser {
        FrameParser::new(None, Some(delimiter.to_vec()), None)
    }

    #[test]
    fn test_delimiter_waits_for_residual_bytes() {
        let mut parser = delimiter_parser(b"\n");

        // A complete frame in the very first poll is not extracted yet
        // because the previous leftover buffer was empty.
        let outcome = parser.feed(Vec::new(), b"hello\n");
        assert_eq!(outcome.frame, None);
        assert_eq!(outcome.leftover, b"hello\n");

        // The next poll sees residual bytes and extracts it.
        let outcome = parser.feed(outcome.leftover, b"");
        assert_eq!(outcome.frame, Some(b"hello".to_vec()));
        assert_eq!(outcome.leftover, b"");
    }

    #[test]
    fn test_delimiter_split_across_polls() {
        let mut parser = delimiter_parser(b"\n");

        let outcome = parser.feed(Vec::new(), b"AB");
        assert_eq!(outcome.frame, None);

        let outcome = parser.feed(outcome.leftover, b"C\n");
        assert_eq!(outcome.frame, Some(b"ABC".to_vec()));
        assert_eq!(outcome.leftover, b"");
    }

    #[test]
    fn test_bytes_after_delimiter_become_leftover() {
        let mut parser = delimiter_parser(b"\n");

        let outcome = parser.feed(b"one".to_vec(), b"\ntwo");
        assert_eq!(outcome.frame, Some(b"one".to_vec()));
        assert_eq!(outcome.leftover, b"two");
    }

    #[test]
    fn test_one_frame_per_poll() {
        let mut parser = delimiter_parser(b"\n");

        // Two complete frames buffered; only the first comes out this poll.
        let outcome = parser.feed(b"one\ntwo\n".to_vec(), b"");
        assert_eq!(outcome.frame, Some(b"one".to_vec()));
        assert_eq!(outcome.leftover, b"two\n");

        // The second drains on the next poll with no new bytes.
        let outcome = parser.feed(outcome.leftover, b"");
        assert_eq!(outcome.frame, Some(b"two".to_vec()));
        assert_eq!(outcome.leftover, b"");
    }

    #[test]
    fn test_multi_byte_delimiter() {
        let mut parser = delimiter_parser(b"\r\n");

        let outcome = parser.feed(b"data\r".to_vec(), b"\nrest");
        assert_eq!(outcome.frame, Some(b"data".to_vec()));
        assert_eq!(outcome.leftover, b"rest");
    }

    #[test]
    fn test_prefix_discards_preceding_bytes() {
        let mut parser = FrameParser::new(Some(b">".to_vec()), Some(b"\n".to_vec()), None);

        let outcome = parser.feed(Vec::new(), b"junk>hel");
        assert_eq!(outcome.frame, None);
        assert_eq!(outcome.leftover, b"hel");

        let outcome = parser.feed(outcome.leftover, b"lo\nrest");
        assert_eq!(outcome.frame, Some(b"hello".to_vec()));
        assert_eq!(outcome.leftover, b"rest");
    }

    #[test]
    fn test_missing_prefix_retains_buffer() {
        let mut parser = FrameParser::new(Some(b"$$".to_vec()), Some(b"\n".to_vec()), None);

        // Without the prefix the poll ends with the buffer untouched, even
        // though a delimiter is present.
        let outcome = parser.feed(b"no frame here\n".to_vec(), b"still none\n");
        assert_eq!(outcome.frame, None);
        assert_eq!(outcome.leftover, b"no frame here\nstill none\n");
    }

    #[test]
    fn test_prefix_required_again_after_frame() {
        let mut parser = FrameParser::new(Some(b">".to_vec()), Some(b"\n".to_vec()), None);

        let outcome = parser.feed(b">first".to_vec(), b"\n>seco");
        assert_eq!(outcome.frame, Some(b"first".to_vec()));

        // The next frame needs its own prefix; ">seco" still carries it.
        let outcome = parser.feed(outcome.leftover, b"nd\n");
        assert_eq!(outcome.frame, Some(b"second".to_vec()));
    }

    #[test]
    fn test_fixed_length_accumulates_across_polls() {
        let mut parser = FrameParser::new(None, None, Some(4));

        let outcome = parser.feed(Vec::new(), b"AB");
        assert_eq!(outcome.frame, None);
        assert_eq!(outcome.leftover, b"");

        let outcome = parser.feed(outcome.leftover, b"CD");
        assert_eq!(outcome.frame, Some(b"ABCD".to_vec()));
        assert_eq!(outcome.leftover, b"");
    }

    #[test]
    fn test_fixed_length_excess_becomes_leftover() {
        let mut parser = FrameParser::new(None, None, Some(4));

        let outcome = parser.feed(Vec::new(), b"EFGHIJ");
        assert_eq!(outcome.frame, Some(b"EFGH".to_vec()));
        assert_eq!(outcome.leftover, b"IJ");

        let outcome = parser.feed(outcome.leftover, b"KL");
        assert_eq!(outcome.frame, Some(b"IJKL".to_vec()));
        assert_eq!(outcome.leftover, b"");
    }

    #[test]
    fn test_delimiter_takes_priority_over_fixed_length() {
        let mut parser = FrameParser::new(None, Some(b"\n".to_vec()), Some(2));

        // Residual bytes present, so the delimiter branch runs first and
        // wins over the length accounting in the same poll.
        let outcome = parser.feed(b"XY".to_vec(), b"\nZ");
        assert_eq!(outcome.frame, Some(b"XY".to_vec()));
        assert_eq!(outcome.leftover, b"Z");
    }

    #[test]
    fn test_idle_poll_leaves_state_unchanged() {
        let mut parser = FrameParser::new(None, None, Some(8));

        let outcome = parser.feed(Vec::new(), b"part");
        assert_eq!(outcome.frame, None);

        // Zero new bytes, nothing pending: no event, no state change.
        let outcome = parser.feed(outcome.leftover, b"");
        assert_eq!(outcome.frame, None);
        assert_eq!(outcome.leftover, b"");

        let outcome = parser.feed(outcome.leftover, b"ial!");
        assert_eq!(outcome.frame, Some(b"partial!".to_vec()));
    }

    #[test]
    fn test_reset_discards_partial_frame() {
        let mut parser = FrameParser::new(None, None, Some(4));

        let _ = parser.feed(Vec::new(), b"AB");
        parser.reset();

        // The two consumed bytes are gone; a fresh frame starts over.
        let outcome = parser.feed(Vec::new(), b"WXYZ");
        assert_eq!(outcome.frame, Some(b"WXYZ".to_vec()));
    }
}
