use std::collections::VecDeque;

/// Accumulates raw bytes and hands out complete lines.
///
/// A line ends at `\n`. Bytes of an unfinished line are kept until the rest
/// arrives, so a read timeout in the middle of a line loses nothing.
pub(crate) struct LineBuffer {
    buffer: VecDeque<u8>,
    max_line_bytes: usize,
    // Set after an overflow: the rest of that line, up to `\n`, is dropped.
    discarding: bool,
}

impl LineBuffer {
    pub(crate) fn new(max_line_bytes: usize) -> LineBuffer {
        LineBuffer {
            buffer: VecDeque::new(),
            max_line_bytes,
            discarding: false,
        }
    }

    pub(crate) fn extend(&mut self, data: &[u8]) {
        self.buffer.extend(data);
    }

    /// Next complete line, with surrounding whitespace (including `\r`)
    /// stripped. Bytes that are not valid UTF-8 are dropped.
    pub(crate) fn next_line(&mut self) -> Option<String> {
        loop {
            let end = find_line_end(&self.buffer)?;
            let raw = self.buffer.drain(..=end).collect::<Vec<_>>();
            if self.discarding {
                self.discarding = false;
                continue;
            }
            return Some(valid_utf8(&raw).trim().to_string());
        }
    }

    /// Drops the buffered bytes when they exceed the line limit without a
    /// terminator, together with the rest of that line once it arrives.
    /// Returns the number of bytes dropped now.
    pub(crate) fn discard_overflow(&mut self) -> Option<usize> {
        if self.buffer.len() <= self.max_line_bytes || find_line_end(&self.buffer).is_some() {
            return None;
        }
        let n = self.buffer.len();
        self.buffer.clear();
        self.discarding = true;
        Some(n)
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.buffer.len()
    }
}

fn find_line_end(buffer: &VecDeque<u8>) -> Option<usize> {
    buffer.iter().position(|b| *b == b'\n')
}

fn valid_utf8(raw: &[u8]) -> String {
    raw.utf8_chunks().map(|chunk| chunk.valid()).collect()
}
