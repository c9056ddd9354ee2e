/// Largest partial line kept while waiting for its newline.
pub const MAX_PENDING_BYTES: usize = 64 * 1024;

/// Turns an arbitrary byte stream into complete newline-terminated lines.
/// Bytes after the last newline are kept for the next call.
#[derive(Debug, Default)]
pub struct LineReassembler {
    buffer: Vec<u8>,
    overflows: u64,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `bytes` and returns every line completed by them, without the
    /// terminator. Empty lines are skipped and invalid UTF-8 is replaced.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buffer[start..end]);
            let line = line.trim_end_matches('\r');
            if !line.trim().is_empty() {
                lines.push(line.to_owned());
            }
            start = end + 1;
        }
        self.buffer.drain(..start);

        if self.buffer.len() > MAX_PENDING_BYTES {
            log::debug!(
                "discarding {} buffered bytes without a line break",
                self.buffer.len()
            );
            self.buffer.clear();
            self.overflows += 1;
        }

        lines
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn overflows(&self) -> u64 {
        self.overflows
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &[u8] = b"{\"type\":\"paddle\",\"y\":1}\n{\"type\":\"paddle\",\"y\":2}\n{\"type\":\"paddle\",\"y\":3}\n";

    #[test]
    fn whole_stream_at_once() {
        let mut r = LineReassembler::new();
        let lines = r.push(STREAM);
        assert_eq!(lines.len(), 3);
        assert_eq!(r.pending(), 0);
    }

    #[test]
    fn split_points_do_not_change_output() {
        let mut expected = LineReassembler::new();
        let expected = expected.push(STREAM);

        for i in 0..=STREAM.len() {
            for j in i..=STREAM.len() {
                let mut r = LineReassembler::new();
                let mut lines = r.push(&STREAM[..i]);
                lines.extend(r.push(&STREAM[i..j]));
                lines.extend(r.push(&STREAM[j..]));
                assert_eq!(lines, expected, "split at {} and {}", i, j);
                assert_eq!(r.pending(), 0);
            }
        }
    }

    #[test]
    fn partial_line_persists() {
        let mut r = LineReassembler::new();
        assert!(r.push(b"{\"type\":").is_empty());
        assert_eq!(r.pending(), 8);
        assert_eq!(r.push(b"\"paddle\"}\r\n\n"), vec!["{\"type\":\"paddle\"}"]);
    }

    #[test]
    fn oversized_partial_is_dropped() {
        let mut r = LineReassembler::new();
        let junk = vec![b'x'; MAX_PENDING_BYTES + 1];
        assert!(r.push(&junk).is_empty());
        assert_eq!(r.pending(), 0);
        assert_eq!(r.overflows(), 1);
        assert_eq!(r.push(b"ok\n"), vec!["ok"]);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let mut r = LineReassembler::new();
        let lines = r.push(b"a\xffb\n");
        assert_eq!(lines, vec!["a\u{fffd}b"]);
    }
}
