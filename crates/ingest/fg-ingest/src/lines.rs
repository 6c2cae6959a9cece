//! Line reassembly across chunk boundaries.
//!
//! Chunk boundaries fall anywhere - mid-line, mid-character. Decoding and
//! splitting each chunk independently silently truncates every record that
//! straddles a boundary, so the assembler works on bytes: it splits only at
//! newline bytes and carries the unterminated tail forward to the next
//! chunk. At most one line's worth of bytes is retained between chunks.

/// Reassembles a chunked byte stream into complete text lines.
#[derive(Debug, Default)]
pub struct LineAssembler {
    /// Unterminated tail of the most recent chunk.
    pending: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk, returning every line completed by it.
    ///
    /// A line is complete once its terminating `\n` has been seen. The
    /// bytes after the last newline (if any) are held until the next call.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;

        for (i, &byte) in chunk.iter().enumerate() {
            if byte == b'\n' {
                self.pending.extend_from_slice(&chunk[start..i]);
                lines.push(take_line(&mut self.pending));
                start = i + 1;
            }
        }

        self.pending.extend_from_slice(&chunk[start..]);
        lines
    }

    /// Flush the final unterminated fragment, if any.
    ///
    /// Called once after the last chunk; a file whose last line lacks a
    /// trailing newline still yields that line.
    pub fn finish(mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(take_line(&mut self.pending))
        }
    }
}

/// Decode and drain the pending buffer as one line.
///
/// Decoding happens only on complete lines, so a multi-byte character split
/// across a chunk boundary is reassembled before it is interpreted. Invalid
/// UTF-8 is replaced rather than fatal, and a trailing CR is trimmed so CRLF
/// input parses the same as LF input.
fn take_line(pending: &mut Vec<u8>) -> String {
    if pending.last() == Some(&b'\r') {
        pending.pop();
    }
    let line = String::from_utf8_lossy(pending).into_owned();
    pending.clear();
    line
}
