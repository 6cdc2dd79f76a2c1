//! Subprocess output handling
//!
//! esptool and PlatformIO write human-oriented terminal output: ANSI colored,
//! carriage-return driven progress lines, occasional partial writes. This
//! module strips the escapes, reclassifies each line into a message category
//! for the terminal UIs, and chunks a raw byte stream into displayable events.

use regex::Regex;
use std::sync::OnceLock;

use crate::models::MessageKind;

static ANSI_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Remove ANSI escape sequences from text
pub fn clean_ansi(text: &str) -> String {
    let pattern =
        ANSI_PATTERN.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*[mKABC]").expect("valid regex"));
    pattern.replace_all(text, "").into_owned()
}

/// Determine the message category for a line of tool output
///
/// Substring matching over lowercased esptool/PlatformIO output keeps the
/// browser terminal colorized without parsing any tool's actual format.
pub fn classify(line: &str) -> MessageKind {
    let lower = line.to_lowercase();

    if lower.contains("writing at") || line.contains('%') {
        MessageKind::Progress
    } else if lower.contains("error") || lower.contains("failed") {
        MessageKind::Error
    } else if lower.contains("connecting") || lower.contains("chip is") {
        MessageKind::Info
    } else if lower.contains("compressed") || lower.contains("wrote") {
        MessageKind::Success
    } else {
        MessageKind::Output
    }
}

/// A display event produced from raw subprocess output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    /// A complete line with its classified category
    Line { kind: MessageKind, text: String },
    /// A carriage-return progress update, overwrites the previous one
    Progress(String),
    /// An unterminated buffer fragment worth showing already
    Partial(String),
}

/// Splits chunked subprocess output into lines and progress updates
///
/// Newlines terminate complete lines; a bare carriage return marks a progress
/// overwrite (esptool rewrites its percentage in place). Identical repeated
/// progress lines are suppressed. A growing buffer without any terminator is
/// surfaced as a partial once it exceeds a handful of bytes.
#[derive(Debug, Default)]
pub struct OutputChunker {
    buffer: String,
    last_progress: Option<String>,
}

impl OutputChunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a decoded chunk, returning the display events it completes
    pub fn push(&mut self, chunk: &str) -> Vec<OutputEvent> {
        self.buffer.push_str(chunk);
        let mut events = Vec::new();

        while let Some((line, complete)) = self.take_line() {
            let cleaned = clean_ansi(&line);
            if cleaned.is_empty() {
                continue;
            }

            if complete {
                match classify(&cleaned) {
                    MessageKind::Progress => events.push(OutputEvent::Progress(cleaned)),
                    kind => events.push(OutputEvent::Line { kind, text: cleaned }),
                }
            } else if self.last_progress.as_deref() != Some(cleaned.as_str()) {
                self.last_progress = Some(cleaned.clone());
                events.push(OutputEvent::Progress(cleaned));
            }
        }

        // Surface a substantial unterminated buffer so slow tools feel live.
        // A held trailing CR is a pending progress line, not a partial.
        if self.buffer.len() > 10 && !self.buffer.ends_with('\r') {
            let cleaned = clean_ansi(&self.buffer);
            if !cleaned.trim().is_empty() && self.last_progress.as_deref() != Some(cleaned.as_str())
            {
                events.push(OutputEvent::Partial(cleaned));
            }
        }

        events
    }

    /// Flush whatever remains in the buffer as plain output
    pub fn flush(&mut self) -> Option<OutputEvent> {
        let rest = std::mem::take(&mut self.buffer);
        let cleaned = clean_ansi(rest.trim());
        if cleaned.is_empty() {
            None
        } else {
            Some(OutputEvent::Line {
                kind: MessageKind::Output,
                text: cleaned,
            })
        }
    }

    /// Pop the next terminated line from the buffer
    ///
    /// Returns the line and whether it was newline-terminated. A CR directly
    /// followed by LF counts as a single newline terminator.
    fn take_line(&mut self) -> Option<(String, bool)> {
        let pos = self.buffer.find(['\n', '\r'])?;
        let terminator = self.buffer.as_bytes()[pos];

        // A CR at the very end may be the first half of a CRLF split across
        // chunks; hold the line until the next byte arrives
        if terminator == b'\r' && pos + 1 == self.buffer.len() {
            return None;
        }

        let line = self.buffer[..pos].to_string();
        let mut consumed = pos + 1;
        let mut complete = terminator == b'\n';
        if terminator == b'\r' && self.buffer.as_bytes().get(consumed) == Some(&b'\n') {
            consumed += 1;
            complete = true;
        }
        self.buffer.drain(..consumed);

        Some((line, complete))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_ansi_strips_color_codes() {
        assert_eq!(clean_ansi("\x1b[32mConnecting....\x1b[0m"), "Connecting....");
        assert_eq!(clean_ansi("plain text"), "plain text");
        assert_eq!(clean_ansi("\x1b[2K\x1b[1;31mfail\x1b[0m"), "fail");
    }

    #[test]
    fn test_classify_progress() {
        assert_eq!(
            classify("Writing at 0x00010000... (12 %)"),
            MessageKind::Progress
        );
        assert_eq!(classify("100 %"), MessageKind::Progress);
    }

    #[test]
    fn test_classify_error() {
        assert_eq!(
            classify("A fatal error occurred: Could not connect"),
            MessageKind::Error
        );
        assert_eq!(classify("Upload FAILED"), MessageKind::Error);
    }

    #[test]
    fn test_classify_info_and_success() {
        assert_eq!(classify("Connecting...."), MessageKind::Info);
        assert_eq!(classify("Chip is ESP32-D0WD-V3"), MessageKind::Info);
        assert_eq!(
            classify("Compressed 1163264 bytes to 748212..."),
            MessageKind::Success
        );
        assert_eq!(
            classify("Wrote 1163264 bytes in 11.2 seconds"),
            MessageKind::Success
        );
    }

    #[test]
    fn test_classify_default_output() {
        assert_eq!(classify("Leaving..."), MessageKind::Output);
    }

    #[test]
    fn test_chunker_complete_lines() {
        let mut chunker = OutputChunker::new();
        let events = chunker.push("Chip is ESP32\nLeaving...\n");
        assert_eq!(
            events,
            vec![
                OutputEvent::Line {
                    kind: MessageKind::Info,
                    text: "Chip is ESP32".to_string()
                },
                OutputEvent::Line {
                    kind: MessageKind::Output,
                    text: "Leaving...".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_chunker_carriage_return_progress() {
        let mut chunker = OutputChunker::new();
        // The trailing CR is held until the next chunk decides CR vs CRLF
        let events = chunker.push("Writing at 0x10000 (5 %)\rWriting at 0x14000 (10 %)\r");
        assert_eq!(
            events,
            vec![OutputEvent::Progress("Writing at 0x10000 (5 %)".to_string())]
        );

        let events = chunker.push("Leaving...\n");
        assert_eq!(
            events,
            vec![
                OutputEvent::Progress("Writing at 0x14000 (10 %)".to_string()),
                OutputEvent::Line {
                    kind: MessageKind::Output,
                    text: "Leaving...".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_chunker_deduplicates_progress() {
        let mut chunker = OutputChunker::new();
        let events = chunker.push("50 %\r50 %\r60 %\r");
        assert_eq!(events, vec![OutputEvent::Progress("50 %".to_string())]);
    }

    #[test]
    fn test_chunker_crlf_is_one_line() {
        let mut chunker = OutputChunker::new();
        let events = chunker.push("Hash of data verified.\r\n");
        assert_eq!(
            events,
            vec![OutputEvent::Line {
                kind: MessageKind::Output,
                text: "Hash of data verified.".to_string()
            }]
        );
    }

    #[test]
    fn test_chunker_crlf_split_across_chunks() {
        let mut chunker = OutputChunker::new();
        // No ghost progress event for the CR half of a split CRLF
        let events = chunker.push("Hash of data verified.\r");
        assert!(events.is_empty());

        let events = chunker.push("\n");
        assert_eq!(
            events,
            vec![OutputEvent::Line {
                kind: MessageKind::Output,
                text: "Hash of data verified.".to_string()
            }]
        );
    }

    #[test]
    fn test_chunker_held_carriage_return_flushes() {
        let mut chunker = OutputChunker::new();
        assert!(chunker.push("Writing at 0x18000 (99 %)\r").is_empty());
        assert_eq!(
            chunker.flush(),
            Some(OutputEvent::Line {
                kind: MessageKind::Output,
                text: "Writing at 0x18000 (99 %)".to_string()
            })
        );
    }

    #[test]
    fn test_chunker_partial_buffer() {
        let mut chunker = OutputChunker::new();
        let events = chunker.push("Connecting......");
        assert_eq!(
            events,
            vec![OutputEvent::Partial("Connecting......".to_string())]
        );

        // Short fragments stay buffered silently
        let mut chunker = OutputChunker::new();
        assert!(chunker.push("esp").is_empty());
    }

    #[test]
    fn test_chunker_split_across_chunks() {
        let mut chunker = OutputChunker::new();
        assert!(chunker.push("Chip is").is_empty());
        let events = chunker.push(" ESP32\n");
        assert_eq!(
            events,
            vec![OutputEvent::Line {
                kind: MessageKind::Info,
                text: "Chip is ESP32".to_string()
            }]
        );
    }

    #[test]
    fn test_chunker_flush_remainder() {
        let mut chunker = OutputChunker::new();
        chunker.push("trailing");
        assert_eq!(
            chunker.flush(),
            Some(OutputEvent::Line {
                kind: MessageKind::Output,
                text: "trailing".to_string()
            })
        );
        assert_eq!(chunker.flush(), None);
    }
}
