use std::sync::OnceLock;

use encoding_rs::{CoderResult, Decoder};
use netsentinel_core::error::SessionError;
use regex::Regex;

/// sshpass exit status for a rejected password.
const SSHPASS_BAD_PASSWORD: i32 = 5;

static ERASE_REGEX: OnceLock<Regex> = OnceLock::new();
static ANSI_REGEX: OnceLock<Regex> = OnceLock::new();

/// Cursor-left / blank / cursor-left, used by VRP and Comware to wipe the pager line.
fn erase_regex() -> &'static Regex {
    ERASE_REGEX.get_or_init(|| {
        Regex::new(r"\x1b\[\d+D[ ]*\x1b\[\d+D").expect("ERASE_REGEX is valid")
    })
}

fn ansi_regex() -> &'static Regex {
    ANSI_REGEX.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]|\x1b[()][A-Z0-9]").expect("ANSI_REGEX is valid")
    })
}

/// What the end of the buffered output says about the device.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Tail {
    /// The CLI prompt is back; the command is done.
    Prompt,
    /// A pager prompt is waiting. Holds the offset the buffer should be cut at.
    Pager(usize),
    Pending,
}

/// Only the last (unterminated) line is inspected.
pub(crate) fn inspect_tail(text: &str, prompt: &Regex, pager: &Regex) -> Tail {
    let start = text.rfind('\n').map_or(0, |i| i + 1);
    let line = &text[start..];
    if let Some(m) = pager.find(line) {
        let head = line[..m.start()].trim_end_matches([' ', '\t']);
        Tail::Pager(start + head.len())
    } else if prompt.is_match(line) {
        Tail::Prompt
    } else {
        Tail::Pending
    }
}

/// Decode one read into `out`. Multi-byte sequences split across reads are kept in the decoder.
pub(crate) fn decode_chunk(decoder: &mut Decoder, bytes: &[u8], out: &mut String) {
    let mut input = bytes;
    loop {
        let needed = decoder
            .max_utf8_buffer_length(input.len())
            .unwrap_or(input.len() * 3 + 16);
        out.reserve(needed);
        let (result, read, _) = decoder.decode_to_string(input, out, false);
        input = &input[read..];
        if matches!(result, CoderResult::InputEmpty) {
            break;
        }
    }
}

/// Turn the raw terminal text of one command into plain output.
///
/// Drops escape sequences and carriage returns, the echoed command line and the trailing
/// prompt line.
pub fn clean_output(raw: &str, command: &str) -> String {
    let text = erase_regex().replace_all(raw, "");
    let text = ansi_regex().replace_all(&text, "");
    let text = text.replace('\u{8}', "").replace("\r\n", "\n").replace('\r', "");

    let mut lines: Vec<&str> = text.split('\n').collect();
    // trailing prompt
    lines.pop();
    if lines
        .first()
        .is_some_and(|first| first.trim_end().ends_with(command.trim()))
    {
        lines.remove(0);
    }

    let joined = lines.join("\n");
    joined.trim_end().to_string()
}

/// Classify an ssh process that went away before (or while) talking to the device.
pub fn classify_exit(stderr: &str, exit_code: Option<i32>, via_sshpass: bool) -> SessionError {
    let last_line = stderr.lines().map(str::trim).rfind(|l| !l.is_empty());

    if via_sshpass && exit_code == Some(SSHPASS_BAD_PASSWORD) {
        return SessionError::Authentication(
            last_line.unwrap_or("password rejected").to_string(),
        );
    }

    let lowered = stderr.to_ascii_lowercase();
    if lowered.contains("permission denied") || lowered.contains("too many authentication failures")
    {
        return SessionError::Authentication(last_line.unwrap_or("permission denied").to_string());
    }

    match (last_line, exit_code) {
        (Some(line), _) => SessionError::Connection(line.to_string()),
        (None, Some(code)) => {
            SessionError::Connection(format!("ssh exited with status {code} before the prompt"))
        }
        (None, None) => SessionError::Connection("ssh terminated by signal".to_string()),
    }
}
