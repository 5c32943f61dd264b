//! Normalization of raw tool output into clean lines.

use std::sync::LazyLock;

use regex::Regex;

/// Splits raw output into trimmed, printable, non-empty lines.
///
/// Lines break at `\n`, `\r\n`, `\r` and the other Unicode line boundaries
/// (vertical tab, form feed, the file/group/record separators, NEL, U+2028
/// and U+2029). Invalid UTF-8 and ANSI CSI sequences are dropped, as is every
/// character outside printable ASCII. Interior tabs become spaces.
/// Backspace overstrike pairs are not collapsed: stripping the backspace
/// leaves the doubled letters (`SSEERRVVIICCEESS`) that section markers
/// match against.
///
/// ```
/// use dumptruck_discovery::sanitize::sanitize;
///
/// let lines: Vec<String> = sanitize(b"  +o ec2\r\n\n\x1b[1mS\x08SE\x08E\x1b[0m\n").collect();
/// assert_eq!(lines, vec!["+o ec2", "SSEE"]);
/// ```
pub fn sanitize(raw: &[u8]) -> SanitizedLines {
    static ANSI_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("static regex must compile")
    });

    let decoded = String::from_utf8_lossy(raw);
    let text = ANSI_RE.replace_all(&decoded, "").into_owned();
    SanitizedLines { text, pos: 0 }
}

/// One-pass iterator returned by [`sanitize`].
#[derive(Debug)]
pub struct SanitizedLines {
    text: String,
    pos: usize,
}

impl Iterator for SanitizedLines {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            let (line, advance) = match rest.char_indices().find(|(_, ch)| is_line_break(*ch)) {
                Some((end, '\r')) if rest[end + 1..].starts_with('\n') => (&rest[..end], end + 2),
                Some((end, ch)) => (&rest[..end], end + ch.len_utf8()),
                None => (rest, rest.len()),
            };
            self.pos += advance;

            let cleaned = printable_only(line);
            let trimmed = cleaned.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        None
    }
}

fn is_line_break(ch: char) -> bool {
    matches!(
        ch,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn printable_only(line: &str) -> String {
    line.chars()
        .filter_map(|ch| match ch {
            ' '..='~' => Some(ch),
            '\t' => Some(' '),
            _ => None,
        })
        .collect()
}
