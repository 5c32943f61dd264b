//! Section scanner for bulleted help documents.
//!
//! Help pages list services and commands as `+o name` bullets under a section
//! heading. The scanner skips everything up to the first line containing the
//! heading marker, then yields bullet names until the first line that is not
//! a bullet. Later bullets, even under a repeated heading, are never examined.

use tracing::debug;

/// Prefix of a bulleted item line.
pub const BULLET_PREFIX: &str = "+o ";

/// Shortest bullet line that still carries a name.
const MIN_BULLET_LEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Skipping,
    Collecting,
    Finished,
}

/// Iterator over the item names of one help section.
#[derive(Debug)]
pub struct HelpScan<I> {
    lines: I,
    marker: String,
    state: ScanState,
}

/// Scans `lines` for the bullets that follow `marker`.
///
/// ```
/// use dumptruck_discovery::scanner::scan;
///
/// let doc = ["NAME", "COMMANDS", "+o list-users", "+o get-user", "EXAMPLES", "+o later"];
/// let names: Vec<String> = scan(doc, "COMMANDS").collect();
/// assert_eq!(names, vec!["list-users", "get-user"]);
/// ```
pub fn scan<I, S>(lines: I, marker: &str) -> HelpScan<I::IntoIter>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    HelpScan {
        lines: lines.into_iter(),
        marker: marker.to_string(),
        state: ScanState::Skipping,
    }
}

/// Returns the item name of a bullet line, or `None` for any other line.
pub fn bullet_item(line: &str) -> Option<&str> {
    if line.chars().count() >= MIN_BULLET_LEN {
        line.strip_prefix(BULLET_PREFIX)
    } else {
        None
    }
}

impl<I, S> Iterator for HelpScan<I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        loop {
            match self.state {
                ScanState::Finished => return None,
                ScanState::Skipping => {
                    let line = self.lines.next()?;
                    let line = line.as_ref();
                    if line.contains(self.marker.as_str()) {
                        self.state = ScanState::Collecting;
                    } else {
                        debug!(line, "skipping");
                    }
                }
                ScanState::Collecting => {
                    let Some(line) = self.lines.next() else {
                        self.state = ScanState::Finished;
                        return None;
                    };
                    match bullet_item(line.as_ref()) {
                        Some(item) => return Some(item.to_string()),
                        None => {
                            self.state = ScanState::Finished;
                            return None;
                        }
                    }
                }
            }
        }
    }
}
