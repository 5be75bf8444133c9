//! Session history and history selection.

/// Ordered, append-only list of strings seen during a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        self.entries.push(entry.into());
    }

    /// Entry at a zero-based index.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(String::as_str)
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(1-based number, entry)` pairs, as shown to the user.
    pub fn numbered(&self) -> impl Iterator<Item = (usize, &str)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i + 1, entry.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid selection '{input}': expected 0 to {max}")]
pub struct InvalidSelection {
    pub input: String,
    pub max: usize,
}

/// Parse a history choice typed by the user.
///
/// `0` means "enter a new value" (`None`); `1..=len` selects an entry and is
/// returned as a zero-based index.
pub fn parse_selection(input: &str, len: usize) -> Result<Option<usize>, InvalidSelection> {
    let invalid = || InvalidSelection {
        input: input.trim().to_string(),
        max: len,
    };
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    match trimmed.parse::<usize>().map_err(|_| invalid())? {
        0 => Ok(None),
        n if n <= len => Ok(Some(n - 1)),
        _ => Err(invalid()),
    }
}
