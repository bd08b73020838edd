//! Lossless model of a `KEY=VALUE` configuration file (`.env`).
//!
//! The document keeps every line's original text, so `parse` followed by
//! `serialize` returns the input byte for byte. Edits only touch the lines
//! they target; everything else (comments, odd lines, `\r`, the presence or
//! absence of a trailing newline) survives untouched.

use std::sync::LazyLock;

use regex::Regex;

static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?([A-Za-z_][A-Za-z0-9_.\-]*)\s*=(.*)$")
        .expect("valid entry regex")
});

/// A single line of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// Empty or whitespace-only.
    Blank(String),
    /// Starts with `#` after optional whitespace.
    Comment(String),
    /// `KEY=VALUE` assignment. `raw` is the text as written.
    Entry {
        key: String,
        value: String,
        raw: String,
    },
    /// Anything that is none of the above; preserved verbatim.
    Other(String),
}

impl Line {
    fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Line::Blank(raw.to_string());
        }
        if trimmed.starts_with('#') {
            return Line::Comment(raw.to_string());
        }
        match ENTRY_RE.captures(raw) {
            Some(caps) => Line::Entry {
                key: caps[1].to_string(),
                value: caps[2].trim_end_matches('\r').to_string(),
                raw: raw.to_string(),
            },
            None => Line::Other(raw.to_string()),
        }
    }

    pub fn raw(&self) -> &str {
        match self {
            Line::Blank(raw) | Line::Comment(raw) | Line::Other(raw) => raw,
            Line::Entry { raw, .. } => raw,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            Line::Entry { key, .. } => Some(key),
            _ => None,
        }
    }
}

/// Parsed configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvDocument {
    lines: Vec<Line>,
}

impl EnvDocument {
    /// Split on `\n` (a trailing newline yields a final empty segment, which
    /// is what lets `serialize` put it back).
    pub fn parse(contents: &str) -> Self {
        Self {
            lines: contents.split('\n').map(Line::parse).collect(),
        }
    }

    pub fn serialize(&self) -> String {
        self.lines
            .iter()
            .map(Line::raw)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Value of the last entry for `key`; later assignments win, as in any
    /// dotenv loader.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn contains_any_key(&self, keys: &[String]) -> bool {
        self.lines
            .iter()
            .filter_map(Line::key)
            .any(|k| keys.iter().any(|wanted| wanted == k))
    }

    /// On every `key` entry whose value starts with `from`, swap that prefix
    /// for `to`. The rest of the line (suffix, `export `, `\r`) is kept.
    ///
    /// Returns the number of lines changed.
    pub fn replace_value_prefix(&mut self, key: &str, from: &str, to: &str) -> usize {
        let mut changed = 0;
        for line in &mut self.lines {
            let Line::Entry { key: k, value, raw } = line else {
                continue;
            };
            if k.as_str() != key || !value.starts_with(from) {
                continue;
            }
            let body_len = raw.trim_end_matches('\r').len();
            let head = &raw[..body_len - value.len()];
            let tail = &raw[body_len..];
            let new_value = format!("{to}{}", &value[from.len()..]);
            *raw = format!("{head}{new_value}{tail}");
            *value = new_value;
            changed += 1;
        }
        changed
    }

    /// Drop every entry whose key is in `keys`. Returns how many were removed.
    pub fn remove_keys(&mut self, keys: &[String]) -> usize {
        let before = self.lines.len();
        self.lines
            .retain(|line| !line.key().is_some_and(|k| keys.iter().any(|w| w == k)));
        before - self.lines.len()
    }

    /// True if any line, trimmed, equals `marker`.
    pub fn contains_line(&self, marker: &str) -> bool {
        self.lines.iter().any(|line| line.raw().trim() == marker)
    }

    /// Append raw text at the end of the document.
    ///
    /// `text` is glued to the serialized form, so a leading `\n` in `text`
    /// ends the current last line.
    pub fn append_text(&mut self, text: &str) {
        let joined = format!("{}{}", self.serialize(), text);
        *self = Self::parse(&joined);
    }
}
