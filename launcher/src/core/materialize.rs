//! Rules that turn a template into a polling-mode configuration file.
//!
//! Pure string-in / string-out functions over [`EnvDocument`]; reading and
//! writing the files lives in `io::env_store`.

use serde::{Deserialize, Serialize};

use super::envfile::EnvDocument;

/// First line of the comment block appended after exposure keys are stripped.
/// Its presence is what makes `enforce_polling` idempotent.
pub const POLLING_MARKER: &str = "# Polling mode (no webhook)";

/// Appended to the document, starting with the newline that ends the
/// current last line.
pub const POLLING_NOTE: &str = "\n\n# Polling mode (no webhook)\n# WEBHOOK_URL is not set - the bot runs in polling mode for development\n";

/// Turn `key=from...` into `key=to...` when creating the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub key: String,
    pub from: String,
    pub to: String,
}

/// Everything the materializer needs to know about the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvRules {
    /// Keys that would switch the bot into webhook (publicly reachable) mode.
    pub exposure_keys: Vec<String>,
    /// Applied only when the file is created from the template.
    pub substitutions: Vec<Substitution>,
    /// Key that must be changed away from `secret_placeholder` before launch.
    pub secret_key: String,
    pub secret_placeholder: String,
}

impl Default for EnvRules {
    fn default() -> Self {
        Self {
            exposure_keys: vec!["WEBHOOK_URL".to_string(), "WEBHOOK_SECRET".to_string()],
            substitutions: vec![
                Substitution {
                    key: "WEBAPP_URL".to_string(),
                    from: "https://your-domain.com".to_string(),
                    to: "https://hachapurimariko.netlify.app".to_string(),
                },
                Substitution {
                    key: "NODE_ENV".to_string(),
                    from: "development".to_string(),
                    to: "production".to_string(),
                },
            ],
            secret_key: "BOT_TOKEN".to_string(),
            secret_placeholder: "your_bot_token_here".to_string(),
        }
    }
}

/// Build a fresh configuration file from template text.
///
/// Substitutions first, then exposure keys are removed, then the polling
/// note is appended unconditionally.
pub fn from_template(template: &str, rules: &EnvRules) -> String {
    let mut doc = EnvDocument::parse(template);
    for sub in &rules.substitutions {
        doc.replace_value_prefix(&sub.key, &sub.from, &sub.to);
    }
    doc.remove_keys(&rules.exposure_keys);
    doc.append_text(POLLING_NOTE);
    doc.serialize()
}

/// Rewritten file produced by [`enforce_polling`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enforced {
    pub contents: String,
    /// Exposure-key lines dropped.
    pub removed: usize,
}

/// Strip exposure keys from an existing file.
///
/// Returns `None` when there is nothing to strip, so a second pass over
/// its own output never changes anything.
pub fn enforce_polling(existing: &str, rules: &EnvRules) -> Option<Enforced> {
    let mut doc = EnvDocument::parse(existing);
    if !doc.contains_any_key(&rules.exposure_keys) {
        return None;
    }
    let removed = doc.remove_keys(&rules.exposure_keys);
    if !doc.contains_line(POLLING_MARKER) {
        doc.append_text(POLLING_NOTE);
    }
    Some(Enforced {
        contents: doc.serialize(),
        removed,
    })
}

/// State of the mandatory secret in a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretStatus {
    /// Set to something other than the placeholder.
    Configured,
    /// Still the template placeholder.
    Placeholder,
    /// Key present with an empty value.
    Empty,
    /// Key absent.
    Missing,
}

impl SecretStatus {
    /// Only the literal placeholder blocks the launch; the other non-configured
    /// states are reported as warnings.
    pub fn blocks_launch(self) -> bool {
        self == SecretStatus::Placeholder
    }
}

/// Judged on the last assignment of the key, the one the bot will load.
pub fn secret_status(contents: &str, rules: &EnvRules) -> SecretStatus {
    let doc = EnvDocument::parse(contents);
    match doc.get(&rules.secret_key).map(str::trim) {
        None => SecretStatus::Missing,
        Some("") => SecretStatus::Empty,
        Some(value) if value == rules.secret_placeholder => SecretStatus::Placeholder,
        Some(_) => SecretStatus::Configured,
    }
}
