use serde::{Deserialize, Serialize};
use std::fmt;

/// A single parameter attached to a [`Message`]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum MessageParam {
    Number(u64),
    Text(String),
    Message(Box<Message>),
}

impl From<&str> for MessageParam {
    fn from(value: &str) -> Self {
        MessageParam::Text(value.to_string())
    }
}

impl From<String> for MessageParam {
    fn from(value: String) -> Self {
        MessageParam::Text(value)
    }
}

impl From<u64> for MessageParam {
    fn from(value: u64) -> Self {
        MessageParam::Number(value)
    }
}

impl From<Message> for MessageParam {
    fn from(value: Message) -> Self {
        MessageParam::Message(Box::new(value))
    }
}

impl fmt::Display for MessageParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageParam::Number(n) => write!(f, "{}", n),
            MessageParam::Text(t) => write!(f, "{}", t),
            MessageParam::Message(m) => write!(f, "{}", m),
        }
    }
}

/// A user-facing message identified by key, rendered by the caller
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<MessageParam>,
}

impl Message {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter, builder style
    pub fn with_param(mut self, param: impl Into<MessageParam>) -> Self {
        self.params.push(param.into());
        self
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            return write!(f, "{}", self.key);
        }
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        write!(f, "{}({})", self.key, params.join(", "))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub severity: Severity,
    pub message: Message,
}

/// Composable result of a policy check.
///
/// `ok` only turns false through a fatal. Plain errors and warnings are
/// accumulated while the status stays ok, so callers can decide whether a
/// non-fatal complaint should block the action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusValue {
    ok: bool,
    value: Option<String>,
    entries: Vec<StatusEntry>,
}

impl Default for StatusValue {
    fn default() -> Self {
        Self::new_good()
    }
}

impl StatusValue {
    pub fn new_good() -> Self {
        Self {
            ok: true,
            value: None,
            entries: Vec::new(),
        }
    }

    /// Good status carrying a marker value such as `"ignored"`
    pub fn new_good_with(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::new_good()
        }
    }

    pub fn new_fatal(message: Message) -> Self {
        let mut status = Self::new_good();
        status.fatal(message);
        status
    }

    /// Record an error and mark the status as not ok
    pub fn fatal(&mut self, message: Message) {
        self.ok = false;
        self.push(Severity::Error, message);
    }

    /// Record an error without changing `ok`
    pub fn error(&mut self, message: Message) {
        self.push(Severity::Error, message);
    }

    pub fn warning(&mut self, message: Message) {
        self.push(Severity::Warning, message);
    }

    fn push(&mut self, severity: Severity, message: Message) {
        self.entries.push(StatusEntry { severity, message });
    }

    /// Fold another status into this one; nothing is dropped
    pub fn merge(&mut self, other: StatusValue) {
        self.ok = self.ok && other.ok;
        self.entries.extend(other.entries);
        if self.value.is_none() {
            self.value = other.value;
        }
    }

    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Ok and free of any error or warning
    pub fn is_good(&self) -> bool {
        self.ok && self.entries.is_empty()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn entries(&self) -> &[StatusEntry] {
        &self.entries
    }

    pub fn errors(&self) -> impl Iterator<Item = &Message> {
        self.entries
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .map(|e| &e.message)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Message> {
        self.entries
            .iter()
            .filter(|e| e.severity == Severity::Warning)
            .map(|e| &e.message)
    }

    pub fn has_message(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.message.key == key)
    }

    /// The message that best summarises this status: the first error,
    /// then the first warning.
    pub fn message(&self) -> Option<&Message> {
        self.errors().next().or_else(|| self.warnings().next())
    }
}

impl fmt::Display for StatusValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "{}", if self.ok { "good" } else { "fatal" });
        }
        let messages: Vec<String> = self.entries.iter().map(|e| e.message.to_string()).collect();
        write!(f, "{}", messages.join("; "))
    }
}
