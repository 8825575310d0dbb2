//! Device status reporting for Bulgarian fiscal printers.
//!
//! Provides [`DeviceStatus`], the value every driver operation returns, and
//! [`StatusMessage`] / [`Severity`] for the entries it holds. Standardized
//! codes live in the [`codes`] module; [`explain`] gives their long text.

#![warn(missing_docs)]

/// Standardized status code constants.
pub mod codes;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// ── Severity ────────────────────────────────────────────────────────────

/// Severity bucket of a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Severity {
    /// The operation failed or the device cannot continue.
    Error,
    /// The device works but needs attention soon.
    Warning,
    /// Informational note, including step annotations.
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

// ── StatusMessage ───────────────────────────────────────────────────────

/// One entry of a [`DeviceStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Severity bucket.
    #[serde(rename = "type")]
    pub severity: Severity,
    /// Standardized code (e.g. `"E301"`), absent for plain notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<Cow<'static, str>>,
    /// Human-readable text.
    pub text: String,
}

impl StatusMessage {
    /// Create a message with the given fields.
    pub fn new(
        severity: Severity,
        code: Option<impl Into<Cow<'static, str>>>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            code: code.map(Into::into),
            text: text.into(),
        }
    }

    /// Shorthand for a coded `Error` message.
    pub fn error(code: impl Into<Cow<'static, str>>, text: impl Into<String>) -> Self {
        Self::new(Severity::Error, Some(code), text)
    }

    /// Shorthand for a coded `Warning` message.
    pub fn warning(code: impl Into<Cow<'static, str>>, text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, Some(code), text)
    }

    /// Shorthand for an uncoded `Info` message.
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            code: None,
            text: text.into(),
        }
    }

    /// Returns the long explanation for this message's code, if known.
    pub fn explain(&self) -> Option<&'static str> {
        self.code.as_deref().and_then(explain)
    }
}

impl std::fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}[{}]: {}", self.severity, code, self.text),
            None => write!(f, "{}: {}", self.severity, self.text),
        }
    }
}

// ── DeviceStatus ────────────────────────────────────────────────────────

/// Outcome of a device operation: ordered infos, warnings and errors.
///
/// A status is `Ok` iff it holds no errors. Multi-step operations combine
/// the statuses of their steps with [`DeviceStatus::merge`] and annotate
/// failures with [`DeviceStatus::with_info`].
///
/// Serialized as `{"ok": bool, "messages": [...]}` with infos first, then
/// warnings, then errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "StatusWire", from = "StatusWire")]
pub struct DeviceStatus {
    statuses: Vec<StatusMessage>,
    warnings: Vec<StatusMessage>,
    errors: Vec<StatusMessage>,
}

impl DeviceStatus {
    /// An empty (Ok) status.
    pub fn new() -> Self {
        Self::default()
    }

    /// A status holding a single coded error.
    pub fn from_error(code: impl Into<Cow<'static, str>>, text: impl Into<String>) -> Self {
        Self::new().with_error(code, text)
    }

    /// `true` when no error has been recorded.
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Informational entries, in insertion order.
    pub fn statuses(&self) -> &[StatusMessage] {
        &self.statuses
    }

    /// Warning entries, in insertion order.
    pub fn warnings(&self) -> &[StatusMessage] {
        &self.warnings
    }

    /// Error entries, in insertion order.
    pub fn errors(&self) -> &[StatusMessage] {
        &self.errors
    }

    /// The first recorded error, if any.
    pub fn first_error(&self) -> Option<&StatusMessage> {
        self.errors.first()
    }

    /// `true` if any entry (of any severity) carries `code`.
    pub fn has_code(&self, code: &str) -> bool {
        self.messages().any(|m| m.code.as_deref() == Some(code))
    }

    /// All entries: infos, then warnings, then errors.
    pub fn messages(&self) -> impl Iterator<Item = &StatusMessage> {
        self.statuses
            .iter()
            .chain(self.warnings.iter())
            .chain(self.errors.iter())
    }

    /// Append a message to the bucket matching its severity.
    pub fn push(&mut self, message: StatusMessage) {
        match message.severity {
            Severity::Error => self.errors.push(message),
            Severity::Warning => self.warnings.push(message),
            Severity::Info => self.statuses.push(message),
        }
    }

    /// Add a coded error (builder pattern).
    pub fn with_error(
        mut self,
        code: impl Into<Cow<'static, str>>,
        text: impl Into<String>,
    ) -> Self {
        self.push(StatusMessage::error(code, text));
        self
    }

    /// Add a coded warning (builder pattern).
    pub fn with_warning(
        mut self,
        code: impl Into<Cow<'static, str>>,
        text: impl Into<String>,
    ) -> Self {
        self.push(StatusMessage::warning(code, text));
        self
    }

    /// Add an uncoded informational note (builder pattern).
    pub fn with_info(mut self, text: impl Into<String>) -> Self {
        self.push(StatusMessage::info(text));
        self
    }

    /// Append every entry of `other` after the entries of `self`.
    pub fn merge(mut self, other: DeviceStatus) -> Self {
        self.statuses.extend(other.statuses);
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
        self
    }
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_ok() {
            write!(f, "ok")?;
        } else {
            write!(f, "failed")?;
        }
        for message in self.messages() {
            write!(f, "\n  {message}")?;
        }
        Ok(())
    }
}

impl FromIterator<StatusMessage> for DeviceStatus {
    fn from_iter<I: IntoIterator<Item = StatusMessage>>(iter: I) -> Self {
        let mut status = DeviceStatus::new();
        for message in iter {
            status.push(message);
        }
        status
    }
}

#[derive(Serialize, Deserialize)]
struct StatusWire {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    messages: Vec<StatusMessage>,
}

impl From<DeviceStatus> for StatusWire {
    fn from(status: DeviceStatus) -> Self {
        let ok = status.is_ok();
        let mut messages = status.statuses;
        messages.extend(status.warnings);
        messages.extend(status.errors);
        Self { ok, messages }
    }
}

impl From<StatusWire> for DeviceStatus {
    fn from(wire: StatusWire) -> Self {
        wire.messages.into_iter().collect()
    }
}

// ── Explanations ────────────────────────────────────────────────────────

/// Returns the human-readable explanation for a standardized code, if known.
pub fn explain(code: &str) -> Option<&'static str> {
    let text = match code {
        codes::COMMUNICATION_ERROR => {
            "The transport failed while exchanging bytes with the device (connection reset, port error)."
        }
        codes::TRANSPORT_TIMEOUT => "The serial port or socket timed out during a read or write.",
        codes::CLOCK_NOT_SET => "The device clock is not set. Set the date and time before printing.",
        codes::RAM_RESET => "The device RAM was reset; daily registers may be lost.",
        codes::BUSY_WITH_ANOTHER_CONNECTION => {
            "The device is currently serving another connection and refused this one."
        }
        codes::NOT_FISCAL_DEVICE => {
            "The peer answered with a zero byte: it is not a fiscal device or the baud rate does not match."
        }
        codes::INVALID_RESPONSE => {
            "The response frame was malformed or its checksum did not match the payload."
        }
        codes::NO_RESPONSE => "The device did not answer after all write and read retries.",
        codes::USER_TIMEOUT => {
            "The caller-supplied deadline expired before the request was sent to the device."
        }
        codes::GENERAL_DEVICE_ERROR => "The device reported a general error.",
        codes::FM_FULL => "The fiscal memory is full; the device must be serviced.",
        codes::FM_WRITE_ERROR => "Writing to the fiscal memory failed.",
        codes::FM_READ_ONLY => "The fiscal memory is in read-only mode.",
        codes::FM_MISSING => "The fiscal memory module is missing or not detected.",
        codes::EJ_FULL => "The electronic journal is full.",
        codes::EJ_ERROR => "The electronic journal or SD card reported an error.",
        codes::FM_GENERAL_ERROR => "The fiscal memory reported a general error.",
        codes::OUT_OF_PAPER => "The printer is out of paper.",
        codes::COVER_OPEN => "The printer cover is open.",
        codes::PRINTING_MECHANISM => "The printing mechanism failed.",
        codes::OVERHEATED => "The print head overheated.",
        codes::MISSING_DISPLAY => "The external customer display is missing.",
        codes::SYNTAX_ERROR => "The device rejected the command data as a syntax error.",
        codes::INVALID_COMMAND => "The device does not know the command code.",
        codes::TOTAL_MISMATCH => "The sum of the payments does not match the total of the items.",
        codes::COMMAND_NOT_ALLOWED => "The command is not allowed in the current device state.",
        codes::OVERFLOW => "An amount overflowed the device registers.",
        codes::UNSUPPORTED_PAYMENT_TYPE => "The payment type has no code on this device.",
        codes::INVALID_UNIQUE_SALE_NUMBER => {
            "The unique sale number must match XXXXXXXX-XXXX-NNNNNNN (uppercase letters and digits)."
        }
        codes::INVALID_ITEM => "An item has a missing text, quantity, price or tax group.",
        codes::DEVICE_ERROR_CODE => {
            "The device reported a numeric error code; look it up in the device manual."
        }
        codes::INVALID_AMOUNT => "An amount is zero, negative or otherwise out of range.",
        codes::UNSUPPORTED_TAX_GROUP => "The tax group has no code on this device.",
        codes::INVALID_REVERSAL => {
            "The reversal receipt is missing the original receipt number, date or fiscal memory serial number."
        }
        codes::WRONG_PASSWORD => "The operator password was rejected.",
        codes::DAILY_REPORT_NOT_ZEROED => "A daily (Z) report must be printed first.",
        codes::INSUFFICIENT_CASH => "There is not enough cash in the drawer for the withdrawal.",
        codes::UNSUPPORTED_DEVICE => "No driver supports this device model or serial number.",
        codes::INVALID_CONFIG => "The driver configuration is invalid.",
        codes::FM_NEAR_FULL => "The fiscal memory is almost full.",
        codes::EJ_NEAR_FULL => "The electronic journal is almost full.",
        codes::NEAR_PAPER_END => "The paper roll is almost at its end.",
        _ => return None,
    };
    Some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Accumulation ────────────────────────────────────────────────────

    #[test]
    fn empty_status_is_ok() {
        let status = DeviceStatus::new();
        assert!(status.is_ok());
        assert_eq!(status.messages().count(), 0);
    }

    #[test]
    fn push_routes_by_severity() {
        let mut status = DeviceStatus::new();
        status.push(StatusMessage::info("fiscal receipt open"));
        status.push(StatusMessage::warning(codes::NEAR_PAPER_END, "near paper end"));
        status.push(StatusMessage::error(codes::OUT_OF_PAPER, "out of paper"));
        assert_eq!(status.statuses().len(), 1);
        assert_eq!(status.warnings().len(), 1);
        assert_eq!(status.errors().len(), 1);
        assert!(!status.is_ok());
        assert!(status.has_code("E301"));
        assert!(status.has_code("W301"));
    }

    #[test]
    fn warnings_alone_keep_status_ok() {
        let status = DeviceStatus::new().with_warning(codes::FM_NEAR_FULL, "FM near full");
        assert!(status.is_ok());
    }

    #[test]
    fn merge_preserves_order() {
        let a = DeviceStatus::from_error(codes::SYNTAX_ERROR, "first");
        let b = DeviceStatus::from_error(codes::OVERFLOW, "second").with_info("note");
        let merged = a.merge(b);
        let codes: Vec<_> = merged
            .errors()
            .iter()
            .map(|m| m.code.as_deref().unwrap())
            .collect();
        assert_eq!(codes, ["E401", "E405"]);
        assert_eq!(merged.first_error().unwrap().text, "first");
        assert_eq!(merged.statuses()[0].text, "note");
    }

    // ── Display ─────────────────────────────────────────────────────────

    #[test]
    fn message_display() {
        let m = StatusMessage::error(codes::OUT_OF_PAPER, "Out of paper");
        assert_eq!(m.to_string(), "error[E301]: Out of paper");
        assert_eq!(StatusMessage::info("note").to_string(), "info: note");
    }

    // ── Serde ───────────────────────────────────────────────────────────

    #[test]
    fn serializes_as_ok_and_messages() {
        let status = DeviceStatus::from_error(codes::OUT_OF_PAPER, "Out of paper")
            .with_info("Error occurred while opening new fiscal receipt");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["messages"][0]["type"], "info");
        assert!(json["messages"][0].get("code").is_none());
        assert_eq!(json["messages"][1]["type"], "error");
        assert_eq!(json["messages"][1]["code"], "E301");
    }

    #[test]
    fn deserializes_from_messages() {
        let json = r#"{"ok":true,"messages":[{"type":"warning","code":"W301","text":"near end"}]}"#;
        let status: DeviceStatus = serde_json::from_str(json).unwrap();
        assert!(status.is_ok());
        assert_eq!(status.warnings()[0].code.as_deref(), Some("W301"));
    }

    // ── explain() exhaustiveness ────────────────────────────────────────

    #[test]
    fn all_codes_have_explanations() {
        for code in codes::ALL {
            assert!(explain(code).is_some(), "missing explanation for {code}");
        }
    }

    #[test]
    fn catalog_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for code in codes::ALL {
            assert!(seen.insert(*code), "duplicate code {code}");
        }
    }

    #[test]
    fn explain_unknown() {
        assert!(explain("X999").is_none());
        assert!(StatusMessage::info("plain").explain().is_none());
    }
}
