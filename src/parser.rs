//! Field parser — pulls amount, time and sender out of a notification body.
//!
//! Parsing never fails. Fields that cannot be found are `None`, and the
//! preview is always populated, so an unrecognised format still produces
//! a record the caller can log.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum number of characters kept in [`PixTransaction::preview`].
pub const PREVIEW_CHARS: usize = 200;

/// `R$ 1.234,56` → `1.234,56`
static NUBANK_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"R\$\s*(\d+(?:[.,]\d+)*)").expect("valid amount pattern")
});

/// `26 DEZ às 17:02`
static NUBANK_TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d{1,2}\s+[a-z]{3}\s+às\s+\d{2}:\d{2}").expect("valid timestamp pattern")
});

/// `... pelo Pix de NAME` up to end of line.
static NUBANK_SENDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Pix de[ \t]+([^\r\n]+)").expect("valid sender pattern")
});

static DEFAULT_PARSER: LazyLock<FieldParser> = LazyLock::new(FieldParser::default_templates);

/// Structured fields of a Pix credit notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixTransaction {
    /// Amount exactly as written after the currency marker (e.g. `852,00`).
    pub amount: Option<String>,
    /// Free-form date/time as written (e.g. `26 DEZ às 17:02`).
    pub timestamp: Option<String>,
    /// Sender name, trimmed.
    pub sender: Option<String>,
    /// First [`PREVIEW_CHARS`] characters of the body.
    pub preview: String,
}

impl PixTransaction {
    /// Record with no recognised fields.
    pub fn unrecognized(body: &str) -> Self {
        Self {
            preview: preview(body),
            ..Default::default()
        }
    }

    /// Whether any structured field was found.
    pub fn is_recognized(&self) -> bool {
        self.amount.is_some() || self.timestamp.is_some() || self.sender.is_some()
    }

    /// Amount as a decimal, reading `.` as the thousands separator and
    /// `,` as the decimal separator.
    pub fn amount_value(&self) -> Option<Decimal> {
        let raw = self.amount.as_deref()?;
        let normalized = raw.replace('.', "").replace(',', ".");
        Decimal::from_str(&normalized).ok()
    }
}

/// Pattern set for one bank's notification layout.
///
/// Each pattern contributes capture group 1 when present, otherwise the
/// whole match.
#[derive(Debug, Clone)]
pub struct NotificationTemplate {
    pub name: String,
    amount: Regex,
    timestamp: Regex,
    sender: Regex,
}

impl NotificationTemplate {
    /// Build a template from raw patterns.
    pub fn new(
        name: impl Into<String>,
        amount: &str,
        timestamp: &str,
        sender: &str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name: name.into(),
            amount: Regex::new(amount)?,
            timestamp: Regex::new(timestamp)?,
            sender: Regex::new(sender)?,
        })
    }

    /// Nubank "Você recebeu uma transferência pelo Pix" layout.
    pub fn nubank() -> Self {
        Self {
            name: "nubank".into(),
            amount: NUBANK_AMOUNT.clone(),
            timestamp: NUBANK_TIMESTAMP.clone(),
            sender: NUBANK_SENDER.clone(),
        }
    }

    /// Apply every pattern independently to `body`.
    pub fn apply(&self, body: &str) -> PixTransaction {
        PixTransaction {
            amount: capture(&self.amount, body),
            timestamp: capture(&self.timestamp, body),
            sender: capture(&self.sender, body)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            preview: preview(body),
        }
    }
}

/// Ordered list of templates; the first one recognising any field wins.
#[derive(Debug, Clone)]
pub struct FieldParser {
    templates: Vec<NotificationTemplate>,
}

impl FieldParser {
    /// Parser with the built-in templates.
    pub fn default_templates() -> Self {
        Self::with_templates(vec![NotificationTemplate::nubank()])
    }

    pub fn with_templates(templates: Vec<NotificationTemplate>) -> Self {
        Self { templates }
    }

    /// Template names in priority order.
    pub fn template_names(&self) -> Vec<&str> {
        self.templates.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn parse(&self, body: &str) -> PixTransaction {
        self.templates
            .iter()
            .map(|t| t.apply(body))
            .find(PixTransaction::is_recognized)
            .unwrap_or_else(|| PixTransaction::unrecognized(body))
    }
}

impl Default for FieldParser {
    fn default() -> Self {
        Self::default_templates()
    }
}

/// Parse a body with the built-in templates.
pub fn parse_notification(body: &str) -> PixTransaction {
    DEFAULT_PARSER.parse(body)
}

fn capture(re: &Regex, body: &str) -> Option<String> {
    let caps = re.captures(body)?;
    caps.get(1)
        .or_else(|| caps.get(0))
        .map(|m| m.as_str().to_string())
}

fn preview(body: &str) -> String {
    body.chars().take(PREVIEW_CHARS).collect()
}
