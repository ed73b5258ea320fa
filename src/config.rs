//! Configuration types.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::mailbox::MailFilter;

/// Sender address the bank uses for Pix notifications.
pub const DEFAULT_SENDER_ADDRESS: &str = "todomundo@nubank.com.br";

/// Default Gmail REST root for the authenticated user.
pub const DEFAULT_GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// Ledger path value that selects the in-process ledger.
const MEMORY_LEDGER: &str = ":memory:";

/// Which mailbox variant feeds the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Built-in sample notification, no network.
    Fixture,
    /// Live Gmail mailbox.
    Gmail,
}

impl FromStr for SourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixture" | "mock" => Ok(Self::Fixture),
            "gmail" | "live" => Ok(Self::Gmail),
            other => Err(ConfigError::InvalidValue {
                key: "PIX_SOURCE".into(),
                message: format!("unknown source '{other}' (expected 'fixture' or 'gmail')"),
            }),
        }
    }
}

/// Gmail provider settings.
#[derive(Debug, Clone)]
pub struct GmailConfig {
    pub api_base: String,
    pub access_token: SecretString,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Pipeline configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct PixConfig {
    pub source: SourceKind,
    /// Address the notification emails come from.
    pub sender_address: String,
    /// Maximum candidates handled per run.
    pub batch_size: usize,
    /// libSQL ledger file. `None` keeps the ledger in memory.
    pub ledger_path: Option<PathBuf>,
    /// Optional JSON-lines file receiving parsed transactions.
    pub output_path: Option<PathBuf>,
    /// Interval between runs in watch mode.
    pub poll_interval: Duration,
    /// Present only when `source` is `Gmail`.
    pub gmail: Option<GmailConfig>,
}

impl Default for PixConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Fixture,
            sender_address: DEFAULT_SENDER_ADDRESS.to_string(),
            batch_size: 5,
            ledger_path: Some(PathBuf::from("./data/pix-ledger.db")),
            output_path: None,
            poll_interval: Duration::from_secs(300), // 5 minutes
            gmail: None,
        }
    }
}

impl PixConfig {
    /// Build config from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let source = match lookup("PIX_SOURCE") {
            Some(s) => s.parse()?,
            None => defaults.source,
        };

        let sender_address = lookup("PIX_SENDER_ADDRESS")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.sender_address);

        let batch_size = match lookup("PIX_BATCH_SIZE") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: "PIX_BATCH_SIZE".into(),
                        message: format!("expected a positive integer, got '{raw}'"),
                    });
                }
            },
            None => defaults.batch_size,
        };

        let ledger_path = match lookup("PIX_LEDGER_PATH") {
            Some(p) if p.trim() == MEMORY_LEDGER => None,
            Some(p) => Some(PathBuf::from(p.trim())),
            None => defaults.ledger_path,
        };

        let output_path = lookup("PIX_OUTPUT_PATH")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let poll_interval = parse_secs(&lookup, "PIX_POLL_INTERVAL_SECS")?
            .unwrap_or(defaults.poll_interval);

        let gmail = match source {
            SourceKind::Fixture => None,
            SourceKind::Gmail => {
                let token = lookup("GMAIL_ACCESS_TOKEN")
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| ConfigError::MissingEnvVar("GMAIL_ACCESS_TOKEN".into()))?;
                let api_base = lookup("GMAIL_API_BASE")
                    .unwrap_or_else(|| DEFAULT_GMAIL_API_BASE.to_string())
                    .trim_end_matches('/')
                    .to_string();
                let timeout = parse_secs(&lookup, "GMAIL_TIMEOUT_SECS")?
                    .unwrap_or(Duration::from_secs(30));
                Some(GmailConfig {
                    api_base,
                    access_token: SecretString::from(token),
                    timeout,
                })
            }
        };

        Ok(Self {
            source,
            sender_address,
            batch_size,
            ledger_path,
            output_path,
            poll_interval,
            gmail,
        })
    }

    /// Candidate filter: unread mail from the bank, capped to the batch size.
    pub fn filter(&self) -> MailFilter {
        MailFilter {
            sender: self.sender_address.clone(),
            unread_only: true,
            limit: self.batch_size,
        }
    }
}

fn parse_secs<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a positive number of seconds, got '{raw}'"),
        }),
    }
}
