//! Payer configuration.
//!
//! Loads configuration from a TOML file with support for environment variable
//! expansion in string values. Variables use `$VAR` or `${VAR}` syntax.
//! Configuration and storage handles are passed explicitly into each
//! component; nothing in this workspace reads a well-known global path.
//!
//! # Example Configuration
//!
//! ```toml
//! [spend]
//! max_transaction_amount = "10.0"
//! auto_approve_under = "0.1"
//! daily_limit = "50.0"
//!
//! [currency]
//! code = "USDC"
//! decimals = 6
//!
//! [storage]
//! ledger = "$HOME/.p402/ledger.json"
//! audit = "$HOME/.p402/audit.log"
//!
//! [transport]
//! timeout_secs = 8
//! ```
//!
//! Amounts are written as quoted strings so they parse as exact decimals.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors loading or validating configuration.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] Box<toml::de::Error>),

    /// A field value violates a constraint.
    #[error("invalid configuration: {field} {message}")]
    Invalid {
        /// The offending field.
        field: &'static str,
        /// Why the value was rejected.
        message: &'static str,
    },
}

/// Top-level payer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Spend-limit settings.
    pub spend: SpendConfig,

    /// Currency settings for signing math.
    #[serde(default)]
    pub currency: CurrencyConfig,

    /// Ledger and audit trail locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound call settings.
    #[serde(default)]
    pub transport: TransportConfig,
}

/// Hard spend limits and the auto-approval threshold.
///
/// No ordering is enforced between the three values; the auto-approve
/// threshold may exceed the per-transaction cap, and the hard checks still
/// apply independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendConfig {
    /// Maximum amount for a single payment. Must be positive.
    pub max_transaction_amount: Decimal,

    /// Amounts at or under this skip the approval prompt. Must be
    /// non-negative; zero disables auto-approval.
    pub auto_approve_under: Decimal,

    /// Maximum total successful spend in any trailing 24-hour window.
    /// Must be positive.
    pub daily_limit: Decimal,
}

impl Default for SpendConfig {
    fn default() -> Self {
        Self {
            max_transaction_amount: Decimal::new(10, 0),
            auto_approve_under: Decimal::new(1, 1),
            daily_limit: Decimal::new(50, 0),
        }
    }
}

/// The currency payments are denominated in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Currency code expected in challenges.
    pub code: String,

    /// Minor-unit decimals used when encoding the signed amount.
    pub decimals: u32,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            code: "USDC".to_owned(),
            decimals: 6,
        }
    }
}

/// Locations of the persisted ledger and audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Transaction ledger snapshot path.
    pub ledger: PathBuf,

    /// Audit trail path.
    pub audit: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            ledger: PathBuf::from("ledger.json"),
            audit: PathBuf::from("audit.log"),
        }
    }
}

/// Outbound call settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Timeout applied to every outbound request, in seconds. A bounded
    /// timeout is mandatory so a hung payment cannot block forever.
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { timeout_secs: 8 }
    }
}

impl Config {
    /// Loads and validates configuration from a TOML file.
    ///
    /// All `$VAR` / `${VAR}` references in the raw TOML are expanded from
    /// the process environment before parsing; unresolved variables are
    /// left as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if a value
    /// violates a constraint.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content);
        let config: Self = toml::from_str(&expanded).map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every constraint on the loaded values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.spend.max_transaction_amount <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "spend.max_transaction_amount",
                message: "must be positive",
            });
        }
        if self.spend.auto_approve_under < Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "spend.auto_approve_under",
                message: "must be non-negative",
            });
        }
        if self.spend.daily_limit <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                field: "spend.daily_limit",
                message: "must be positive",
            });
        }
        if self.currency.code.is_empty() {
            return Err(ConfigError::Invalid {
                field: "currency.code",
                message: "must not be empty",
            });
        }
        if self.currency.decimals > 28 {
            return Err(ConfigError::Invalid {
                field: "currency.decimals",
                message: "must be at most 28",
            });
        }
        if self.transport.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "transport.timeout_secs",
                message: "must be positive",
            });
        }
        Ok(())
    }
}

/// Expands `$VAR` and `${VAR}` patterns in a string from environment variables.
///
/// Unresolved variables are left as-is.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            let braced = chars.peek() == Some(&'{');
            if braced {
                chars.next(); // consume '{'
            }

            let mut var_name = String::new();
            while let Some(&c) = chars.peek() {
                if braced {
                    if c == '}' {
                        chars.next();
                        break;
                    }
                } else if !c.is_ascii_alphanumeric() && c != '_' {
                    break;
                }
                var_name.push(c);
                chars.next();
            }

            if var_name.is_empty() {
                result.push('$');
                if braced {
                    result.push('{');
                }
            } else if let Ok(val) = std::env::var(&var_name) {
                result.push_str(&val);
            } else {
                // Leave unresolved variable as-is
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&var_name);
                if braced {
                    result.push('}');
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_full_config() {
        let file = write_config(
            r#"
[spend]
max_transaction_amount = "10.0"
auto_approve_under = "0.1"
daily_limit = "50.0"

[currency]
code = "USDC"
decimals = 6

[storage]
ledger = "/tmp/ledger.json"
audit = "/tmp/audit.log"

[transport]
timeout_secs = 5
"#,
        );
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.spend.max_transaction_amount.to_string(), "10.0");
        assert_eq!(config.currency.decimals, 6);
        assert_eq!(config.transport.timeout_secs, 5);
    }

    #[test]
    fn sections_other_than_spend_have_defaults() {
        let file = write_config(
            r#"
[spend]
max_transaction_amount = "1"
auto_approve_under = "0"
daily_limit = "5"
"#,
        );
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.currency.code, "USDC");
        assert_eq!(config.storage.ledger, PathBuf::from("ledger.json"));
        assert_eq!(config.transport.timeout_secs, 8);
    }

    #[test]
    fn expands_environment_variables() {
        // SAFETY: test-local variable name, no concurrent reader cares.
        unsafe { std::env::set_var("P402_TEST_LEDGER_DIR", "/var/data") };
        let file = write_config(
            r#"
[spend]
max_transaction_amount = "1"
auto_approve_under = "0"
daily_limit = "5"

[storage]
ledger = "${P402_TEST_LEDGER_DIR}/ledger.json"
audit = "$P402_TEST_LEDGER_DIR/audit.log"
"#,
        );
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.storage.ledger, PathBuf::from("/var/data/ledger.json"));
        assert_eq!(config.storage.audit, PathBuf::from("/var/data/audit.log"));
    }

    #[test]
    fn unresolved_variables_are_left_alone() {
        assert_eq!(
            expand_env_vars("path = \"$P402_TEST_DOES_NOT_EXIST/x\""),
            "path = \"$P402_TEST_DOES_NOT_EXIST/x\""
        );
    }

    #[test]
    fn rejects_non_positive_limits() {
        let file = write_config(
            r#"
[spend]
max_transaction_amount = "0"
auto_approve_under = "0"
daily_limit = "5"
"#,
        );
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "spend.max_transaction_amount",
                ..
            }
        ));
    }

    #[test]
    fn rejects_negative_auto_approve() {
        let config = Config {
            spend: SpendConfig {
                auto_approve_under: Decimal::new(-1, 2),
                ..SpendConfig::default()
            },
            currency: CurrencyConfig::default(),
            storage: StorageConfig::default(),
            transport: TransportConfig::default(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Config::load_from("/nonexistent/p402.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
