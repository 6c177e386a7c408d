//! Submission mode and vendor metadata.
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Whether a submission is a test case or a real declaration.
///
/// - Test: the Datenteil addresses the ELSTER test tax office and the
///   transfer header carries the `Testmerker`.
/// - Production: addressed to the tax office derived from the tax number.
///
/// # Examples
/// ```rust
/// use std::str::FromStr;
/// use ustva_core::config::SubmissionMode;
///
/// let mode = SubmissionMode::from_str("test")?;
/// assert_eq!(mode, SubmissionMode::Test);
/// # Ok::<(), ustva_core::config::SubmissionModeParseError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionMode {
    Test,
    Production,
}

/// Error returned when parsing a [`SubmissionMode`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionModeParseError {
    #[error("invalid submission mode: {input}")]
    Invalid { input: String },
}

impl FromStr for SubmissionMode {
    type Err = SubmissionModeParseError;
    fn from_str(mode: &str) -> Result<SubmissionMode, SubmissionModeParseError> {
        match mode.to_ascii_lowercase().as_str() {
            "test" => Ok(SubmissionMode::Test),
            "production" => Ok(SubmissionMode::Production),
            _ => Err(SubmissionModeParseError::Invalid {
                input: mode.to_string(),
            }),
        }
    }
}

impl SubmissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionMode::Test => "test",
            SubmissionMode::Production => "production",
        }
    }

    pub fn is_test(&self) -> bool {
        matches!(self, SubmissionMode::Test)
    }
}

/// Software vendor data required in transfer and payload headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vendor {
    hersteller_id: String,
    product_name: String,
    product_version: String,
}

impl Vendor {
    pub fn new(
        hersteller_id: impl Into<String>,
        product_name: impl Into<String>,
        product_version: impl Into<String>,
    ) -> Self {
        Self {
            hersteller_id: hersteller_id.into(),
            product_name: product_name.into(),
            product_version: product_version.into(),
        }
    }

    /// Vendor id assigned by ELSTER.
    pub fn hersteller_id(&self) -> &str {
        &self.hersteller_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn product_version(&self) -> &str {
        &self.product_version
    }

    /// `VersionClient` value of the transfer header.
    pub fn client_version(&self) -> String {
        format!("{} {}", self.product_name, self.product_version)
    }
}

impl Default for Vendor {
    fn default() -> Self {
        Vendor::new("74931", "ustva-rs", env!("CARGO_PKG_VERSION"))
    }
}

/// Settings shared by serializer and envelope.
///
/// # Examples
/// ```rust
/// use ustva_core::config::{Config, SubmissionMode, Vendor};
///
/// let config = Config::new(SubmissionMode::Test, Vendor::default());
/// assert!(config.mode().is_test());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    mode: SubmissionMode,
    vendor: Vendor,
}

impl Config {
    pub fn new(mode: SubmissionMode, vendor: Vendor) -> Self {
        Self { mode, vendor }
    }

    pub fn mode(&self) -> SubmissionMode {
        self.mode
    }

    pub fn vendor(&self) -> &Vendor {
        &self.vendor
    }

    pub fn with_mode(mut self, mode: SubmissionMode) -> Self {
        self.mode = mode;
        self
    }
}

// test submissions unless the host opts into production
impl Default for Config {
    fn default() -> Self {
        Config {
            mode: SubmissionMode::Test,
            vendor: Vendor::default(),
        }
    }
}
