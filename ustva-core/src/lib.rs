//! Rust toolkit for German VAT advance returns (UStVA): tax computation,
//! validation, canonical ELSTER XML and certificate-backed signing.
//!
//! # Examples
//! ```rust
//! use ustva_core::config::{Config, SubmissionMode};
//!
//! let config = Config::default().with_mode(SubmissionMode::Test);
//! # let _ = config;
//! ```
pub mod config;
pub mod signer;
pub mod ustva;

use thiserror::Error;

/// Top-level error wrapper for core operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Declaration(#[from] ustva::DeclarationError),
    #[error(transparent)]
    Validation(#[from] ustva::ValidationError),
    #[error(transparent)]
    TaxNumber(#[from] ustva::TaxNumberError),
    #[error(transparent)]
    Xml(#[from] ustva::xml::XmlError),
    #[error(transparent)]
    Envelope(#[from] ustva::envelope::EnvelopeError),
    #[error(transparent)]
    KeyLoad(#[from] signer::KeyLoadError),
    #[error(transparent)]
    Signing(#[from] signer::SigningError),
    #[error(transparent)]
    SubmissionMode(#[from] config::SubmissionModeParseError),
}

#[cfg(test)]
mod tests {
    use super::Error;
    use crate::config::SubmissionModeParseError;
    use crate::signer::{KeyLoadError, SigningError};
    use crate::ustva::envelope::EnvelopeError;
    use crate::ustva::xml::XmlError;
    use crate::ustva::{
        DeclarationError, DeclarationField, TaxNumberError, ValidationError, ValidationIssue,
        ValidationKind,
    };
    use quick_xml::se::SeError;

    #[test]
    fn error_conversions_cover_variants() {
        let err: Error = DeclarationError::InvalidPeriod(13).into();
        assert!(matches!(err, Error::Declaration(_)));

        let err: Error = ValidationError::new(vec![ValidationIssue {
            field: DeclarationField::Kz83,
            kind: ValidationKind::Missing,
        }])
        .into();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(err.to_string(), "declaration validation failed: kz83");

        let err: Error = TaxNumberError::MissingTaxNumber.into();
        assert!(matches!(err, Error::TaxNumber(_)));

        let xml_err = XmlError::Serialize {
            source: SeError::Custom("xml".into()),
        };
        let err: Error = xml_err.into();
        assert!(matches!(err, Error::Xml(_)));

        let err: Error = EnvelopeError::Write("io".into()).into();
        assert!(matches!(err, Error::Envelope(_)));

        let err: Error = KeyLoadError::BadPassphrase.into();
        assert!(matches!(err, Error::KeyLoad(_)));

        let err: Error = SigningError::Verification.into();
        assert!(matches!(err, Error::Signing(_)));

        let err: Error = SubmissionModeParseError::Invalid {
            input: "sandbox".into(),
        }
        .into();
        assert!(matches!(err, Error::SubmissionMode(_)));
    }
}
