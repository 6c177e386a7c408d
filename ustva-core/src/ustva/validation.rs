//! Business validation of a declaration before submission.
use rust_decimal::Decimal;
use thiserror::Error;

use super::tax_number::{FederalState, TaxNumber};
use super::{calculate_kz83, Declaration, FieldCode};

/// Declaration fields checked by [`validate`], in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeclarationField {
    Land,
    Steuernummer,
    Kz83,
}

impl DeclarationField {
    pub fn as_str(self) -> &'static str {
        match self {
            DeclarationField::Land => "land",
            DeclarationField::Steuernummer => "steuernummer",
            DeclarationField::Kz83 => "kz83",
        }
    }
}

/// Classification of validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Missing,
    InvalidFormat,
    Mismatch,
}

/// Single validation issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: DeclarationField,
    pub kind: ValidationKind,
}

/// Failed checks, always in the order land, steuernummer, kz83.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("declaration validation failed: {}", join_fields(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    pub fn fields(&self) -> Vec<DeclarationField> {
        self.issues.iter().map(|issue| issue.field).collect()
    }

    /// Names of the invalid fields as shown to the user.
    pub fn field_names(&self) -> Vec<&'static str> {
        self.issues.iter().map(|issue| issue.field.as_str()).collect()
    }
}

fn join_fields(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| issue.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Largest drift between declared and computed Kz83 that is still accepted
/// (exclusive).
const KZ83_TOLERANCE: Decimal = Decimal::ONE;

/// Validate jurisdiction, tax number and declared total.
///
/// Pure function of the current state. Submitter completeness is enforced
/// when the [`Submitter`](super::Submitter) is constructed and is not
/// rechecked here.
///
/// # Errors
/// Returns a [`ValidationError`] listing every failed check.
pub fn validate(declaration: &Declaration) -> Result<(), ValidationError> {
    let mut issues = Vec::new();

    let state = match declaration.land() {
        None => {
            issues.push(ValidationIssue {
                field: DeclarationField::Land,
                kind: ValidationKind::Missing,
            });
            None
        }
        Some(code) => match FederalState::try_from(code) {
            Ok(state) => Some(state),
            Err(_) => {
                issues.push(ValidationIssue {
                    field: DeclarationField::Land,
                    kind: ValidationKind::InvalidFormat,
                });
                None
            }
        },
    };

    match declaration.steuernummer().filter(|s| !s.trim().is_empty()) {
        None => issues.push(ValidationIssue {
            field: DeclarationField::Steuernummer,
            kind: ValidationKind::Missing,
        }),
        Some(raw) => {
            let valid = state.is_some_and(|state| TaxNumber::parse(state, raw).is_ok());
            if !valid {
                issues.push(ValidationIssue {
                    field: DeclarationField::Steuernummer,
                    kind: ValidationKind::InvalidFormat,
                });
            }
        }
    }

    match declaration.get(FieldCode::Kz83) {
        None => issues.push(ValidationIssue {
            field: DeclarationField::Kz83,
            kind: ValidationKind::Missing,
        }),
        Some(declared) => {
            let drift = (declared - calculate_kz83(declaration)).abs();
            if drift >= KZ83_TOLERANCE {
                issues.push(ValidationIssue {
                    field: DeclarationField::Kz83,
                    kind: ValidationKind::Mismatch,
                });
            }
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::new(issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ustva::Submitter;
    use rust_decimal_macros::dec;

    fn declaration() -> Declaration {
        let submitter = Submitter::new(
            "Steuer Sklave".into(),
            "Finstere Gasse 23".into(),
            "12345".into(),
            "Sklavengrube".into(),
            None,
            None,
        )
        .expect("valid submitter");
        Declaration::new(submitter, 2012, 1).expect("valid declaration")
    }

    #[test]
    fn unknown_land_invalidates_tax_number_too() {
        let mut ustva = declaration();
        ustva.set_land(17);
        ustva.set_steuernummer("203/698/02950");
        ustva.set(FieldCode::Kz83, dec!(0)).unwrap();

        let err = validate(&ustva).unwrap_err();
        assert_eq!(
            err.issues,
            vec![
                ValidationIssue {
                    field: DeclarationField::Land,
                    kind: ValidationKind::InvalidFormat,
                },
                ValidationIssue {
                    field: DeclarationField::Steuernummer,
                    kind: ValidationKind::InvalidFormat,
                },
            ]
        );
    }

    #[test]
    fn tax_number_layout_depends_on_land() {
        let mut ustva = declaration();
        ustva.set_land(FederalState::NordrheinWestfalen.code());
        ustva.set_steuernummer("203/698/02950");
        ustva.set(FieldCode::Kz83, dec!(0)).unwrap();
        assert_eq!(validate(&ustva).unwrap_err().field_names(), ["steuernummer"]);

        ustva.set_land(FederalState::Bayern.code());
        assert_eq!(validate(&ustva), Ok(()));
    }

    #[test]
    fn kz83_mismatch_is_reported_as_mismatch() {
        let mut ustva = declaration();
        ustva.set_land(2);
        ustva.set_steuernummer("203/698/02950");
        ustva.set(FieldCode::Kz81, dec!(1000)).unwrap();
        ustva.set(FieldCode::Kz83, dec!(189.01)).unwrap();
        assert_eq!(validate(&ustva), Ok(()));

        ustva.set(FieldCode::Kz83, dec!(189)).unwrap();
        let err = validate(&ustva).unwrap_err();
        assert_eq!(err.issues[0].kind, ValidationKind::Mismatch);
        assert_eq!(err.to_string(), "declaration validation failed: kz83");
    }
}
