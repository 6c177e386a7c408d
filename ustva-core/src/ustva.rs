//! UStVA domain types: submitter, declaration and field amounts.
mod calc;
pub mod envelope;
mod fields;
mod tax_number;
pub mod validation;
pub mod xml;

pub use calc::calculate_kz83;
pub use fields::{AmountFormat, FieldCode, FieldGroup, MAX_AMOUNT};
pub use tax_number::{FederalState, TaxNumber, TaxNumberError, TEST_TAX_OFFICE};
pub use validation::{validate, DeclarationField, ValidationError, ValidationIssue, ValidationKind};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ustva_derive::Validate;

type Result<T> = std::result::Result<T, DeclarationError>;

/// Errors raised while building or mutating a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("unknown field code: {input}")]
    UnknownFieldCode { input: String },
    #[error("malformed amount for {code}: '{input}'")]
    MalformedAmount { code: FieldCode, input: String },
    #[error("{code} only accepts whole euros, got {amount}")]
    FractionalAmount { code: FieldCode, amount: Decimal },
    #[error("{code} accepts at most two decimals, got {amount}")]
    ExcessPrecision { code: FieldCode, amount: Decimal },
    #[error("{code} amount {amount} is out of range")]
    AmountOutOfRange { code: FieldCode, amount: Decimal },
    #[error("invalid year {0}, expected four digits")]
    InvalidYear(i32),
    #[error("invalid period {0}, expected a month 1-12 or a quarter 41-44")]
    InvalidPeriod(u8),
    #[error("invalid submitter: {0}")]
    Submitter(#[from] SubmitterError),
}

/// Rejected submitter record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SubmitterError(String);

impl From<String> for SubmitterError {
    fn from(message: String) -> Self {
        SubmitterError(message)
    }
}

/// Data supplier ("Datenlieferant") of a submission.
///
/// `Submitter::new` is generated and rejects incomplete records.
///
/// # Examples
/// ```rust
/// use ustva_core::ustva::Submitter;
///
/// let submitter = Submitter::new(
///     "Erika Mustermann".into(),
///     "Heidestr. 17".into(),
///     "51147".into(),
///     "Köln".into(),
///     None,
///     None,
/// )?;
/// assert_eq!(submitter.summary(), "Erika Mustermann, Heidestr. 17, 51147 Köln");
/// # Ok::<(), ustva_core::ustva::SubmitterError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Validate)]
#[validate_error(SubmitterError)]
#[validate(non_empty, no_control_chars)]
pub struct Submitter {
    name: String,
    street: String,
    #[validate(postal_code)]
    postal_code: String,
    city: String,
    #[validate(no_control_chars)]
    phone: Option<String>,
    #[validate(email)]
    email: Option<String>,
}

impl Submitter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn street(&self) -> &str {
        &self.street
    }

    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    /// One-line form used in transfer and payload headers.
    pub fn summary(&self) -> String {
        format!(
            "{}, {}, {} {}",
            self.name.trim(),
            self.street.trim(),
            self.postal_code.trim(),
            self.city.trim()
        )
    }
}

/// Declaration period ("Zeitraum").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    Month(u8),
    Quarter(u8),
}

impl Period {
    /// Build from the form code: `1..=12` for months, `41..=44` for quarters.
    ///
    /// # Errors
    /// Returns [`DeclarationError::InvalidPeriod`] for any other value.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1..=12 => Ok(Period::Month(code)),
            41..=44 => Ok(Period::Quarter(code - 40)),
            _ => Err(DeclarationError::InvalidPeriod(code)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Period::Month(month) => month,
            Period::Quarter(quarter) => 40 + quarter,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.code())
    }
}

/// A UStVA declaration for one period.
///
/// Year, period and submitter are fixed at construction. Jurisdiction, tax
/// number and field amounts stay mutable until the caller hands the
/// declaration to the validator, serializer or envelope, which always read
/// the current state.
///
/// # Examples
/// ```rust
/// use rust_decimal::Decimal;
/// use ustva_core::ustva::{calculate_kz83, Declaration, FieldCode, Submitter};
///
/// let submitter = Submitter::new(
///     "Erika Mustermann".into(),
///     "Heidestr. 17".into(),
///     "51147".into(),
///     "Köln".into(),
///     None,
///     None,
/// )?;
/// let mut ustva = Declaration::new(submitter, 2012, 1)?;
/// ustva.set(FieldCode::Kz81, Decimal::from(10_000))?;
/// assert_eq!(calculate_kz83(&ustva), Decimal::from(1_900));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Declaration {
    submitter: Submitter,
    year: u16,
    period: Period,
    land: Option<u8>,
    steuernummer: Option<String>,
    fields: BTreeMap<FieldCode, Decimal>,
}

impl Declaration {
    /// # Errors
    /// Returns an error if the year is not four digits or the period code is
    /// neither a month nor a quarter.
    pub fn new(submitter: Submitter, year: i32, period: u8) -> Result<Self> {
        let year = u16::try_from(year)
            .ok()
            .filter(|y| (1000..=9999).contains(y))
            .ok_or(DeclarationError::InvalidYear(year))?;
        Ok(Self {
            submitter,
            year,
            period: Period::from_code(period)?,
            land: None,
            steuernummer: None,
            fields: BTreeMap::new(),
        })
    }

    pub fn submitter(&self) -> &Submitter {
        &self.submitter
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn period(&self) -> Period {
        self.period
    }

    /// Raw federal state code as entered; checked by [`validate`].
    pub fn land(&self) -> Option<u8> {
        self.land
    }

    pub fn set_land(&mut self, land: u8) {
        self.land = Some(land);
    }

    /// Raw tax number as printed on the taxpayer's documents.
    pub fn steuernummer(&self) -> Option<&str> {
        self.steuernummer.as_deref()
    }

    pub fn set_steuernummer(&mut self, steuernummer: impl Into<String>) {
        self.steuernummer = Some(steuernummer.into());
    }

    /// Tax number in ELSTER form, resolved from the current land and tax number.
    ///
    /// # Errors
    /// Returns a [`TaxNumberError`] if either part is missing or invalid.
    pub fn tax_number(&self) -> std::result::Result<TaxNumber, TaxNumberError> {
        tax_number::resolve(self.land, self.steuernummer.as_deref())
    }

    pub fn get(&self, code: FieldCode) -> Option<Decimal> {
        self.fields.get(&code).copied()
    }

    /// Set the amount of a field, replacing any previous value.
    ///
    /// # Errors
    /// Returns [`DeclarationError::FractionalAmount`] if the field is kept in
    /// whole euros and `amount` has cents, [`DeclarationError::ExcessPrecision`]
    /// for sub-cent amounts and [`DeclarationError::AmountOutOfRange`] once
    /// `|amount|` reaches 10^15.
    pub fn set(&mut self, code: FieldCode, amount: Decimal) -> Result<()> {
        code.check_amount(amount)?;
        self.fields.insert(code, amount);
        Ok(())
    }

    /// Set a field addressed by its textual code, e.g. `"kz81"`.
    ///
    /// # Errors
    /// Unknown codes are rejected with [`DeclarationError::UnknownFieldCode`].
    pub fn set_by_code(&mut self, code: &str, amount: Decimal) -> Result<()> {
        let code = FieldCode::from_str(code)?;
        self.set(code, amount)
    }

    /// Set a field from a decimal string such as `"1234.56"`.
    ///
    /// # Errors
    /// Returns [`DeclarationError::MalformedAmount`] if `amount` is not a
    /// plain decimal number.
    pub fn set_str(&mut self, code: FieldCode, amount: &str) -> Result<()> {
        let parsed = parse_amount(amount).ok_or_else(|| DeclarationError::MalformedAmount {
            code,
            input: amount.to_string(),
        })?;
        self.set(code, parsed)
    }

    pub fn remove(&mut self, code: FieldCode) -> Option<Decimal> {
        self.fields.remove(&code)
    }

    /// Present fields in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (FieldCode, Decimal)> + '_ {
        self.fields.iter().map(|(code, amount)| (*code, *amount))
    }
}

fn parse_amount(input: &str) -> Option<Decimal> {
    let trimmed = input.trim();
    let unsigned = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let mut parts = unsigned.splitn(2, '.');
    let integral = parts.next()?;
    let fraction = parts.next();
    let digits_only = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits_only(integral) || !fraction.map_or(true, digits_only) {
        return None;
    }
    Decimal::from_str_exact(trimmed).ok()
}
