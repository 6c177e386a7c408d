//! Federal states and their tax number formats.
//!
//! Each state prints tax numbers in its own grouped layout ("Steuernummer"),
//! while ELSTER expects the uniform 13-digit form whose first four digits
//! are the tax office number. Layouts are written as patterns where `F` is a
//! tax office digit, `B` a district digit, `U` a distinguishing digit, `P` the
//! check digit, literal digits must appear as-is and `/` marks a segment
//! separator (`/` or a single space in the input).
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Tax office number ELSTER reserves for test submissions.
pub const TEST_TAX_OFFICE: &str = "9198";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxNumberError {
    #[error("invalid federal state code: {0}")]
    InvalidState(u8),
    #[error("federal state is not set")]
    MissingState,
    #[error("tax number is not set")]
    MissingTaxNumber,
    #[error("tax number '{input}' does not match the layout {layout} of {state}")]
    InvalidFormat {
        input: String,
        state: FederalState,
        layout: &'static str,
    },
}

/// German federal state ("Bundesland"), numbered alphabetically from 1.
///
/// # Examples
/// ```rust
/// use ustva_core::ustva::FederalState;
///
/// let state = FederalState::try_from(2)?;
/// assert_eq!(state, FederalState::Bayern);
/// assert_eq!(state.code(), 2);
/// # Ok::<(), ustva_core::ustva::TaxNumberError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FederalState {
    BadenWuerttemberg,
    Bayern,
    Berlin,
    Brandenburg,
    Bremen,
    Hamburg,
    Hessen,
    MecklenburgVorpommern,
    Niedersachsen,
    NordrheinWestfalen,
    RheinlandPfalz,
    Saarland,
    Sachsen,
    SachsenAnhalt,
    SchleswigHolstein,
    Thueringen,
}

impl FederalState {
    pub const ALL: [FederalState; 16] = [
        FederalState::BadenWuerttemberg,
        FederalState::Bayern,
        FederalState::Berlin,
        FederalState::Brandenburg,
        FederalState::Bremen,
        FederalState::Hamburg,
        FederalState::Hessen,
        FederalState::MecklenburgVorpommern,
        FederalState::Niedersachsen,
        FederalState::NordrheinWestfalen,
        FederalState::RheinlandPfalz,
        FederalState::Saarland,
        FederalState::Sachsen,
        FederalState::SachsenAnhalt,
        FederalState::SchleswigHolstein,
        FederalState::Thueringen,
    ];

    pub fn code(self) -> u8 {
        match self {
            FederalState::BadenWuerttemberg => 1,
            FederalState::Bayern => 2,
            FederalState::Berlin => 3,
            FederalState::Brandenburg => 4,
            FederalState::Bremen => 5,
            FederalState::Hamburg => 6,
            FederalState::Hessen => 7,
            FederalState::MecklenburgVorpommern => 8,
            FederalState::Niedersachsen => 9,
            FederalState::NordrheinWestfalen => 10,
            FederalState::RheinlandPfalz => 11,
            FederalState::Saarland => 12,
            FederalState::Sachsen => 13,
            FederalState::SachsenAnhalt => 14,
            FederalState::SchleswigHolstein => 15,
            FederalState::Thueringen => 16,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FederalState::BadenWuerttemberg => "Baden-Württemberg",
            FederalState::Bayern => "Bayern",
            FederalState::Berlin => "Berlin",
            FederalState::Brandenburg => "Brandenburg",
            FederalState::Bremen => "Bremen",
            FederalState::Hamburg => "Hamburg",
            FederalState::Hessen => "Hessen",
            FederalState::MecklenburgVorpommern => "Mecklenburg-Vorpommern",
            FederalState::Niedersachsen => "Niedersachsen",
            FederalState::NordrheinWestfalen => "Nordrhein-Westfalen",
            FederalState::RheinlandPfalz => "Rheinland-Pfalz",
            FederalState::Saarland => "Saarland",
            FederalState::Sachsen => "Sachsen",
            FederalState::SachsenAnhalt => "Sachsen-Anhalt",
            FederalState::SchleswigHolstein => "Schleswig-Holstein",
            FederalState::Thueringen => "Thüringen",
        }
    }

    /// Printed layout of a tax number in this state.
    pub fn local_layout(self) -> &'static str {
        self.layouts().0
    }

    /// (local layout, 13-digit ELSTER layout)
    fn layouts(self) -> (&'static str, &'static str) {
        match self {
            FederalState::BadenWuerttemberg => ("FF/BBB/UUUUP", "28FF0BBBUUUUP"),
            FederalState::Bayern => ("FFF/BBB/UUUUP", "9FFF0BBBUUUUP"),
            FederalState::Berlin => ("FF/BBB/UUUUP", "11FF0BBBUUUUP"),
            FederalState::Brandenburg => ("0FF/BBB/UUUUP", "30FF0BBBUUUUP"),
            FederalState::Bremen => ("FF/BBB/UUUUP", "24FF0BBBUUUUP"),
            FederalState::Hamburg => ("FF/BBB/UUUUP", "22FF0BBBUUUUP"),
            FederalState::Hessen => ("0FF/BBB/UUUUP", "26FF0BBBUUUUP"),
            FederalState::MecklenburgVorpommern => ("0FF/BBB/UUUUP", "40FF0BBBUUUUP"),
            FederalState::Niedersachsen => ("FF/BBB/UUUUP", "23FF0BBBUUUUP"),
            FederalState::NordrheinWestfalen => ("FFF/BBBB/UUUP", "5FFF0BBBBUUUP"),
            FederalState::RheinlandPfalz => ("FF/BBB/UUUU/P", "27FF0BBBUUUUP"),
            FederalState::Saarland => ("0FF/BBB/UUUUP", "10FF0BBBUUUUP"),
            FederalState::Sachsen => ("2FF/BBB/UUUUP", "32FF0BBBUUUUP"),
            FederalState::SachsenAnhalt => ("1FF/BBB/UUUUP", "31FF0BBBUUUUP"),
            FederalState::SchleswigHolstein => ("FF/BBB/UUUUP", "21FF0BBBUUUUP"),
            FederalState::Thueringen => ("1FF/BBB/UUUUP", "41FF0BBBUUUUP"),
        }
    }
}

impl TryFrom<u8> for FederalState {
    type Error = TaxNumberError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        FederalState::ALL
            .into_iter()
            .find(|state| state.code() == code)
            .ok_or(TaxNumberError::InvalidState(code))
    }
}

impl fmt::Display for FederalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tax number that matched its state's layout, held in ELSTER form.
///
/// # Examples
/// ```rust
/// use ustva_core::ustva::{FederalState, TaxNumber};
///
/// let number = TaxNumber::parse(FederalState::Bayern, "203/698/02950")?;
/// assert_eq!(number.elster(), "9203069802950");
/// assert_eq!(number.tax_office(), "9203");
/// # Ok::<(), ustva_core::ustva::TaxNumberError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxNumber {
    state: FederalState,
    elster: String,
}

impl TaxNumber {
    /// Parse a printed tax number in the layout of `state`.
    ///
    /// # Errors
    /// Returns [`TaxNumberError::InvalidFormat`] if the input does not match
    /// the state's layout.
    pub fn parse(state: FederalState, input: &str) -> Result<Self, TaxNumberError> {
        let (local, elster) = state.layouts();
        let invalid = || TaxNumberError::InvalidFormat {
            input: input.to_string(),
            state,
            layout: local,
        };

        let digits = match_layout(local, input.trim()).ok_or_else(invalid)?;
        let elster = fill_layout(elster, &digits).ok_or_else(invalid)?;
        Ok(TaxNumber { state, elster })
    }

    pub fn state(&self) -> FederalState {
        self.state
    }

    /// 13-digit ELSTER form.
    pub fn elster(&self) -> &str {
        &self.elster
    }

    /// Four-digit number of the responsible tax office.
    pub fn tax_office(&self) -> &str {
        &self.elster[..4]
    }
}

impl fmt::Display for TaxNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.elster)
    }
}

/// Resolve the optional raw state code and tax number of a declaration.
pub(crate) fn resolve(land: Option<u8>, raw: Option<&str>) -> Result<TaxNumber, TaxNumberError> {
    let state = FederalState::try_from(land.ok_or(TaxNumberError::MissingState)?)?;
    let raw = raw
        .filter(|s| !s.trim().is_empty())
        .ok_or(TaxNumberError::MissingTaxNumber)?;
    TaxNumber::parse(state, raw)
}

/// Digits captured per placeholder class, in input order.
#[derive(Default)]
struct Captured {
    office: Vec<char>,
    district: Vec<char>,
    distinguishing: Vec<char>,
    check: Vec<char>,
}

impl Captured {
    fn class_mut(&mut self, placeholder: char) -> Option<&mut Vec<char>> {
        match placeholder {
            'F' => Some(&mut self.office),
            'B' => Some(&mut self.district),
            'U' => Some(&mut self.distinguishing),
            'P' => Some(&mut self.check),
            _ => None,
        }
    }
}

fn match_layout(layout: &str, input: &str) -> Option<Captured> {
    let mut captured = Captured::default();
    let mut chars = input.chars();
    for expected in layout.chars() {
        let actual = chars.next()?;
        match expected {
            '/' => {
                if actual != '/' && actual != ' ' {
                    return None;
                }
            }
            '0'..='9' => {
                if actual != expected {
                    return None;
                }
            }
            placeholder => {
                if !actual.is_ascii_digit() {
                    return None;
                }
                captured.class_mut(placeholder)?.push(actual);
            }
        }
    }
    if chars.next().is_some() {
        return None;
    }
    Some(captured)
}

fn fill_layout(layout: &str, digits: &Captured) -> Option<String> {
    let mut office = digits.office.iter();
    let mut district = digits.district.iter();
    let mut distinguishing = digits.distinguishing.iter();
    let mut check = digits.check.iter();
    let mut out = String::with_capacity(layout.len());
    for c in layout.chars() {
        let next = match c {
            'F' => office.next()?,
            'B' => district.next()?,
            'U' => distinguishing.next()?,
            'P' => check.next()?,
            literal => {
                out.push(literal);
                continue;
            }
        };
        out.push(*next);
    }
    Some(out)
}
