//! Field codes (Kennziffern) of the UStVA form and their static classification.
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::DeclarationError;

/// Field code of the UStVA form.
///
/// Variants are declared in ascending numeric order, which is also the order
/// the schema mandates inside `<Umsatzsteuervoranmeldung>`. The derived `Ord`
/// is relied upon by the serializer.
///
/// # Examples
/// ```rust
/// use ustva_core::ustva::FieldCode;
///
/// let code: FieldCode = "kz81".parse()?;
/// assert_eq!(code, FieldCode::Kz81);
/// assert_eq!(code.tag(), "Kz81");
/// # Ok::<(), ustva_core::ustva::DeclarationError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldCode {
    Kz10,
    Kz21,
    Kz22,
    Kz26,
    Kz29,
    Kz35,
    Kz36,
    Kz39,
    Kz41,
    Kz42,
    Kz43,
    Kz44,
    Kz45,
    Kz46,
    Kz47,
    Kz48,
    Kz49,
    Kz52,
    Kz53,
    Kz59,
    Kz60,
    Kz61,
    Kz62,
    Kz63,
    Kz64,
    Kz65,
    Kz66,
    Kz67,
    Kz68,
    Kz69,
    Kz73,
    Kz74,
    Kz76,
    Kz77,
    Kz78,
    Kz79,
    Kz80,
    Kz81,
    Kz83,
    Kz84,
    Kz85,
    Kz86,
    Kz89,
    Kz91,
    Kz93,
    Kz94,
    Kz95,
    Kz96,
    Kz98,
}

/// Classification of a field code. Determines its contribution to Kz83.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldGroup {
    /// Yes/no markers on the form (e.g. Kz10 "Berichtigte Anmeldung").
    Flag,
    /// Intra-community supplies and other tax-free supplies with input tax deduction.
    IntraEuTaxFree,
    /// Assessment bases whose tax is entered in a separate direct-add field.
    TaxBaseOnly,
    /// Tax-free supplies without input tax deduction and non-taxable supplies.
    TaxFree,
    /// Assessment bases taxed at 19 %.
    Vat19,
    /// Assessment bases taxed at 7 %.
    Vat7,
    /// Tax amounts added to the total as-is.
    DirectAdd,
    /// Deductible input tax and prepayments.
    Subtract,
    /// The declared total itself (Kz83).
    Total,
}

impl FieldGroup {
    /// Multiplier applied to a field's amount when summing Kz83.
    pub fn weight(self) -> Decimal {
        match self {
            FieldGroup::Flag
            | FieldGroup::IntraEuTaxFree
            | FieldGroup::TaxBaseOnly
            | FieldGroup::TaxFree
            | FieldGroup::Total => Decimal::ZERO,
            FieldGroup::Vat19 => Decimal::new(19, 2),
            FieldGroup::Vat7 => Decimal::new(7, 2),
            FieldGroup::DirectAdd => Decimal::ONE,
            FieldGroup::Subtract => Decimal::NEGATIVE_ONE,
        }
    }

    /// Wire format of amounts in this group.
    pub fn amount_format(self) -> AmountFormat {
        match self {
            FieldGroup::Flag => AmountFormat::Flag,
            FieldGroup::IntraEuTaxFree
            | FieldGroup::TaxBaseOnly
            | FieldGroup::TaxFree
            | FieldGroup::Vat19
            | FieldGroup::Vat7 => AmountFormat::WholeEuros,
            FieldGroup::DirectAdd | FieldGroup::Subtract | FieldGroup::Total => {
                AmountFormat::Cents
            }
        }
    }
}

/// Exclusive bound on the magnitude of any field amount (10^15 euros).
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(0xA4C6_8000, 0x0003_8D7E, 0, false, 0);

/// How an amount is written into the Datenteil.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountFormat {
    /// Always `1`; a flag is only written when set.
    Flag,
    /// Integer euros, no decimal separator.
    WholeEuros,
    /// Euros with exactly two decimals.
    Cents,
}

impl FieldCode {
    /// All field codes in schema order.
    pub const ALL: [FieldCode; 49] = [
        FieldCode::Kz10,
        FieldCode::Kz21,
        FieldCode::Kz22,
        FieldCode::Kz26,
        FieldCode::Kz29,
        FieldCode::Kz35,
        FieldCode::Kz36,
        FieldCode::Kz39,
        FieldCode::Kz41,
        FieldCode::Kz42,
        FieldCode::Kz43,
        FieldCode::Kz44,
        FieldCode::Kz45,
        FieldCode::Kz46,
        FieldCode::Kz47,
        FieldCode::Kz48,
        FieldCode::Kz49,
        FieldCode::Kz52,
        FieldCode::Kz53,
        FieldCode::Kz59,
        FieldCode::Kz60,
        FieldCode::Kz61,
        FieldCode::Kz62,
        FieldCode::Kz63,
        FieldCode::Kz64,
        FieldCode::Kz65,
        FieldCode::Kz66,
        FieldCode::Kz67,
        FieldCode::Kz68,
        FieldCode::Kz69,
        FieldCode::Kz73,
        FieldCode::Kz74,
        FieldCode::Kz76,
        FieldCode::Kz77,
        FieldCode::Kz78,
        FieldCode::Kz79,
        FieldCode::Kz80,
        FieldCode::Kz81,
        FieldCode::Kz83,
        FieldCode::Kz84,
        FieldCode::Kz85,
        FieldCode::Kz86,
        FieldCode::Kz89,
        FieldCode::Kz91,
        FieldCode::Kz93,
        FieldCode::Kz94,
        FieldCode::Kz95,
        FieldCode::Kz96,
        FieldCode::Kz98,
    ];

    /// Static classification table of the UStVA form.
    pub fn group(self) -> FieldGroup {
        use FieldCode::*;
        match self {
            Kz10 | Kz22 | Kz26 | Kz29 => FieldGroup::Flag,
            Kz41 | Kz43 | Kz44 | Kz48 | Kz49 | Kz91 => FieldGroup::IntraEuTaxFree,
            Kz35 | Kz46 | Kz52 | Kz73 | Kz76 | Kz78 | Kz84 | Kz94 | Kz95 => {
                FieldGroup::TaxBaseOnly
            }
            Kz21 | Kz42 | Kz45 | Kz60 | Kz68 | Kz77 => FieldGroup::TaxFree,
            Kz81 | Kz89 => FieldGroup::Vat19,
            Kz86 | Kz93 => FieldGroup::Vat7,
            Kz36 | Kz47 | Kz53 | Kz65 | Kz69 | Kz74 | Kz79 | Kz80 | Kz85 | Kz96 | Kz98 => {
                FieldGroup::DirectAdd
            }
            Kz39 | Kz59 | Kz61 | Kz62 | Kz63 | Kz64 | Kz66 | Kz67 => FieldGroup::Subtract,
            Kz83 => FieldGroup::Total,
        }
    }

    /// Numeric part of the code, e.g. `81` for `Kz81`.
    pub fn number(self) -> u8 {
        use FieldCode::*;
        match self {
            Kz10 => 10,
            Kz21 => 21,
            Kz22 => 22,
            Kz26 => 26,
            Kz29 => 29,
            Kz35 => 35,
            Kz36 => 36,
            Kz39 => 39,
            Kz41 => 41,
            Kz42 => 42,
            Kz43 => 43,
            Kz44 => 44,
            Kz45 => 45,
            Kz46 => 46,
            Kz47 => 47,
            Kz48 => 48,
            Kz49 => 49,
            Kz52 => 52,
            Kz53 => 53,
            Kz59 => 59,
            Kz60 => 60,
            Kz61 => 61,
            Kz62 => 62,
            Kz63 => 63,
            Kz64 => 64,
            Kz65 => 65,
            Kz66 => 66,
            Kz67 => 67,
            Kz68 => 68,
            Kz69 => 69,
            Kz73 => 73,
            Kz74 => 74,
            Kz76 => 76,
            Kz77 => 77,
            Kz78 => 78,
            Kz79 => 79,
            Kz80 => 80,
            Kz81 => 81,
            Kz83 => 83,
            Kz84 => 84,
            Kz85 => 85,
            Kz86 => 86,
            Kz89 => 89,
            Kz91 => 91,
            Kz93 => 93,
            Kz94 => 94,
            Kz95 => 95,
            Kz96 => 96,
            Kz98 => 98,
        }
    }

    /// XML element name, e.g. `Kz81`.
    pub fn tag(self) -> &'static str {
        use FieldCode::*;
        match self {
            Kz10 => "Kz10",
            Kz21 => "Kz21",
            Kz22 => "Kz22",
            Kz26 => "Kz26",
            Kz29 => "Kz29",
            Kz35 => "Kz35",
            Kz36 => "Kz36",
            Kz39 => "Kz39",
            Kz41 => "Kz41",
            Kz42 => "Kz42",
            Kz43 => "Kz43",
            Kz44 => "Kz44",
            Kz45 => "Kz45",
            Kz46 => "Kz46",
            Kz47 => "Kz47",
            Kz48 => "Kz48",
            Kz49 => "Kz49",
            Kz52 => "Kz52",
            Kz53 => "Kz53",
            Kz59 => "Kz59",
            Kz60 => "Kz60",
            Kz61 => "Kz61",
            Kz62 => "Kz62",
            Kz63 => "Kz63",
            Kz64 => "Kz64",
            Kz65 => "Kz65",
            Kz66 => "Kz66",
            Kz67 => "Kz67",
            Kz68 => "Kz68",
            Kz69 => "Kz69",
            Kz73 => "Kz73",
            Kz74 => "Kz74",
            Kz76 => "Kz76",
            Kz77 => "Kz77",
            Kz78 => "Kz78",
            Kz79 => "Kz79",
            Kz80 => "Kz80",
            Kz81 => "Kz81",
            Kz83 => "Kz83",
            Kz84 => "Kz84",
            Kz85 => "Kz85",
            Kz86 => "Kz86",
            Kz89 => "Kz89",
            Kz91 => "Kz91",
            Kz93 => "Kz93",
            Kz94 => "Kz94",
            Kz95 => "Kz95",
            Kz96 => "Kz96",
            Kz98 => "Kz98",
        }
    }

    pub fn from_number(number: u8) -> Option<FieldCode> {
        FieldCode::ALL.into_iter().find(|code| code.number() == number)
    }

    /// Check that `amount` can be represented in this field's wire format.
    ///
    /// # Errors
    /// Returns [`DeclarationError::AmountOutOfRange`] once `|amount|` reaches
    /// [`MAX_AMOUNT`], [`DeclarationError::FractionalAmount`] for whole-euro
    /// fields carrying cents and [`DeclarationError::ExcessPrecision`] for
    /// cent fields with more than two decimals.
    pub(crate) fn check_amount(self, amount: Decimal) -> Result<(), DeclarationError> {
        if amount.abs() >= MAX_AMOUNT {
            return Err(DeclarationError::AmountOutOfRange { code: self, amount });
        }
        match self.group().amount_format() {
            AmountFormat::WholeEuros if !amount.fract().is_zero() => {
                Err(DeclarationError::FractionalAmount { code: self, amount })
            }
            AmountFormat::Cents if amount.normalize().scale() > 2 => {
                Err(DeclarationError::ExcessPrecision { code: self, amount })
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for FieldCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "kz{}", self.number())
    }
}

impl FromStr for FieldCode {
    type Err = DeclarationError;

    /// Accepts `kz81`, `Kz81` and `KZ81`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || DeclarationError::UnknownFieldCode {
            input: s.to_string(),
        };
        let trimmed = s.trim();
        let digits = trimmed
            .get(..2)
            .filter(|prefix| prefix.eq_ignore_ascii_case("kz"))
            .and_then(|_| trimmed.get(2..))
            .ok_or_else(unknown)?;
        if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unknown());
        }
        let number: u8 = digits.parse().map_err(|_| unknown())?;
        FieldCode::from_number(number).ok_or_else(unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_sorted_and_complete() {
        let mut sorted = FieldCode::ALL;
        sorted.sort();
        assert_eq!(sorted, FieldCode::ALL);
        assert!(FieldCode::ALL
            .windows(2)
            .all(|pair| pair[0].number() < pair[1].number()));
    }

    #[test]
    fn tag_and_display_follow_number() {
        for code in FieldCode::ALL {
            assert_eq!(code.tag(), format!("Kz{}", code.number()));
            assert_eq!(code.to_string(), format!("kz{}", code.number()));
            assert_eq!(code.to_string().parse::<FieldCode>().unwrap(), code);
        }
    }

    #[test]
    fn parse_rejects_unknown_codes() {
        for input in ["kz12", "kz", "83", "kz8", "kz083", "ab83", "kz8a", ""] {
            assert!(
                matches!(
                    input.parse::<FieldCode>(),
                    Err(DeclarationError::UnknownFieldCode { .. })
                ),
                "{input} should be rejected"
            );
        }
        assert_eq!("KZ83".parse::<FieldCode>().unwrap(), FieldCode::Kz83);
    }

    #[test]
    fn weights_match_groups() {
        assert_eq!(FieldCode::Kz81.group().weight(), Decimal::new(19, 2));
        assert_eq!(FieldCode::Kz93.group().weight(), Decimal::new(7, 2));
        assert_eq!(FieldCode::Kz69.group().weight(), Decimal::ONE);
        assert_eq!(FieldCode::Kz39.group().weight(), Decimal::NEGATIVE_ONE);
        assert!(FieldCode::Kz83.group().weight().is_zero());
        assert!(FieldCode::Kz10.group().weight().is_zero());
    }

    #[test]
    fn whole_euro_fields_reject_cents() {
        assert!(FieldCode::Kz81.check_amount(Decimal::new(100050, 2)).is_err());
        assert!(FieldCode::Kz81.check_amount(Decimal::new(100000, 2)).is_ok());
        assert!(FieldCode::Kz66.check_amount(Decimal::new(100050, 2)).is_ok());
    }

    #[test]
    fn amounts_are_bounded_and_cent_fields_limited_to_two_decimals() {
        assert_eq!(MAX_AMOUNT, Decimal::from(1_000_000_000_000_000i64));
        assert!(FieldCode::Kz36.check_amount(MAX_AMOUNT - Decimal::ONE).is_ok());
        assert!(matches!(
            FieldCode::Kz36.check_amount(MAX_AMOUNT),
            Err(DeclarationError::AmountOutOfRange { .. })
        ));
        assert!(matches!(
            FieldCode::Kz10.check_amount(-MAX_AMOUNT),
            Err(DeclarationError::AmountOutOfRange { .. })
        ));
        assert!(matches!(
            FieldCode::Kz66.check_amount(Decimal::new(5, 3)),
            Err(DeclarationError::ExcessPrecision { .. })
        ));
        assert!(FieldCode::Kz66.check_amount(Decimal::new(1230, 3)).is_ok());
    }
}
