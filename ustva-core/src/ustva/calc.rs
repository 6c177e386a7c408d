use rust_decimal::Decimal;

use super::Declaration;

/// Total tax figure (Kz83) implied by the other fields of `declaration`.
///
/// Recomputed from the current field state on every call. Each present field
/// contributes `amount * weight` of its [`FieldGroup`](super::FieldGroup);
/// Kz83 itself is never part of the sum.
pub fn calculate_kz83(declaration: &Declaration) -> Decimal {
    declaration
        .fields()
        .map(|(code, amount)| amount * code.group().weight())
        .sum()
}
