mod common;

use common::empty_declaration;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use ustva_core::ustva::{calculate_kz83, FieldCode, FieldGroup};

#[test]
fn empty_declaration_computes_zero() {
    assert_eq!(calculate_kz83(&empty_declaration()), Decimal::ZERO);
}

#[test]
fn cumulative_sum_over_all_fields() {
    let mut ustva = empty_declaration();
    let mut expected = Decimal::ZERO;

    for code in FieldCode::ALL {
        let (amount, delta) = match code.group() {
            FieldGroup::Flag
            | FieldGroup::IntraEuTaxFree
            | FieldGroup::TaxBaseOnly
            | FieldGroup::TaxFree => (dec!(10000), Decimal::ZERO),
            FieldGroup::Vat19 => (dec!(10000), dec!(1900)),
            FieldGroup::Vat7 => (dec!(10000), dec!(700)),
            FieldGroup::DirectAdd => (dec!(1000), dec!(1000)),
            FieldGroup::Subtract => (dec!(2000), dec!(-2000)),
            FieldGroup::Total => continue,
        };
        ustva.set(code, amount).unwrap();
        expected += delta;
        assert_eq!(calculate_kz83(&ustva), expected, "after setting {code}");
    }
}

#[test]
fn total_field_is_not_summed() {
    let mut ustva = empty_declaration();
    ustva.set(FieldCode::Kz81, dec!(10000)).unwrap();
    ustva.set(FieldCode::Kz83, dec!(99999.99)).unwrap();
    assert_eq!(calculate_kz83(&ustva), dec!(1900));
}

#[test]
fn calculation_is_exact_decimal_arithmetic() {
    let mut ustva = empty_declaration();
    ustva.set(FieldCode::Kz81, dec!(1)).unwrap();
    ustva.set(FieldCode::Kz86, dec!(1)).unwrap();
    ustva.set(FieldCode::Kz66, dec!(0.26)).unwrap();
    // 0.19 + 0.07 - 0.26
    assert_eq!(calculate_kz83(&ustva), Decimal::ZERO);

    ustva.set(FieldCode::Kz83, calculate_kz83(&ustva)).unwrap();
    ustva.set(FieldCode::Kz81, dec!(3)).unwrap();
    assert_eq!(calculate_kz83(&ustva), dec!(0.38));
}
