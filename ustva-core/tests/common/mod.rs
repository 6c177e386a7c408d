use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::PathBuf;
use ustva_core::signer::SigningContext;
use ustva_core::ustva::envelope::{NutzdatenTicket, SubmissionStamp};
use ustva_core::ustva::{Declaration, FieldCode, Submitter};

pub const PFX_PASSPHRASE: &str = "123456";

#[allow(dead_code)]
pub fn dummy_submitter() -> Submitter {
    Submitter::new(
        "Steuer Sklave".into(),
        "Finstere Gasse 23".into(),
        "12345".into(),
        "Sklavengrube".into(),
        None,
        None,
    )
    .expect("valid submitter")
}

/// January 2012 declaration without land, tax number or amounts.
#[allow(dead_code)]
pub fn empty_declaration() -> Declaration {
    Declaration::new(dummy_submitter(), 2012, 1).expect("valid declaration")
}

/// Bavarian declaration that passes validation with a zero total.
#[allow(dead_code)]
pub fn dummy_declaration() -> Declaration {
    let mut ustva = empty_declaration();
    ustva.set_land(2);
    ustva.set_steuernummer("203/698/02950");
    ustva.set(FieldCode::Kz83, Decimal::ZERO)
        .expect("kz83 accepts cents");
    ustva
}

#[allow(dead_code)]
pub fn fixed_stamp() -> SubmissionStamp {
    SubmissionStamp::fixed(
        NutzdatenTicket::parse("123456789").expect("ticket"),
        NaiveDate::from_ymd_opt(2012, 2, 10).expect("date"),
    )
}

#[allow(dead_code)]
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[allow(dead_code)]
pub fn fixture_bytes(name: &str) -> Vec<u8> {
    std::fs::read(fixture_path(name)).expect("read fixture")
}

/// Expected XML fixture with layout whitespace (newlines, tabs) removed.
#[allow(dead_code)]
pub fn fixture_xml(name: &str) -> String {
    let xml = std::fs::read_to_string(fixture_path(name)).expect("read fixture");
    xml.chars().filter(|c| *c != '\n' && *c != '\r' && *c != '\t').collect()
}

#[allow(dead_code)]
pub fn test_signer() -> SigningContext {
    SigningContext::from_pkcs12_der(&fixture_bytes("test-softpse.pfx"), PFX_PASSPHRASE)
        .expect("open test container")
}
