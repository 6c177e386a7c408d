mod common;

use base64ct::{Base64, Encoding};
use common::{fixture_bytes, test_signer, PFX_PASSPHRASE};
use std::fs;
use ustva_core::signer::{verify_signature, KeyLoadError, SigningContext, SigningError};
use x509_cert::der::{Decode, DecodePem, Encode};
use x509_cert::Certificate;

const HELLO_SHA1: &str = "qvTGHdzF6KLavt4PO0gs2a6pQ00=";

#[test]
fn wrong_passphrase_is_rejected() {
    let err = SigningContext::from_pkcs12_der(&fixture_bytes("test-softpse.pfx"), "654321")
        .expect_err("wrong passphrase");
    assert!(matches!(err, KeyLoadError::BadPassphrase));
}

#[test]
fn right_passphrase_opens_container() {
    let signer =
        SigningContext::from_pkcs12_der(&fixture_bytes("test-softpse.pfx"), PFX_PASSPHRASE);
    assert!(signer.is_ok());
}

#[test]
fn digest_of_fixed_payload_is_known() {
    let signer = test_signer();
    assert_eq!(signer.digest(b"hello"), HELLO_SHA1);
    let parts = signer.sign(b"hello").expect("sign");
    assert_eq!(parts.digest(), HELLO_SHA1);
    assert!(parts
        .signed_info()
        .contains(&format!("<DigestValue>{HELLO_SHA1}</DigestValue>")));
}

#[test]
fn signature_verifies_with_certificate_key() {
    let signer = test_signer();
    let parts = signer.sign(b"hello").expect("sign");

    // 2048-bit key
    let raw = Base64::decode_vec(parts.signature()).expect("base64 signature");
    assert_eq!(raw.len(), 256);

    verify_signature(signer.certificate(), parts.signed_info(), parts.signature())
        .expect("signature verifies");
}

#[test]
fn signatures_are_randomized_but_all_verify() {
    let signer = test_signer();
    let first = signer.sign(b"hello").expect("sign");
    let second = signer.sign(b"hello").expect("sign");

    assert_eq!(first.digest(), second.digest());
    assert_eq!(first.signed_info(), second.signed_info());
    assert_ne!(first.signature(), second.signature());
    for parts in [&first, &second] {
        verify_signature(signer.certificate(), parts.signed_info(), parts.signature())
            .expect("signature verifies");
    }
}

#[test]
fn tampered_signed_info_fails_verification() {
    let signer = test_signer();
    let parts = signer.sign(b"hello").expect("sign");
    let tampered = parts.signed_info().replace(HELLO_SHA1, &signer.digest(b"hullo"));
    let err = verify_signature(signer.certificate(), &tampered, parts.signature()).unwrap_err();
    assert!(matches!(err, SigningError::Verification));

    let err = verify_signature(signer.certificate(), parts.signed_info(), "%%%").unwrap_err();
    assert!(matches!(err, SigningError::MalformedSignature(_)));
}

#[test]
fn exported_certificate_round_trips() {
    let signer = test_signer();
    let reparsed = Certificate::from_der(signer.certificate_der()).expect("parse exported DER");
    let original = signer.certificate();

    assert_eq!(
        reparsed.tbs_certificate.serial_number,
        original.tbs_certificate.serial_number
    );
    assert_eq!(reparsed.tbs_certificate.issuer, original.tbs_certificate.issuer);
    assert_eq!(reparsed.tbs_certificate.subject, original.tbs_certificate.subject);
    assert_eq!(original.to_der().expect("encode"), signer.certificate_der());

    let from_base64 = Base64::decode_vec(&signer.certificate_base64()).expect("base64 cert");
    assert_eq!(from_base64, signer.certificate_der());
}

#[test]
fn certificate_matches_pem_fixture() {
    let pem = fs::read_to_string(common::fixture_path("test-softpse.pem")).expect("read pem");
    let expected = Certificate::from_pem(pem.as_bytes()).expect("parse pem");
    assert_eq!(
        test_signer().certificate_der(),
        expected.to_der().expect("encode").as_slice()
    );
}

#[test]
fn issuer_serial_is_decimal() {
    let signer = test_signer();
    let (issuer, serial) = signer.issuer_serial();
    assert_eq!(serial, "1000145521");
    assert!(issuer.contains("CN=1002753325"), "{issuer}");
    assert!(issuer.contains("O=Elster Test"), "{issuer}");

    let subject = signer.certificate().tbs_certificate.subject.to_string();
    assert!(subject.contains("CN=1002753325"), "{subject}");
}
