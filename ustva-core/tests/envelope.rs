mod common;

use base64ct::{Base64, Encoding};
use common::{dummy_declaration, fixed_stamp, test_signer};
use rust_decimal_macros::dec;
use sha1::{Digest, Sha1};
use ustva_core::config::{Config, SubmissionMode};
use ustva_core::signer::verify_signature;
use ustva_core::ustva::envelope::Envelope;
use ustva_core::ustva::FieldCode;

fn between<'a>(xml: &'a str, open: &str, close: &str) -> &'a str {
    let start = xml.find(open).expect("open tag") + open.len();
    let end = start + xml[start..].find(close).expect("close tag");
    &xml[start..end]
}

fn embedded_datenteil(xml: &str) -> &str {
    let start = xml.find("<DatenTeil").expect("DatenTeil");
    let end = xml.rfind("</DatenTeil>").expect("DatenTeil end") + "</DatenTeil>".len();
    &xml[start..end]
}

#[test]
fn digest_covers_exact_datenteil_bytes() {
    let mut ustva = dummy_declaration();
    ustva.set(FieldCode::Kz81, dec!(10000)).unwrap();
    ustva.set(FieldCode::Kz83, dec!(1900)).unwrap();
    let config = Config::default();
    let signer = test_signer();

    let envelope = Envelope::new(&ustva, &config).with_stamp(fixed_stamp());
    let signed = envelope.render_signed(&signer).expect("signed envelope");
    let xml = signed.xml();

    let datenteil = embedded_datenteil(xml);
    assert_eq!(datenteil, envelope.datenteil().unwrap());

    let expected = Base64::encode_string(&Sha1::digest(datenteil.as_bytes()));
    assert_eq!(signed.parts().digest(), expected);
    assert_eq!(between(xml, "<DigestValue>", "</DigestValue>"), expected);
}

#[test]
fn embedded_signature_verifies() {
    let ustva = dummy_declaration();
    let config = Config::default();
    let signer = test_signer();
    let signed = Envelope::new(&ustva, &config)
        .with_stamp(fixed_stamp())
        .render_signed(&signer)
        .expect("signed envelope");
    let xml = signed.xml();

    assert!(xml.contains(signed.parts().signed_info()));
    let signature_value = between(xml, "<SignatureValue>", "</SignatureValue>");
    assert_eq!(signature_value, signed.parts().signature());
    verify_signature(signer.certificate(), signed.parts().signed_info(), signature_value)
        .expect("signature verifies");

    assert_eq!(
        between(xml, "<X509Certificate>", "</X509Certificate>"),
        signer.certificate_base64()
    );
    assert_eq!(
        between(xml, "<X509SerialNumber>", "</X509SerialNumber>"),
        "1000145521"
    );
}

#[test]
fn signed_header_layout() {
    let ustva = dummy_declaration();
    let config = Config::default();
    let signed = Envelope::new(&ustva, &config)
        .with_stamp(fixed_stamp())
        .render_signed(&test_signer())
        .expect("signed envelope");
    let header = between(signed.xml(), "<TransferHeader version=\"8\">", "</TransferHeader>");

    assert!(header.starts_with(
        "<Verfahren>ElsterAnmeldung</Verfahren><DatenArt>UStVA</DatenArt>\
         <Vorgang>send-Auth</Vorgang><Testmerker>700000004</Testmerker>"
    ));
    assert!(header.contains(
        "<SigUser><Signature xmlns=\"http://www.w3.org/2000/09/xmldsig#\"><SignedInfo"
    ));
    assert_eq!(signed.stamp(), &fixed_stamp());
}

#[test]
fn re_rendering_differs_only_in_signature_value() {
    let ustva = dummy_declaration();
    let config = Config::default().with_mode(SubmissionMode::Production);
    let signer = test_signer();
    let envelope = Envelope::new(&ustva, &config).with_stamp(fixed_stamp());

    let first = envelope.render_signed(&signer).expect("first").into_xml();
    let second = envelope.render_signed(&signer).expect("second").into_xml();
    assert_ne!(first, second);

    let strip = |xml: &str| {
        let value = between(xml, "<SignatureValue>", "</SignatureValue>").to_string();
        xml.replace(&value, "")
    };
    assert_eq!(strip(&first), strip(&second));
    assert!(!first.contains("Testmerker"));
}
