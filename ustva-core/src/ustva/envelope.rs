//! Transfer envelope around the `DatenTeil`.
use super::xml::constants::{
    DATEN_ART, DS_NS, ELSTER_NS, TESTMERKER, TRANSFER_HEADER_VERSION, VERFAHREN,
    VORGANG_SIGNED, VORGANG_UNSIGNED,
};
use super::xml::{render_body, XmlError};
use super::Declaration;
use crate::config::Config;
use crate::signer::{SignatureParts, SigningContext, SigningError};

use chrono::{Local, NaiveDate};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use rand::Rng;
use std::fmt;
use thiserror::Error;

const TICKET_DIGITS: usize = 15;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error(transparent)]
    Xml(#[from] XmlError),
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error("invalid submission ticket '{input}', expected 1 to 15 digits")]
    InvalidTicket { input: String },
    #[error("failed to write envelope: {0}")]
    Write(String),
}

fn write_error(err: impl fmt::Display) -> EnvelopeError {
    EnvelopeError::Write(err.to_string())
}

/// Per-submission ticket ("NutzdatenTicket").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NutzdatenTicket(String);

impl NutzdatenTicket {
    /// Random 15-digit numeric ticket.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let ticket = (0..TICKET_DIGITS)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect();
        NutzdatenTicket(ticket)
    }

    /// # Errors
    /// Returns [`EnvelopeError::InvalidTicket`] unless `input` is 1 to 15
    /// ASCII digits.
    pub fn parse(input: &str) -> Result<Self, EnvelopeError> {
        let valid = (1..=TICKET_DIGITS).contains(&input.len())
            && input.bytes().all(|b| b.is_ascii_digit());
        if !valid {
            return Err(EnvelopeError::InvalidTicket {
                input: input.to_string(),
            });
        }
        Ok(NutzdatenTicket(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NutzdatenTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Ticket and creation date of one submission.
///
/// These are the only values that differ between two renderings of the same
/// declaration; fix them with [`SubmissionStamp::fixed`] for reproducible
/// output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionStamp {
    ticket: NutzdatenTicket,
    created: NaiveDate,
}

impl SubmissionStamp {
    /// Fresh random ticket, dated today (local time).
    pub fn now() -> Self {
        Self {
            ticket: NutzdatenTicket::generate(),
            created: Local::now().date_naive(),
        }
    }

    pub fn fixed(ticket: NutzdatenTicket, created: NaiveDate) -> Self {
        Self { ticket, created }
    }

    pub fn ticket(&self) -> &NutzdatenTicket {
        &self.ticket
    }

    pub fn created(&self) -> NaiveDate {
        self.created
    }
}

impl Default for SubmissionStamp {
    fn default() -> Self {
        SubmissionStamp::now()
    }
}

/// Full `Elster` document for one declaration.
///
/// The envelope borrows the declaration and reads its state only when
/// rendered.
///
/// # Examples
/// ```rust,no_run
/// use ustva_core::config::Config;
/// use ustva_core::signer::SigningContext;
/// use ustva_core::ustva::envelope::Envelope;
/// # fn declaration() -> ustva_core::ustva::Declaration { unimplemented!() }
///
/// let ustva = declaration();
/// let config = Config::default();
/// let pfx = std::fs::read("test-softpse.pfx")?;
/// let signer = SigningContext::from_pkcs12_der(&pfx, "123456")?;
///
/// let signed = Envelope::new(&ustva, &config).render_signed(&signer)?;
/// println!("{}", signed.xml());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Envelope<'a> {
    declaration: &'a Declaration,
    config: &'a Config,
    stamp: SubmissionStamp,
}

impl<'a> Envelope<'a> {
    pub fn new(declaration: &'a Declaration, config: &'a Config) -> Self {
        Self {
            declaration,
            config,
            stamp: SubmissionStamp::now(),
        }
    }

    pub fn with_stamp(mut self, stamp: SubmissionStamp) -> Self {
        self.stamp = stamp;
        self
    }

    pub fn stamp(&self) -> &SubmissionStamp {
        &self.stamp
    }

    /// The `DatenTeil` exactly as it is embedded and digested.
    pub fn datenteil(&self) -> Result<String, EnvelopeError> {
        Ok(render_body(self.declaration, self.config, &self.stamp)?)
    }

    /// Render and sign the envelope.
    ///
    /// The digest covers the exact `DatenTeil` bytes; the signature block
    /// goes into the transfer header's `SigUser`.
    ///
    /// # Errors
    /// Fails if the body cannot be rendered or signing fails.
    pub fn render_signed(&self, signer: &SigningContext) -> Result<SignedEnvelope, EnvelopeError> {
        let datenteil = self.datenteil()?;
        let parts = signer.sign(datenteil.as_bytes())?;
        let (issuer, serial) = signer.issuer_serial();
        let certificate = signer.certificate_base64();
        let signature = SignatureBlock {
            parts: &parts,
            issuer: &issuer,
            serial: &serial,
            certificate: &certificate,
        };
        let xml = self.write(VORGANG_SIGNED, Some(&signature), &datenteil)?;
        tracing::debug!(
            ticket = self.stamp.ticket().as_str(),
            bytes = xml.len(),
            "rendered signed envelope"
        );
        Ok(SignedEnvelope {
            xml,
            parts,
            stamp: self.stamp.clone(),
        })
    }

    /// Render the envelope without signature (`send-NoSig`).
    pub fn render_unsigned(&self) -> Result<String, EnvelopeError> {
        let datenteil = self.datenteil()?;
        let xml = self.write(VORGANG_UNSIGNED, None, &datenteil)?;
        tracing::debug!(
            ticket = self.stamp.ticket().as_str(),
            bytes = xml.len(),
            "rendered unsigned envelope"
        );
        Ok(xml)
    }

    fn write(
        &self,
        vorgang: &str,
        signature: Option<&SignatureBlock<'_>>,
        datenteil: &str,
    ) -> Result<String, EnvelopeError> {
        let vendor = self.config.vendor();
        let mut writer = Writer::new(Vec::with_capacity(datenteil.len() + 4096));

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;
        writer.get_mut().push(b'\n');
        start(
            &mut writer,
            BytesStart::new("Elster").with_attributes([("xmlns", ELSTER_NS)]),
        )?;

        start(
            &mut writer,
            BytesStart::new("TransferHeader").with_attributes([("version", TRANSFER_HEADER_VERSION)]),
        )?;
        text_element(&mut writer, "Verfahren", VERFAHREN)?;
        text_element(&mut writer, "DatenArt", DATEN_ART)?;
        text_element(&mut writer, "Vorgang", vorgang)?;
        if self.config.mode().is_test() {
            text_element(&mut writer, "Testmerker", TESTMERKER)?;
        }
        text_element(&mut writer, "HerstellerID", vendor.hersteller_id())?;
        text_element(
            &mut writer,
            "DatenLieferant",
            &self.declaration.submitter().summary(),
        )?;
        text_element(&mut writer, "VersionClient", &vendor.client_version())?;
        if let Some(signature) = signature {
            start(&mut writer, BytesStart::new("SigUser"))?;
            signature.write(&mut writer)?;
            end(&mut writer, "SigUser")?;
        }
        end(&mut writer, "TransferHeader")?;

        writer.get_mut().extend_from_slice(datenteil.as_bytes());
        end(&mut writer, "Elster")?;

        String::from_utf8(writer.into_inner()).map_err(write_error)
    }
}

/// Signature data spliced into `SigUser`.
struct SignatureBlock<'a> {
    parts: &'a SignatureParts,
    issuer: &'a str,
    serial: &'a str,
    certificate: &'a str,
}

impl<'a> SignatureBlock<'a> {
    fn write(&self, writer: &mut Writer<Vec<u8>>) -> Result<(), EnvelopeError> {
        start(
            writer,
            BytesStart::new("Signature").with_attributes([("xmlns", DS_NS)]),
        )?;
        // signed bytes go in verbatim
        writer
            .get_mut()
            .extend_from_slice(self.parts.signed_info().as_bytes());
        text_element(writer, "SignatureValue", self.parts.signature())?;
        start(writer, BytesStart::new("KeyInfo"))?;
        start(writer, BytesStart::new("X509Data"))?;
        start(writer, BytesStart::new("X509IssuerSerial"))?;
        text_element(writer, "X509IssuerName", self.issuer)?;
        text_element(writer, "X509SerialNumber", self.serial)?;
        end(writer, "X509IssuerSerial")?;
        text_element(writer, "X509Certificate", self.certificate)?;
        end(writer, "X509Data")?;
        end(writer, "KeyInfo")?;
        end(writer, "Signature")
    }
}

fn start(writer: &mut Writer<Vec<u8>>, element: BytesStart<'_>) -> Result<(), EnvelopeError> {
    writer.write_event(Event::Start(element)).map_err(write_error)
}

fn end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), EnvelopeError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(write_error)
}

fn text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), EnvelopeError> {
    start(writer, BytesStart::new(name))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(write_error)?;
    end(writer, name)
}

/// Signed envelope plus the artifacts that went into it.
#[derive(Debug, Clone)]
pub struct SignedEnvelope {
    xml: String,
    parts: SignatureParts,
    stamp: SubmissionStamp,
}

impl SignedEnvelope {
    pub fn xml(&self) -> &str {
        &self.xml
    }

    pub fn parts(&self) -> &SignatureParts {
        &self.parts
    }

    pub fn stamp(&self) -> &SubmissionStamp {
        &self.stamp
    }

    pub fn into_xml(self) -> String {
        self.xml
    }
}
