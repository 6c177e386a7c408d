//! XML serialization of the declaration body (`DatenTeil`).
pub(crate) mod constants;

use super::envelope::SubmissionStamp;
use super::{AmountFormat, Declaration, Submitter, TaxNumber, TaxNumberError, TEST_TAX_OFFICE};
use crate::config::{Config, SubmissionMode, Vendor};

use constants::{DATEN_ART, ELSTER_NS, NUTZDATEN_HEADER_VERSION, RECIPIENT_TAX_OFFICE};
use helpers::{text_with_attribute, AmountText};
use quick_xml::se::{QuoteLevel, SeError, Serializer as QuickXmlSerializer};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use thiserror::Error;

/// XML serialization error.
#[derive(Debug, Error)]
pub enum XmlError {
    #[error("failed to serialize declaration to XML: {source}")]
    Serialize {
        #[from]
        source: SeError,
    },
    #[error("cannot address the declaration: {0}")]
    TaxNumber(#[from] TaxNumberError),
}

/// XML formatting options.
///
/// Only [`XmlFormat::Compact`] output is canonical and suitable for signing.
#[derive(Debug, Clone, Copy, Default)]
pub enum XmlFormat {
    #[default]
    Compact,
    Pretty {
        indent_char: char,
        indent_size: usize,
    },
}

mod helpers {
    use super::AmountFormat;
    use rust_decimal::Decimal;
    use serde::ser::{Serialize, SerializeStruct, Serializer};
    use std::fmt::{self, Display, Formatter};

    /// Decimal written with a fixed number of fraction digits.
    pub(super) struct FixedPrecision {
        value: Decimal,
        precision: u32,
    }

    impl FixedPrecision {
        pub(super) fn new(value: Decimal, precision: u32) -> Self {
            // keeps "-0.00" out of the output
            let value = if value.is_zero() { Decimal::ZERO } else { value };
            Self {
                value: value.round_dp(precision),
                precision,
            }
        }
    }

    impl Display for FixedPrecision {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "{:.*}", self.precision as usize, self.value)
        }
    }

    /// Text content of a `Kz..` element.
    pub(super) struct AmountText {
        format: AmountFormat,
        amount: Decimal,
    }

    impl AmountText {
        pub(super) fn new(format: AmountFormat, amount: Decimal) -> Self {
            Self { format, amount }
        }
    }

    impl Display for AmountText {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            match self.format {
                AmountFormat::Flag => f.write_str("1"),
                AmountFormat::WholeEuros => FixedPrecision::new(self.amount, 0).fmt(f),
                AmountFormat::Cents => FixedPrecision::new(self.amount, 2).fmt(f),
            }
        }
    }

    impl Serialize for AmountText {
        fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            serializer.collect_str(self)
        }
    }

    struct TextWithAttributeSer<'a> {
        tag: &'static str,
        attribute: &'static str,
        attribute_value: &'a str,
        value: &'a str,
    }

    pub(super) fn text_with_attribute<'a>(
        tag: &'static str,
        attribute: &'static str,
        attribute_value: &'a str,
        value: &'a str,
    ) -> impl Serialize + 'a {
        TextWithAttributeSer {
            tag,
            attribute,
            attribute_value,
            value,
        }
    }

    impl<'a> Serialize for TextWithAttributeSer<'a> {
        fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            let mut st = s.serialize_struct(self.tag, 2)?;
            st.serialize_field(self.attribute, self.attribute_value)?;
            st.serialize_field("$text", self.value)?;
            st.end()
        }
    }
}

/// Render the canonical `DatenTeil` of `declaration`.
///
/// Output is compact and byte-deterministic for equal declaration, config
/// and stamp, so it can be digested and embedded verbatim.
///
/// # Errors
/// Fails with [`XmlError::TaxNumber`] when the land or tax number cannot be
/// resolved, since neither the 13-digit number nor the tax office is known
/// then.
///
/// # Examples
/// ```rust
/// use chrono::NaiveDate;
/// use rust_decimal::Decimal;
/// use ustva_core::config::Config;
/// use ustva_core::ustva::envelope::{NutzdatenTicket, SubmissionStamp};
/// use ustva_core::ustva::{xml::render_body, Declaration, FieldCode, Submitter};
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
/// ustva.set_land(2);
/// ustva.set_steuernummer("203/698/02950");
/// ustva.set(FieldCode::Kz83, Decimal::ZERO)?;
///
/// let stamp = SubmissionStamp::fixed(
///     NutzdatenTicket::parse("123456789")?,
///     NaiveDate::from_ymd_opt(2012, 2, 10).unwrap(),
/// );
/// let xml = render_body(&ustva, &Config::default(), &stamp)?;
/// assert!(xml.starts_with("<DatenTeil xmlns=\"http://www.elster.de/2002/XMLSchema\">"));
/// assert!(xml.contains("<Kz83>0.00</Kz83>"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn render_body(
    declaration: &Declaration,
    config: &Config,
    stamp: &SubmissionStamp,
) -> Result<String, XmlError> {
    render_body_with_format(declaration, config, stamp, XmlFormat::Compact)
}

pub fn render_body_with_format(
    declaration: &Declaration,
    config: &Config,
    stamp: &SubmissionStamp,
    format: XmlFormat,
) -> Result<String, XmlError> {
    let tax_number = declaration.tax_number()?;
    let datenteil = DatenTeilXml {
        declaration,
        tax_number: &tax_number,
        config,
        stamp,
    };

    let mut buffer = String::with_capacity(2048);
    {
        let mut serializer = QuickXmlSerializer::new(&mut buffer);
        serializer.expand_empty_elements(true);
        serializer.set_quote_level(QuoteLevel::Partial);
        if let XmlFormat::Pretty {
            indent_char,
            indent_size,
        } = format
        {
            serializer.indent(indent_char, indent_size);
        }
        datenteil.serialize(serializer)?;
    }

    tracing::debug!(
        mode = config.mode().as_str(),
        ticket = stamp.ticket().as_str(),
        bytes = buffer.len(),
        "rendered datenteil"
    );
    Ok(buffer)
}

/// Tax office the declaration is addressed to.
fn recipient(mode: SubmissionMode, tax_number: &TaxNumber) -> &str {
    match mode {
        SubmissionMode::Test => TEST_TAX_OFFICE,
        SubmissionMode::Production => tax_number.tax_office(),
    }
}

struct DatenTeilXml<'a> {
    declaration: &'a Declaration,
    tax_number: &'a TaxNumber,
    config: &'a Config,
    stamp: &'a SubmissionStamp,
}

impl<'a> Serialize for DatenTeilXml<'a> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut root = serializer.serialize_struct("DatenTeil", 0)?;
        root.serialize_field("@xmlns", ELSTER_NS)?;
        root.serialize_field("Nutzdatenblock", &NutzdatenblockXml(self))?;
        root.end()
    }
}

struct NutzdatenblockXml<'a>(&'a DatenTeilXml<'a>);

impl<'a> Serialize for NutzdatenblockXml<'a> {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.0;
        let mut st = s.serialize_struct("Nutzdatenblock", 0)?;
        st.serialize_field(
            "NutzdatenHeader",
            &NutzdatenHeaderXml {
                ticket: data.stamp.ticket().as_str(),
                recipient: recipient(data.config.mode(), data.tax_number),
                vendor: data.config.vendor(),
                submitter: data.declaration.submitter(),
            },
        )?;
        st.serialize_field("Nutzdaten", &NutzdatenXml(data))?;
        st.end()
    }
}

struct NutzdatenHeaderXml<'a> {
    ticket: &'a str,
    recipient: &'a str,
    vendor: &'a Vendor,
    submitter: &'a Submitter,
}

impl<'a> Serialize for NutzdatenHeaderXml<'a> {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("NutzdatenHeader", 0)?;
        st.serialize_field("@version", NUTZDATEN_HEADER_VERSION)?;
        st.serialize_field("NutzdatenTicket", self.ticket)?;
        st.serialize_field(
            "Empfaenger",
            &text_with_attribute("Empfaenger", "@id", RECIPIENT_TAX_OFFICE, self.recipient),
        )?;
        st.serialize_field("Hersteller", &HerstellerXml(self.vendor))?;
        st.serialize_field("DatenLieferant", &self.submitter.summary())?;
        st.end()
    }
}

struct HerstellerXml<'a>(&'a Vendor);

impl<'a> Serialize for HerstellerXml<'a> {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("Hersteller", 0)?;
        st.serialize_field("ProduktName", self.0.product_name())?;
        st.serialize_field("ProduktVersion", self.0.product_version())?;
        st.end()
    }
}

struct NutzdatenXml<'a>(&'a DatenTeilXml<'a>);

impl<'a> Serialize for NutzdatenXml<'a> {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("Nutzdaten", 0)?;
        st.serialize_field("Anmeldungssteuern", &AnmeldungssteuernXml(self.0))?;
        st.end()
    }
}

struct AnmeldungssteuernXml<'a>(&'a DatenTeilXml<'a>);

impl<'a> Serialize for AnmeldungssteuernXml<'a> {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.0;
        let declaration = data.declaration;
        let mut st = s.serialize_struct("Anmeldungssteuern", 0)?;
        st.serialize_field("@art", DATEN_ART)?;
        st.serialize_field("@version", &format!("{}01", declaration.year()))?;
        st.serialize_field("DatenLieferant", &SubmitterXml(declaration.submitter()))?;
        st.serialize_field(
            "Erstellungsdatum",
            &data.stamp.created().format("%Y%m%d").to_string(),
        )?;
        st.serialize_field("Steuerfall", &SteuerfallXml(data))?;
        st.end()
    }
}

struct SubmitterXml<'a>(&'a Submitter);

impl<'a> Serialize for SubmitterXml<'a> {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let submitter = self.0;
        let mut st = s.serialize_struct("DatenLieferant", 0)?;
        st.serialize_field("Name", submitter.name().trim())?;
        st.serialize_field("Strasse", submitter.street().trim())?;
        st.serialize_field("PLZ", submitter.postal_code().trim())?;
        st.serialize_field("Ort", submitter.city().trim())?;
        if let Some(phone) = submitter.phone() {
            st.serialize_field("Telefon", phone.trim())?;
        }
        if let Some(email) = submitter.email() {
            st.serialize_field("Email", email.trim())?;
        }
        st.end()
    }
}

struct SteuerfallXml<'a>(&'a DatenTeilXml<'a>);

impl<'a> Serialize for SteuerfallXml<'a> {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut st = s.serialize_struct("Steuerfall", 0)?;
        st.serialize_field("Umsatzsteuervoranmeldung", &UmsatzsteuervoranmeldungXml(self.0))?;
        st.end()
    }
}

struct UmsatzsteuervoranmeldungXml<'a>(&'a DatenTeilXml<'a>);

impl<'a> Serialize for UmsatzsteuervoranmeldungXml<'a> {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let data = self.0;
        let declaration = data.declaration;
        let mut st = s.serialize_struct("Umsatzsteuervoranmeldung", 0)?;
        st.serialize_field("Jahr", &declaration.year().to_string())?;
        st.serialize_field("Zeitraum", &declaration.period().to_string())?;
        st.serialize_field("Steuernummer", data.tax_number.elster())?;

        for (code, amount) in declaration.fields() {
            let format = code.group().amount_format();
            // unset flags are omitted rather than written as 0
            if format == AmountFormat::Flag && amount.is_zero() {
                continue;
            }
            st.serialize_field(code.tag(), &AmountText::new(format, amount))?;
        }
        st.end()
    }
}
