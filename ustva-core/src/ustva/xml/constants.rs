pub(crate) const ELSTER_NS: &str = "http://www.elster.de/2002/XMLSchema";
pub(crate) const DS_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

pub(crate) const C14N_ALGORITHM: &str = "http://www.w3.org/TR/2001/REC-xml-c14n-20010315";
pub(crate) const RSA_PSS_SHA256_ALGORITHM: &str =
    "http://www.w3.org/2007/05/xmldsig-more#sha256-rsa-MGF1";
pub(crate) const SHA1_ALGORITHM: &str = "http://www.w3.org/2000/09/xmldsig#sha1";

pub(crate) const TRANSFER_HEADER_VERSION: &str = "8";
pub(crate) const NUTZDATEN_HEADER_VERSION: &str = "11";

pub(crate) const VERFAHREN: &str = "ElsterAnmeldung";
pub(crate) const DATEN_ART: &str = "UStVA";
pub(crate) const VORGANG_SIGNED: &str = "send-Auth";
pub(crate) const VORGANG_UNSIGNED: &str = "send-NoSig";
pub(crate) const TESTMERKER: &str = "700000004";

/// `Empfaenger/@id` for submissions addressed to a tax office.
pub(crate) const RECIPIENT_TAX_OFFICE: &str = "F";
