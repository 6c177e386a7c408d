//! Certificate-backed signing of the declaration payload.
use crate::ustva::xml::constants::{C14N_ALGORITHM, DS_NS, RSA_PSS_SHA256_ALGORITHM, SHA1_ALGORITHM};
use base64ct::{Base64, Encoding};
use p12::PFX;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs8::{ObjectIdentifier, PrivateKeyInfo};
use rsa::pss::{BlindedSigningKey, Signature, VerifyingKey};
use rsa::signature::{RandomizedSigner, SignatureEncoding, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use x509_cert::{der::Decode, Certificate};

/// Salt length in bytes, equal to the SHA-256 output size.
const PSS_SALT_LEN: usize = 32;

const RSA_ENCRYPTION_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const RSASSA_PSS_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.10");

/// Errors raised while opening a PKCS#12 container.
#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("malformed PKCS#12 container: {0}")]
    Container(String),
    #[error("wrong passphrase for PKCS#12 container")]
    BadPassphrase,
    #[error("PKCS#12 container holds no private key")]
    MissingKey,
    #[error("PKCS#12 container holds no certificate")]
    MissingCertificate,
    #[error("unsupported private key: {0}")]
    Key(String),
    #[error("malformed certificate: {0}")]
    Certificate(String),
    #[error("no certificate in the container matches the private key")]
    KeyMismatch,
}

#[derive(Debug, Error)]
pub enum SigningError {
    #[error("signing failed: {0}")]
    Sign(String),
    #[error("certificate public key is not an RSA key: {0}")]
    PublicKey(String),
    #[error("malformed signature: {0}")]
    MalformedSignature(String),
    #[error("signature does not match the signed data")]
    Verification,
}

/// Artifacts of one signing operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureParts {
    digest: String,
    signature: String,
    signed_info: String,
}

impl SignatureParts {
    /// Base64 SHA-1 digest of the payload.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Base64 RSA-PSS signature over [`signed_info`](Self::signed_info).
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// The exact `SignedInfo` bytes that were signed.
    pub fn signed_info(&self) -> &str {
        &self.signed_info
    }
}

/// Private key and certificate taken from a PKCS#12 container.
pub struct SigningContext {
    certificate: Certificate,
    certificate_der: Vec<u8>,
    signing_key: BlindedSigningKey<Sha256>,
}

impl fmt::Debug for SigningContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (issuer, serial) = self.issuer_serial();
        f.debug_struct("SigningContext")
            .field("issuer", &issuer)
            .field("serial", &serial)
            .finish_non_exhaustive()
    }
}

impl SigningContext {
    /// Open a PKCS#12 container (a "soft PSE").
    ///
    /// # Errors
    /// - [`KeyLoadError::BadPassphrase`] if the container MAC does not
    ///   verify with `passphrase`.
    /// - [`KeyLoadError::KeyMismatch`] if none of the certificates belongs to
    ///   the private key.
    /// - other [`KeyLoadError`] variants for malformed or incomplete
    ///   containers.
    pub fn from_pkcs12_der(der: &[u8], passphrase: &str) -> Result<Self, KeyLoadError> {
        let pfx = PFX::parse(der).map_err(|e| KeyLoadError::Container(format!("{e:?}")))?;
        if !pfx.verify_mac(passphrase) {
            tracing::warn!("PKCS#12 container rejected the passphrase");
            return Err(KeyLoadError::BadPassphrase);
        }

        let key_der = pfx
            .key_bags(passphrase)
            .map_err(|e| KeyLoadError::Container(format!("{e:?}")))?
            .into_iter()
            .next()
            .ok_or(KeyLoadError::MissingKey)?;
        let private_key = rsa_private_key(&key_der)?;
        let public_key = private_key.to_public_key();

        let cert_bags = pfx
            .cert_x509_bags(passphrase)
            .map_err(|e| KeyLoadError::Container(format!("{e:?}")))?;
        if cert_bags.is_empty() {
            return Err(KeyLoadError::MissingCertificate);
        }

        let mut selected = None;
        for cert_der in cert_bags {
            let certificate = Certificate::from_der(&cert_der)
                .map_err(|e| KeyLoadError::Certificate(format!("{e:?}")))?;
            // non-RSA certificates in the chain simply do not match
            let matches = certificate_public_key(&certificate)
                .map(|key| key == public_key)
                .unwrap_or(false);
            if matches {
                selected = Some((certificate, cert_der));
                break;
            }
        }
        let (certificate, certificate_der) = selected.ok_or(KeyLoadError::KeyMismatch)?;

        let context = SigningContext {
            certificate,
            certificate_der,
            signing_key: BlindedSigningKey::<Sha256>::new_with_salt_len(private_key, PSS_SALT_LEN),
        };
        let (_, serial) = context.issuer_serial();
        tracing::debug!(serial = %serial, "loaded signing certificate");
        Ok(context)
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// DER bytes of the certificate exactly as stored in the container.
    pub fn certificate_der(&self) -> &[u8] {
        &self.certificate_der
    }

    pub fn certificate_base64(&self) -> String {
        Base64::encode_string(&self.certificate_der)
    }

    /// Issuer distinguished name and decimal serial number, as written into
    /// `X509IssuerSerial`.
    pub fn issuer_serial(&self) -> (String, String) {
        issuer_and_serial(&self.certificate)
    }

    /// Base64 SHA-1 digest of `payload`.
    pub fn digest(&self, payload: &[u8]) -> String {
        digest_base64(payload)
    }

    /// Digest `payload`, build the `SignedInfo` referencing it and sign that.
    ///
    /// RSA-PSS is randomized, so two calls over the same payload return
    /// different signatures that both verify.
    ///
    /// # Errors
    /// Returns [`SigningError::Sign`] if the RSA operation fails.
    pub fn sign(&self, payload: &[u8]) -> Result<SignatureParts, SigningError> {
        let digest = digest_base64(payload);
        tracing::debug!(digest = %digest, bytes = payload.len(), "computed payload digest");

        let signed_info = signed_info_xml(&digest);
        let signature = self
            .signing_key
            .try_sign_with_rng(&mut rand::rngs::OsRng, signed_info.as_bytes())
            .map_err(|e| SigningError::Sign(format!("{e:?}")))?;

        Ok(SignatureParts {
            digest,
            signature: Base64::encode_string(&signature.to_bytes()),
            signed_info,
        })
    }
}

/// Check `signature_b64` over `signed_info` against the public key of
/// `certificate`.
///
/// # Errors
/// Returns [`SigningError::Verification`] if the signature does not match,
/// other variants if the inputs cannot be decoded.
pub fn verify_signature(
    certificate: &Certificate,
    signed_info: &str,
    signature_b64: &str,
) -> Result<(), SigningError> {
    let public_key = certificate_public_key(certificate)?;
    let verifying_key = VerifyingKey::<Sha256>::new_with_salt_len(public_key, PSS_SALT_LEN);
    let bytes = Base64::decode_vec(signature_b64)
        .map_err(|e| SigningError::MalformedSignature(format!("{e:?}")))?;
    let signature = Signature::try_from(bytes.as_slice())
        .map_err(|e| SigningError::MalformedSignature(format!("{e:?}")))?;
    verifying_key
        .verify(signed_info.as_bytes(), &signature)
        .map_err(|_| SigningError::Verification)
}

fn rsa_private_key(pkcs8_der: &[u8]) -> Result<RsaPrivateKey, KeyLoadError> {
    let info = PrivateKeyInfo::try_from(pkcs8_der)
        .map_err(|e| KeyLoadError::Key(format!("{e:?}")))?;
    let oid = info.algorithm.oid;
    if oid != RSA_ENCRYPTION_OID && oid != RSASSA_PSS_OID {
        return Err(KeyLoadError::Key(format!("unsupported key algorithm {oid}")));
    }
    RsaPrivateKey::from_pkcs1_der(info.private_key)
        .map_err(|e| KeyLoadError::Key(format!("{e:?}")))
}

fn certificate_public_key(certificate: &Certificate) -> Result<RsaPublicKey, SigningError> {
    let spki = &certificate.tbs_certificate.subject_public_key_info;
    RsaPublicKey::from_pkcs1_der(spki.subject_public_key.raw_bytes())
        .map_err(|e| SigningError::PublicKey(format!("{e:?}")))
}

fn digest_base64(payload: &[u8]) -> String {
    Base64::encode_string(&Sha1::digest(payload))
}

/// Canonical `SignedInfo` for the signed payload.
///
/// The ELSTER transfer protocol defines the empty-URI reference as the
/// `DatenTeil` element of the envelope, not the whole document. The digest is
/// taken over the exact serialized `DatenTeil` bytes with no transforms, so a
/// generic XMLDSig verifier will not reproduce it from the full envelope.
fn signed_info_xml(digest: &str) -> String {
    format!(
        concat!(
            "<SignedInfo xmlns=\"{ns}\">",
            "<CanonicalizationMethod Algorithm=\"{c14n}\"></CanonicalizationMethod>",
            "<SignatureMethod Algorithm=\"{method}\"></SignatureMethod>",
            "<Reference URI=\"\">",
            "<DigestMethod Algorithm=\"{digest_method}\"></DigestMethod>",
            "<DigestValue>{digest}</DigestValue>",
            "</Reference>",
            "</SignedInfo>"
        ),
        ns = DS_NS,
        c14n = C14N_ALGORITHM,
        method = RSA_PSS_SHA256_ALGORITHM,
        digest_method = SHA1_ALGORITHM,
        digest = digest,
    )
}

fn issuer_and_serial(certificate: &Certificate) -> (String, String) {
    let tbs = &certificate.tbs_certificate;
    let serial = serial_bytes_to_decimal_string(tbs.serial_number.as_bytes());
    let issuer = tbs
        .issuer
        .to_string()
        .split(',')
        .map(|part| part.trim())
        .collect::<Vec<_>>()
        .join(", ");
    (issuer, serial)
}

fn serial_bytes_to_decimal_string(bytes: &[u8]) -> String {
    // little-endian base-10 digits
    let mut digits: Vec<u8> = vec![0];
    for &byte in bytes {
        let mut carry = u32::from(byte);
        for digit in digits.iter_mut() {
            let value = u32::from(*digit) * 256 + carry;
            *digit = (value % 10) as u8;
            carry = value / 10;
        }
        while carry > 0 {
            digits.push((carry % 10) as u8);
            carry /= 10;
        }
    }
    while digits.len() > 1 && digits.last() == Some(&0) {
        digits.pop();
    }
    digits.iter().rev().map(|d| char::from(b'0' + d)).collect()
}
