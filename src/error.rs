//! use certmint::error::{CertError, VerifyFailure};

use thiserror::Error;

/// Represents errors that can occur while building, signing or reading certificates.
///
/// Any error raised during construction means no certificate was produced;
/// a partially built certificate is never handed back to the caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertError {
    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// The random serial number could not be produced.
    #[error("Serial number generation error: {0}")]
    SerialGenerationError(String),

    /// The key is malformed or cannot be used for the requested algorithm.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// An extension could not be computed; the certificate was discarded.
    #[error("Failed to set {extension} extension: {reason}")]
    ExtensionError {
        extension: &'static str,
        reason: String,
    },

    /// The signing primitive failed.
    #[error("Signing error: {0}")]
    SigningError(String),

    /// A caller supplied buffer cannot hold the output. Nothing was written.
    #[error("Buffer too small: {required} bytes required, {provided} provided")]
    BufferTooSmall { required: usize, provided: usize },
}

impl From<der::Error> for CertError {
    /// Converts a `der::Error` into a `CertError`.
    fn from(err: der::Error) -> Self {
        CertError::DecodingError(err.to_string())
    }
}

impl From<pkcs8::Error> for CertError {
    fn from(err: pkcs8::Error) -> Self {
        CertError::InvalidKey(err.to_string())
    }
}

/// Reasons a certificate fails verification against a trust anchor.
///
/// Verification failure is an ordinary outcome; [`crate::cert::Certificate::verify`]
/// collapses these into `false`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifyFailure {
    /// No trust anchor was supplied.
    #[error("no trust anchor supplied")]
    NoTrustAnchor,

    /// The certificate or anchor could not be decoded.
    #[error("malformed certificate: {0}")]
    Malformed(String),

    /// The outer signature algorithm differs from the one inside the signed part.
    #[error("signature algorithm mismatch between certificate and TBS")]
    AlgorithmMismatch,

    /// The signature algorithm is not one this crate can check.
    #[error("unsupported signature algorithm {0}")]
    UnsupportedAlgorithm(String),

    /// The certificate issuer is not the anchor's subject.
    #[error("issuer name does not match trust anchor subject")]
    IssuerMismatch,

    /// The anchor is not allowed to act as a certificate authority.
    #[error("trust anchor is not a CA")]
    AnchorNotCa,

    /// The anchor key usage does not allow certificate signing.
    #[error("trust anchor key usage does not include keyCertSign")]
    AnchorKeyUsage,

    /// The authority key identifier does not name the anchor key.
    #[error("authority key identifier does not match trust anchor")]
    KeyIdentifierMismatch,

    /// The anchor public key cannot be used.
    #[error("trust anchor public key unusable: {0}")]
    InvalidAnchorKey(String),

    /// The signature does not verify with the anchor key.
    #[error("certificate signature is invalid")]
    BadSignature,

    /// The certificate or anchor is not yet valid.
    #[error("{0} is not yet valid")]
    NotYetValid(&'static str),

    /// The certificate or anchor has expired.
    #[error("{0} has expired")]
    Expired(&'static str),

    /// None of the supplied roots verified the certificate.
    #[error("certificate {common_name} not verified by any of {roots} root(s)")]
    NoMatchingRoot { common_name: String, roots: usize },
}
