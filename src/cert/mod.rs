pub mod extensions;
pub mod params;
pub mod profile;

use std::fmt;

use const_oid::ObjectIdentifier;
use der::{Decode, DecodePem, Encode, EncodePem};
use extensions::{BasicConstraints, ToAndFromX509Extension};
use params::{CertBasicInfo, DistinguishedName, ExtensionParam};
use profile::CertProfile;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{debug, info};
use x509_cert::certificate::CertificateInner;
use x509_cert::name::Name;

use crate::config::IssuanceConfig;
use crate::error::{CertError, VerifyFailure};
use crate::issuer::{CaIssuer, Issuer};
use crate::key::{KeyPair, PublicKey};
use crate::tbs_certificate::{TbsCertificate, from_x509_time};
use crate::verify::TrustStore;

pub type Result<T> = std::result::Result<T, CertError>;

type VerifyResult<T> = std::result::Result<T, VerifyFailure>;

/// OID of the SM2 signature with SM3 digest (GM/T 0006).
pub const SM2_WITH_SM3_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.501");

/// Length of a SHA-256 fingerprint.
pub const FINGERPRINT_LEN: usize = 32;

/// Represents the supported signature algorithms for certificates.
///
/// This enum provides a mapping to the corresponding OIDs for each algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    /// SM2 signature over an SM3 digest.
    Sm2WithSm3,
    /// SHA-256 with ECDSA on P-256.
    EcdsaWithSha256,
}

impl SignatureAlgorithm {
    pub fn oid(self) -> ObjectIdentifier {
        match self {
            SignatureAlgorithm::Sm2WithSm3 => SM2_WITH_SM3_OID,
            SignatureAlgorithm::EcdsaWithSha256 => const_oid::db::rfc5912::ECDSA_WITH_SHA_256,
        }
    }

    pub fn from_oid(oid: ObjectIdentifier) -> Option<Self> {
        match oid {
            SM2_WITH_SM3_OID => Some(SignatureAlgorithm::Sm2WithSm3),
            const_oid::db::rfc5912::ECDSA_WITH_SHA_256 => Some(SignatureAlgorithm::EcdsaWithSha256),
            _ => None,
        }
    }

    /// The algorithm a key of this family signs with.
    pub fn for_key(key: &KeyPair) -> Self {
        match key {
            KeyPair::Sm2 { .. } => SignatureAlgorithm::Sm2WithSm3,
            KeyPair::EcdsaP256 { .. } => SignatureAlgorithm::EcdsaWithSha256,
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureAlgorithm::Sm2WithSm3 => f.write_str("SM2-with-SM3"),
            SignatureAlgorithm::EcdsaWithSha256 => f.write_str("ecdsa-with-SHA256"),
        }
    }
}

impl From<SignatureAlgorithm> for x509_cert::spki::AlgorithmIdentifierOwned {
    /// Both algorithms are encoded with absent parameters.
    fn from(value: SignatureAlgorithm) -> Self {
        x509_cert::spki::AlgorithmIdentifierOwned {
            oid: value.oid(),
            parameters: None,
        }
    }
}

/// Represents a signed X.509 certificate.
///
/// Certificates are immutable once signed; every accessor borrows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Creates a new self-signed CA certificate.
    ///
    /// Issuer equals subject, the CA extension set is attached and the
    /// certificate is signed with `key`.
    pub fn new_self_signed(
        info: &CertBasicInfo,
        key: &KeyPair,
        config: &IssuanceConfig,
    ) -> Result<Self> {
        let tbs = TbsCertificate::new_basic(info, &key.public_key())?;

        // For self-signed certificates, the issuer is the same as the subject
        let self_issuer = SelfIssuer {
            name: tbs.subject.clone(),
            key,
        };
        let cert = self_issuer.issue(tbs, &CertProfile::ca(), config)?;
        info!(
            subject = %cert.subject_name(),
            "self-signed certificate generated"
        );
        Ok(cert)
    }

    /// Creates an intermediate CA certificate for `public_key`, issued and
    /// signed by `ca_key` / `ca_cert`. It may itself issue certificates.
    pub fn new_intermediate_ca(
        info: &CertBasicInfo,
        public_key: &PublicKey,
        ca_key: &KeyPair,
        ca_cert: &Certificate,
        config: &IssuanceConfig,
    ) -> Result<Self> {
        let tbs = TbsCertificate::new_basic(info, public_key)?;
        let cert = CaIssuer::new(ca_cert, ca_key).issue(tbs, &CertProfile::ca(), config)?;
        info!(
            subject = %cert.subject_name(),
            issuer = %cert.issuer_name(),
            "intermediate CA certificate generated"
        );
        Ok(cert)
    }

    /// Creates an end-entity certificate for `public_key`, issued and signed
    /// by `ca_key` / `ca_cert`.
    pub fn new_leaf(
        info: &CertBasicInfo,
        public_key: &PublicKey,
        ca_key: &KeyPair,
        ca_cert: &Certificate,
        config: &IssuanceConfig,
    ) -> Result<Self> {
        let tbs = TbsCertificate::new_basic(info, public_key)?;
        let cert = CaIssuer::new(ca_cert, ca_key).issue(tbs, &CertProfile::leaf(), config)?;
        info!(
            subject = %cert.subject_name(),
            issuer = %cert.issuer_name(),
            "leaf certificate generated"
        );
        Ok(cert)
    }

    /// Parses a DER encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_der(der)?,
        })
    }

    /// Parses a single PEM encoded certificate.
    pub fn from_pem(pem: &str) -> Result<Self> {
        Ok(Self {
            inner: CertificateInner::from_pem(pem)?,
        })
    }

    /// Encodes the certificate into DER format.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.inner
            .to_der()
            .map_err(|e| CertError::EncodingError(e.to_string()))
    }

    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CertError::EncodingError(e.to_string()))
    }

    /// Writes the PEM text into `buf` and returns the number of bytes written.
    pub fn write_pem(&self, buf: &mut [u8]) -> Result<usize> {
        write_into(self.to_pem()?.as_bytes(), buf)
    }

    /// SHA-256 over the DER encoding.
    pub fn fingerprint_sha256(&self) -> Result<[u8; FINGERPRINT_LEN]> {
        Ok(Sha256::digest(self.to_der()?).into())
    }

    /// Lowercase hex form of [`Certificate::fingerprint_sha256`].
    pub fn fingerprint_hex(&self) -> Result<String> {
        Ok(hex::encode(self.fingerprint_sha256()?))
    }

    /// Writes the 32-byte fingerprint into `buf` and returns its length.
    pub fn write_fingerprint_sha256(&self, buf: &mut [u8]) -> Result<usize> {
        write_into(&self.fingerprint_sha256()?, buf)
    }

    pub fn not_before(&self) -> Result<OffsetDateTime> {
        from_x509_time(&self.inner.tbs_certificate.validity.not_before)
    }

    /// The notAfter field.
    pub fn expiry_time(&self) -> Result<OffsetDateTime> {
        from_x509_time(&self.inner.tbs_certificate.validity.not_after)
    }

    /// The notAfter field printed like OpenSSL does, e.g. `Mar  4 08:15:00 2031 GMT`.
    pub fn expiry_text(&self) -> Result<String> {
        self.expiry_time()?
            .format(format_description!(
                "[month repr:short] [day padding:space] [hour]:[minute]:[second] [year] GMT"
            ))
            .map_err(|e| CertError::EncodingError(e.to_string()))
    }

    /// Writes [`Certificate::expiry_text`] into `buf` and returns its length.
    pub fn write_expiry_text(&self, buf: &mut [u8]) -> Result<usize> {
        write_into(self.expiry_text()?.as_bytes(), buf)
    }

    pub fn serial_number(&self) -> Vec<u8> {
        self.inner
            .tbs_certificate
            .serial_number
            .as_bytes()
            .to_vec()
    }

    /// Serial number as lowercase hex, without the sign octet.
    pub fn serial_number_hex(&self) -> String {
        let serial = self.serial_number();
        let trimmed = match serial.as_slice() {
            [0, rest @ ..] if !rest.is_empty() => rest,
            all => all,
        };
        hex::encode(trimmed)
    }

    pub fn subject_name(&self) -> &Name {
        &self.inner.tbs_certificate.subject
    }

    pub fn issuer_name(&self) -> &Name {
        &self.inner.tbs_certificate.issuer
    }

    /// Subject attributes; a repeated attribute keeps its last value.
    pub fn subject(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(self.subject_name())
    }

    pub fn issuer(&self) -> DistinguishedName {
        DistinguishedName::from_x509_name(self.issuer_name())
    }

    pub fn common_name(&self) -> String {
        self.subject().common_name
    }

    /// Last organization (O) of the subject. See [`Certificate::organizations`].
    pub fn organization(&self) -> Option<String> {
        self.subject().organization
    }

    /// Every organization (O) of the subject, in name order.
    pub fn organizations(&self) -> Vec<String> {
        params::attribute_values(self.subject_name(), params::ORGANIZATION_OID)
    }

    /// Last organizational unit (OU) of the subject.
    pub fn organizational_unit(&self) -> Option<String> {
        self.subject().organization_unit
    }

    /// Every organizational unit (OU) of the subject, in name order.
    pub fn organizational_units(&self) -> Vec<String> {
        params::attribute_values(self.subject_name(), params::ORGANIZATION_UNIT_OID)
    }

    /// The public key bound into the certificate.
    pub fn public_key(&self) -> Result<PublicKey> {
        PublicKey::from_x509spki(&self.inner.tbs_certificate.subject_public_key_info)
    }

    /// DER encoded SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> Result<Vec<u8>> {
        self.inner
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| CertError::EncodingError(e.to_string()))
    }

    /// `None` when the certificate was signed with an algorithm this crate
    /// does not know.
    pub fn signature_algorithm(&self) -> Option<SignatureAlgorithm> {
        SignatureAlgorithm::from_oid(self.inner.signature_algorithm.oid)
    }

    /// All extensions, in certificate order.
    pub fn extensions(&self) -> Vec<ExtensionParam> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .map(|ext| ExtensionParam {
                oid: ext.extn_id,
                critical: ext.critical,
                value: ext.extn_value.as_bytes().to_vec(),
            })
            .collect()
    }

    /// Decodes the extension of type `E`, if present.
    pub fn extension<E: ToAndFromX509Extension>(&self) -> Result<Option<E>> {
        self.inner
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|ext| ext.extn_id == E::OID)
            .map(|ext| ext.extn_value.as_bytes())
            .map(E::from_x509_extension_value)
            .transpose()
    }

    /// Whether basicConstraints marks this certificate as a CA.
    pub fn is_ca(&self) -> bool {
        matches!(
            self.extension::<BasicConstraints>(),
            Ok(Some(BasicConstraints { is_ca: true, .. }))
        )
    }

    /// Verifies this certificate against a single trust anchor, checking SM2
    /// signatures with the default distinguishing identifier.
    ///
    /// Returns `false` on any failure; use [`Certificate::verify_detailed`]
    /// for the reason.
    pub fn verify(&self, trust_anchor: &Certificate) -> bool {
        self.verify_with_config(trust_anchor, &IssuanceConfig::default())
    }

    /// Like [`Certificate::verify`], using the SM2 identifier from `config`.
    pub fn verify_with_config(&self, trust_anchor: &Certificate, config: &IssuanceConfig) -> bool {
        match self.verify_detailed_with_config(trust_anchor, config) {
            Ok(()) => true,
            Err(reason) => {
                debug!(
                    %reason,
                    subject = %self.subject_name(),
                    "certificate verification failed"
                );
                false
            }
        }
    }

    pub fn verify_detailed(&self, trust_anchor: &Certificate) -> VerifyResult<()> {
        self.verify_detailed_with_config(trust_anchor, &IssuanceConfig::default())
    }

    /// Like [`Certificate::verify_detailed`], using the SM2 identifier from `config`.
    pub fn verify_detailed_with_config(
        &self,
        trust_anchor: &Certificate,
        config: &IssuanceConfig,
    ) -> VerifyResult<()> {
        TrustStore::new(trust_anchor)
            .with_sm2_distid(config.sm2_distid.clone())
            .verify(self)
    }

    /// Tries each root in turn and returns the organization of the first one
    /// that verifies this certificate. SM2 signatures are checked with the
    /// identifier from `config`.
    pub fn check_validation(
        &self,
        roots: &[Certificate],
        config: &IssuanceConfig,
    ) -> VerifyResult<String> {
        if roots.is_empty() {
            return Err(VerifyFailure::NoTrustAnchor);
        }
        for root in roots {
            if self.verify_with_config(root, config) {
                return Ok(root.organization().unwrap_or_default());
            }
        }
        Err(VerifyFailure::NoMatchingRoot {
            common_name: self.common_name(),
            roots: roots.len(),
        })
    }

    /// Checks a signature made by the holder of this certificate's key.
    pub fn verify_signature(
        &self,
        message: &[u8],
        signature: &[u8],
        config: &IssuanceConfig,
    ) -> VerifyResult<()> {
        let key = self
            .public_key()
            .map_err(|e| VerifyFailure::InvalidAnchorKey(e.to_string()))?;
        key.verify_signature(
            config.signature_algorithm,
            &config.sm2_distid,
            message,
            signature,
        )
    }
}

fn write_into(output: &[u8], buf: &mut [u8]) -> Result<usize> {
    if buf.len() < output.len() {
        return Err(CertError::BufferTooSmall {
            required: output.len(),
            provided: buf.len(),
        });
    }
    buf[..output.len()].copy_from_slice(output);
    Ok(output.len())
}

// Helper struct for self-signed certificates
struct SelfIssuer<'a> {
    name: Name,
    key: &'a KeyPair,
}

impl Issuer for SelfIssuer<'_> {
    fn issuer_name(&self) -> Name {
        self.name.clone()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn issuer_certificate(&self) -> Option<&Certificate> {
        None
    }
}

/// A CA certificate together with its private key.
#[derive(Debug, Clone)]
pub struct CertificateWithPrivateKey {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl CertificateWithPrivateKey {
    /// Generates a self-signed root and keeps its key alongside.
    pub fn new_root(info: &CertBasicInfo, key: KeyPair, config: &IssuanceConfig) -> Result<Self> {
        let cert = Certificate::new_self_signed(info, &key, config)?;
        Ok(Self { cert, key })
    }

    pub fn issue_intermediate_ca(
        &self,
        info: &CertBasicInfo,
        public_key: &PublicKey,
        config: &IssuanceConfig,
    ) -> Result<Certificate> {
        Certificate::new_intermediate_ca(info, public_key, &self.key, &self.cert, config)
    }

    pub fn issue_leaf(
        &self,
        info: &CertBasicInfo,
        public_key: &PublicKey,
        config: &IssuanceConfig,
    ) -> Result<Certificate> {
        Certificate::new_leaf(info, public_key, &self.key, &self.cert, config)
    }
}

impl Issuer for CertificateWithPrivateKey {
    fn issuer_name(&self) -> Name {
        // The name of the issuer is the subject of the certificate
        self.cert.subject_name().clone()
    }

    fn signing_key(&self) -> &KeyPair {
        &self.key
    }

    fn issuer_certificate(&self) -> Option<&Certificate> {
        Some(&self.cert)
    }
}
