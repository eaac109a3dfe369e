use std::time::Duration;

use der::Encode;
use der::asn1::{BitString, GeneralizedTime, OctetString, UtcTime};
use rand::TryRngCore;
use rand::rngs::OsRng;
use time::OffsetDateTime;
use tracing::warn;
use x509_cert::Version;
use x509_cert::certificate::{CertificateInner, TbsCertificateInner};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;

use crate::cert::params::{CertBasicInfo, ExtensionParam, Validity};
use crate::cert::{Certificate, SignatureAlgorithm};
use crate::config::IssuanceConfig;
use crate::error::CertError;
use crate::key::{KeyPair, PublicKey};

/// Length of generated serial numbers, in bytes.
pub const SERIAL_LEN: usize = 16;

/// Represents the "To Be Signed" (TBS) portion of an X.509 certificate.
///
/// This is an unsigned certificate: version 3, a serial number, a validity
/// window, a subject and its public key, plus whatever issuer and extensions
/// the issuing path adds before it is signed.
///
/// # Fields
/// * `serial_number` - The unique identifier for the certificate.
/// * `issuer` - The distinguished name of the certificate issuer.
/// * `validity` - The validity window.
/// * `subject` - The distinguished name of the certificate subject.
/// * `subject_public_key` - The public key of the certificate subject.
/// * `extensions` - Extensions, in the order they were added.
#[derive(Debug, Clone)]
pub struct TbsCertificate {
    pub serial_number: Vec<u8>,
    pub issuer: Name,
    pub validity: Validity,
    pub subject: Name,
    pub subject_public_key: PublicKey,
    pub extensions: Vec<ExtensionParam>,
}

impl TbsCertificate {
    /// Builds the basic certificate: random 128-bit serial, a validity window
    /// of `validity_years` fixed-length years starting now, the public key and
    /// the subject name. The issuer is left empty and there are no extensions.
    pub fn new_basic(info: &CertBasicInfo, public_key: &PublicKey) -> Result<Self, CertError> {
        if info.validity_years == 0 {
            return Err(CertError::InvalidInput(
                "validity must be at least one year".to_string(),
            ));
        }
        // Catch keys that cannot be encoded now rather than at signing time.
        public_key
            .to_spki()
            .map_err(|e| CertError::InvalidKey(e.to_string()))?;

        Ok(Self {
            serial_number: generate_serial()?,
            issuer: Name::default(),
            validity: Validity::for_years(info.validity_years)?,
            subject: info.subject.as_x509_name()?,
            subject_public_key: public_key.clone(),
            extensions: Vec::new(),
        })
    }

    /// Converts the `TbsCertificate` into a `TbsCertificateInner` for DER encoding.
    pub fn to_tbs_certificate_inner(
        &self,
        signature_algorithm: SignatureAlgorithm,
    ) -> Result<TbsCertificateInner, CertError> {
        let extensions = self
            .extensions
            .iter()
            .map(|ext| {
                Ok(x509_cert::ext::Extension {
                    extn_id: ext.oid,
                    critical: ext.critical,
                    extn_value: OctetString::new(ext.value.clone())?,
                })
            })
            .collect::<Result<Vec<_>, CertError>>()?;

        let validity = x509_cert::time::Validity {
            not_before: to_x509_time(self.validity.not_before)?,
            not_after: to_x509_time(self.validity.not_after)?,
        };

        Ok(TbsCertificateInner {
            version: Version::V3,
            serial_number: SerialNumber::new(&self.serial_number)?,
            signature: signature_algorithm.into(),
            issuer: self.issuer.clone(),
            validity,
            subject: self.subject.clone(),
            subject_public_key_info: self.subject_public_key.to_spki()?,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: (!extensions.is_empty()).then_some(extensions),
        })
    }

    /// Encodes the `TbsCertificate` into DER format.
    pub fn to_der(&self, signature_algorithm: SignatureAlgorithm) -> Result<Vec<u8>, CertError> {
        self.to_tbs_certificate_inner(signature_algorithm)?
            .to_der()
            .map_err(|e| CertError::EncodingError(e.to_string()))
    }

    /// Signs the TBS bytes with `issuer_key` and assembles the certificate.
    pub fn sign(
        self,
        issuer_key: &KeyPair,
        config: &IssuanceConfig,
    ) -> Result<Certificate, CertError> {
        let tbs_certificate = self.to_tbs_certificate_inner(config.signature_algorithm)?;
        let tbs_der = tbs_certificate
            .to_der()
            .map_err(|e| CertError::EncodingError(e.to_string()))?;
        let signature = issuer_key
            .sign_data(&tbs_der, config)
            .inspect_err(|e| warn!(error = %e, "certificate signing failed"))?;

        let inner = CertificateInner {
            tbs_certificate,
            signature_algorithm: config.signature_algorithm.into(),
            signature: BitString::from_bytes(&signature)
                .map_err(|e| CertError::SigningError(e.to_string()))?,
        };
        Ok(Certificate { inner })
    }
}

/// 16 random bytes from the OS with the top bit set, so the serial always
/// has exactly 128 significant bits.
pub fn generate_serial() -> Result<Vec<u8>, CertError> {
    let mut serial = [0u8; SERIAL_LEN];
    OsRng
        .try_fill_bytes(&mut serial)
        .map_err(|e| CertError::SerialGenerationError(e.to_string()))?;
    serial[0] |= 0x80;
    Ok(serial.to_vec())
}

/// UTCTime through 2049, GeneralizedTime from 2050 on (RFC 5280 4.1.2.5).
pub(crate) fn to_x509_time(time: OffsetDateTime) -> Result<Time, CertError> {
    let secs = u64::try_from(time.unix_timestamp())
        .map_err(|_| CertError::InvalidInput(format!("{time} before 1970")))?;
    let date_time = der::DateTime::from_unix_duration(Duration::from_secs(secs))
        .map_err(|e| CertError::InvalidInput(e.to_string()))?;
    if date_time.year() < 2050 {
        Ok(Time::UtcTime(UtcTime::from_date_time(date_time)?))
    } else {
        let generalized = GeneralizedTime::from_date_time(date_time);
        Ok(Time::GeneralTime(generalized))
    }
}

pub(crate) fn from_x509_time(time: &Time) -> Result<OffsetDateTime, CertError> {
    let since_epoch = match time {
        Time::UtcTime(ut) => ut.to_unix_duration(),
        Time::GeneralTime(gt) => gt.to_unix_duration(),
    };
    let secs = i64::try_from(since_epoch.as_secs())
        .map_err(|e| CertError::DecodingError(e.to_string()))?;
    OffsetDateTime::from_unix_timestamp(secs).map_err(|e| CertError::DecodingError(e.to_string()))
}
