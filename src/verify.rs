//! Verification of a certificate against one trusted certificate.
//!
//! The anchor is trusted as given: it is not itself checked against anything
//! else, so an intermediate CA may serve as the anchor for the leaves it
//! issued. Revocation and path building are out of reach of this module.

use der::Encode;
use time::OffsetDateTime;
use tracing::debug;

use crate::cert::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, KeyUsage, KeyUsages, SubjectKeyIdentifier,
};
use crate::cert::{Certificate, SignatureAlgorithm};
use crate::config::DEFAULT_SM2_DISTID;
use crate::error::VerifyFailure;

type Result<T> = std::result::Result<T, VerifyFailure>;

/// A store holding a single trust anchor, built for one verification.
#[derive(Debug, Clone)]
pub struct TrustStore<'a> {
    anchor: &'a Certificate,
    sm2_distid: String,
    check_time: Option<OffsetDateTime>,
}

impl<'a> TrustStore<'a> {
    pub fn new(anchor: &'a Certificate) -> Self {
        Self {
            anchor,
            sm2_distid: DEFAULT_SM2_DISTID.to_string(),
            check_time: None,
        }
    }

    /// Distinguishing identifier used when checking SM2 signatures.
    pub fn with_sm2_distid(mut self, distid: impl Into<String>) -> Self {
        self.sm2_distid = distid.into();
        self
    }

    /// Check validity windows at `time` instead of now.
    pub fn at(mut self, time: OffsetDateTime) -> Self {
        self.check_time = Some(time);
        self
    }

    pub fn anchor(&self) -> &Certificate {
        self.anchor
    }

    /// Verifies `cert` against the anchor.
    pub fn verify(&self, cert: &Certificate) -> Result<()> {
        let inner = &cert.inner;
        if inner.signature_algorithm != inner.tbs_certificate.signature {
            return Err(VerifyFailure::AlgorithmMismatch);
        }
        let algorithm = SignatureAlgorithm::from_oid(inner.signature_algorithm.oid)
            .ok_or_else(|| {
                VerifyFailure::UnsupportedAlgorithm(inner.signature_algorithm.oid.to_string())
            })?;

        if der_of(cert.issuer_name())? != der_of(self.anchor.subject_name())? {
            return Err(VerifyFailure::IssuerMismatch);
        }

        if cert != self.anchor {
            self.check_anchor_may_issue(cert)?;
        }

        let tbs_der = der_of(&inner.tbs_certificate)?;
        let signature = inner
            .signature
            .as_bytes()
            .ok_or_else(|| {
                VerifyFailure::Malformed("signature has unused bits".to_string())
            })?;
        let anchor_key = self
            .anchor
            .public_key()
            .map_err(|e| VerifyFailure::InvalidAnchorKey(e.to_string()))?;
        anchor_key.verify_signature(algorithm, &self.sm2_distid, &tbs_der, signature)?;

        let now = self.check_time.unwrap_or_else(OffsetDateTime::now_utc);
        check_validity(cert, "certificate", now)?;
        check_validity(self.anchor, "trust anchor", now)?;

        debug!(subject = %cert.subject_name(), "certificate verified");
        Ok(())
    }

    fn check_anchor_may_issue(&self, cert: &Certificate) -> Result<()> {
        let anchor = self.anchor;
        match anchor.extension::<BasicConstraints>().map_err(malformed)? {
            Some(BasicConstraints { is_ca: true, .. }) => {}
            _ => return Err(VerifyFailure::AnchorNotCa),
        }
        if let Some(usage) = anchor.extension::<KeyUsage>().map_err(malformed)? {
            if !usage.contains(KeyUsages::KeyCertSign) {
                return Err(VerifyFailure::AnchorKeyUsage);
            }
        }
        let aki = cert
            .extension::<AuthorityKeyIdentifier>()
            .map_err(malformed)?
            .and_then(|aki| aki.key_identifier);
        let ski = anchor
            .extension::<SubjectKeyIdentifier>()
            .map_err(malformed)?;
        if let (Some(aki), Some(ski)) = (aki, ski) {
            if aki != ski.0 {
                return Err(VerifyFailure::KeyIdentifierMismatch);
            }
        }
        Ok(())
    }
}

fn check_validity(cert: &Certificate, what: &'static str, now: OffsetDateTime) -> Result<()> {
    if now < cert.not_before().map_err(malformed)? {
        return Err(VerifyFailure::NotYetValid(what));
    }
    if now > cert.expiry_time().map_err(malformed)? {
        return Err(VerifyFailure::Expired(what));
    }
    Ok(())
}

fn der_of<T: Encode>(value: &T) -> Result<Vec<u8>> {
    value.to_der().map_err(malformed)
}

fn malformed(err: impl std::fmt::Display) -> VerifyFailure {
    VerifyFailure::Malformed(err.to_string())
}
