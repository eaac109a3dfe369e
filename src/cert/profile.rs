//! Ordered extension sets applied before a certificate is signed.
//!
//! Rules run in list order against an [`ExtensionContext`] that can see the
//! extensions already added to the certificate under construction. The
//! authority key identifier of a self-signed certificate is read from the
//! subject key identifier set earlier in the same list, so order matters.

use tracing::{debug, error};

use super::Certificate;
use super::extensions::{
    AuthorityKeyIdentifier, BasicConstraints, ExtendedKeyUsage, ExtendedKeyUsageOption, FlagSet,
    KeyUsage, KeyUsages, SubjectKeyIdentifier, ToAndFromX509Extension,
};
use super::params::ExtensionParam;
use crate::error::CertError;
use crate::key::PublicKey;
use crate::tbs_certificate::TbsCertificate;

/// A single extension to compute and attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionRule {
    /// `extendedKeyUsage` with the given purposes, in order.
    ExtendedKeyUsage(Vec<ExtendedKeyUsageOption>),
    /// `subjectKeyIdentifier = hash`.
    SubjectKeyIdentifier,
    /// `authorityKeyIdentifier = keyid:always`.
    AuthorityKeyIdentifier,
    /// `keyUsage` with the given flags.
    KeyUsage(FlagSet<KeyUsages>),
    /// `basicConstraints = CA:<ca>`.
    BasicConstraints { ca: bool },
}

/// What a rule may look at while it is evaluated.
///
/// # Fields
/// * `subject_key` - Public key of the certificate under construction.
/// * `issued` - Extensions already attached to that certificate.
/// * `issuer` - Issuing certificate, `None` when the certificate is self-signed.
pub struct ExtensionContext<'a> {
    pub subject_key: &'a PublicKey,
    pub issued: &'a [ExtensionParam],
    pub issuer: Option<&'a Certificate>,
}

impl ExtensionContext<'_> {
    /// Key identifier of the issuer: its SKI extension, or for a self-signed
    /// certificate the SKI already added to it.
    fn issuer_key_identifier(&self) -> Result<Option<Vec<u8>>, CertError> {
        match self.issuer {
            Some(cert) => Ok(cert.extension::<SubjectKeyIdentifier>()?.map(|ski| ski.0)),
            None => self
                .issued
                .iter()
                .find(|ext| ext.oid == SubjectKeyIdentifier::OID)
                .map(|ext| ext.to_extension::<SubjectKeyIdentifier>())
                .transpose()
                .map(|ski| ski.map(|ski| ski.0)),
        }
    }
}

impl ExtensionRule {
    pub fn name(&self) -> &'static str {
        match self {
            ExtensionRule::ExtendedKeyUsage(_) => ExtendedKeyUsage::NAME,
            ExtensionRule::SubjectKeyIdentifier => SubjectKeyIdentifier::NAME,
            ExtensionRule::AuthorityKeyIdentifier => AuthorityKeyIdentifier::NAME,
            ExtensionRule::KeyUsage(_) => KeyUsage::NAME,
            ExtensionRule::BasicConstraints { .. } => BasicConstraints::NAME,
        }
    }

    /// Computes the extension. Every failure is reported as
    /// [`CertError::ExtensionError`] naming this rule.
    pub fn evaluate(&self, ctx: &ExtensionContext<'_>) -> Result<ExtensionParam, CertError> {
        self.build(ctx).map_err(|e| {
            let reason = match e {
                CertError::ExtensionError { reason, .. } => reason,
                other => other.to_string(),
            };
            CertError::ExtensionError {
                extension: self.name(),
                reason,
            }
        })
    }

    fn build(&self, ctx: &ExtensionContext<'_>) -> Result<ExtensionParam, CertError> {
        match self {
            ExtensionRule::ExtendedKeyUsage(usage) => ExtensionParam::from_extension(
                ExtendedKeyUsage {
                    usage: usage.clone(),
                },
                false,
            ),
            ExtensionRule::SubjectKeyIdentifier => ExtensionParam::from_extension(
                SubjectKeyIdentifier(ctx.subject_key.key_identifier()),
                false,
            ),
            ExtensionRule::AuthorityKeyIdentifier => {
                let key_id = ctx.issuer_key_identifier()?.ok_or_else(|| {
                    CertError::ExtensionError {
                        extension: AuthorityKeyIdentifier::NAME,
                        reason: "unable to get issuer key id".to_string(),
                    }
                })?;
                ExtensionParam::from_extension(AuthorityKeyIdentifier::from_key_id(key_id), false)
            }
            ExtensionRule::KeyUsage(flags) => {
                ExtensionParam::from_extension(KeyUsage(*flags), false)
            }
            ExtensionRule::BasicConstraints { ca } => ExtensionParam::from_extension(
                BasicConstraints {
                    is_ca: *ca,
                    max_path_length: None,
                },
                false,
            ),
        }
    }
}

/// An ordered list of extension rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertProfile {
    rules: Vec<ExtensionRule>,
}

impl CertProfile {
    pub fn new(rules: Vec<ExtensionRule>) -> Self {
        Self { rules }
    }

    /// Extensions of self-signed roots and intermediate CAs.
    pub fn ca() -> Self {
        Self::new(vec![
            ExtensionRule::ExtendedKeyUsage(vec![
                ExtendedKeyUsageOption::ClientAuth,
                ExtendedKeyUsageOption::ServerAuth,
            ]),
            ExtensionRule::SubjectKeyIdentifier,
            ExtensionRule::AuthorityKeyIdentifier,
            ExtensionRule::KeyUsage(
                KeyUsages::DigitalSignature
                    | KeyUsages::KeyEncipherment
                    | KeyUsages::KeyCertSign
                    | KeyUsages::CRLSign,
            ),
            ExtensionRule::BasicConstraints { ca: true },
        ])
    }

    /// Extensions of end-entity certificates.
    pub fn leaf() -> Self {
        Self::new(vec![
            ExtensionRule::AuthorityKeyIdentifier,
            ExtensionRule::KeyUsage(KeyUsages::DigitalSignature.into()),
            ExtensionRule::BasicConstraints { ca: false },
        ])
    }

    pub fn rules(&self) -> &[ExtensionRule] {
        &self.rules
    }

    /// Evaluates every rule in order and appends the results to `tbs`.
    ///
    /// Stops at the first failing rule; the caller must then drop `tbs`.
    pub fn apply(
        &self,
        tbs: &mut TbsCertificate,
        issuer: Option<&Certificate>,
    ) -> Result<(), CertError> {
        for rule in &self.rules {
            let ext = {
                let ctx = ExtensionContext {
                    subject_key: &tbs.subject_public_key,
                    issued: &tbs.extensions,
                    issuer,
                };
                rule.evaluate(&ctx)
                    .inspect_err(|e| error!(error = %e, "set extension failed"))?
            };
            debug!(extension = rule.name(), "extension set");
            tbs.extensions.push(ext);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::{CertBasicInfo, DistinguishedName};
    use crate::key::KeyPair;

    fn basic_tbs(key: &KeyPair) -> TbsCertificate {
        let subject = DistinguishedName::builder()
            .common_name("profile.test")
            .build();
        let info = CertBasicInfo::builder()
            .subject(subject)
            .validity_years(1)
            .build();
        TbsCertificate::new_basic(&info, &key.public_key()).unwrap()
    }

    #[test]
    fn test_ca_profile_order() {
        let key = KeyPair::generate_sm2();
        let mut tbs = basic_tbs(&key);
        CertProfile::ca().apply(&mut tbs, None).unwrap();
        let oids: Vec<_> = tbs.extensions.iter().map(|ext| ext.oid).collect();
        assert_eq!(
            oids,
            vec![
                ExtendedKeyUsage::OID,
                SubjectKeyIdentifier::OID,
                AuthorityKeyIdentifier::OID,
                KeyUsage::OID,
                BasicConstraints::OID,
            ]
        );
        assert!(tbs.extensions.iter().all(|ext| !ext.critical));
    }

    #[test]
    fn test_self_signed_authority_key_id_equals_subject_key_id() {
        let key = KeyPair::generate_sm2();
        let mut tbs = basic_tbs(&key);
        CertProfile::ca().apply(&mut tbs, None).unwrap();
        let aki: AuthorityKeyIdentifier = tbs.extensions[2].to_extension().unwrap();
        assert_eq!(aki.key_identifier, Some(key.public_key().key_identifier()));
    }

    #[test]
    fn test_authority_key_id_before_subject_key_id_fails() {
        let key = KeyPair::generate_sm2();
        let mut tbs = basic_tbs(&key);
        let profile = CertProfile::new(vec![
            ExtensionRule::AuthorityKeyIdentifier,
            ExtensionRule::SubjectKeyIdentifier,
        ]);
        let err = profile.apply(&mut tbs, None).unwrap_err();
        assert_eq!(
            err,
            CertError::ExtensionError {
                extension: "authorityKeyIdentifier",
                reason: "unable to get issuer key id".to_string(),
            }
        );
        assert!(tbs.extensions.is_empty());
    }

    #[test]
    fn test_empty_extended_key_usage_rule_fails() {
        let key = KeyPair::generate_ecdsa_p256();
        let mut tbs = basic_tbs(&key);
        let profile = CertProfile::new(vec![
            ExtensionRule::SubjectKeyIdentifier,
            ExtensionRule::ExtendedKeyUsage(vec![]),
            ExtensionRule::BasicConstraints { ca: true },
        ]);
        let err = profile.apply(&mut tbs, None).unwrap_err();
        assert!(matches!(
            err,
            CertError::ExtensionError {
                extension: "extendedKeyUsage",
                ..
            }
        ));
        // Rules after the failing one never ran.
        assert_eq!(tbs.extensions.len(), 1);
    }
}
