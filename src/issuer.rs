use tracing::debug;
use x509_cert::name::Name;

use crate::cert::Certificate;
use crate::cert::profile::CertProfile;
use crate::config::IssuanceConfig;
use crate::error::CertError;
use crate::key::KeyPair;
use crate::tbs_certificate::TbsCertificate;

/// Represents an entity capable of issuing certificates.
///
/// This trait provides methods to retrieve issuer details and issue certificates.
pub trait Issuer {
    /// Returns the distinguished name of the issuer.
    fn issuer_name(&self) -> Name;

    /// Returns the signing key of the issuer.
    fn signing_key(&self) -> &KeyPair;

    /// The issuer's own certificate, `None` for a certificate signing itself.
    fn issuer_certificate(&self) -> Option<&Certificate>;

    /// Sets the issuer name on `tbs`, applies `profile` and signs the result.
    ///
    /// # Arguments
    /// * `tbs` - A basic certificate from [`TbsCertificate::new_basic`].
    /// * `profile` - The extensions to attach, in order.
    /// * `config` - Signature algorithm and SM2 identifier.
    ///
    /// # Returns
    /// The signed certificate. On error the partially built certificate is dropped.
    fn issue(
        &self,
        mut tbs: TbsCertificate,
        profile: &CertProfile,
        config: &IssuanceConfig,
    ) -> Result<Certificate, CertError> {
        tbs.issuer = self.issuer_name();
        profile.apply(&mut tbs, self.issuer_certificate())?;
        debug!(
            algorithm = %config.signature_algorithm,
            issuer = %tbs.issuer,
            "signing certificate"
        );
        tbs.sign(self.signing_key(), config)
    }
}

/// Borrowed CA certificate and key.
pub struct CaIssuer<'a> {
    cert: &'a Certificate,
    key: &'a KeyPair,
}

impl<'a> CaIssuer<'a> {
    pub fn new(cert: &'a Certificate, key: &'a KeyPair) -> Self {
        Self { cert, key }
    }
}

impl Issuer for CaIssuer<'_> {
    fn issuer_name(&self) -> Name {
        self.cert.subject_name().clone()
    }

    fn signing_key(&self) -> &KeyPair {
        self.key
    }

    fn issuer_certificate(&self) -> Option<&Certificate> {
        Some(self.cert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::CertificateWithPrivateKey;
    use crate::cert::params::{CertBasicInfo, DistinguishedName};

    fn info(cn: &str) -> CertBasicInfo {
        let subject = DistinguishedName::builder()
            .common_name(cn)
            .organization("org1")
            .build();
        CertBasicInfo::builder()
            .subject(subject)
            .validity_years(2)
            .build()
    }

    fn root(config: &IssuanceConfig) -> CertificateWithPrivateKey {
        CertificateWithPrivateKey::new_root(&info("root"), KeyPair::generate_sm2(), config).unwrap()
    }

    fn unsigned(cn: &str) -> TbsCertificate {
        let key = KeyPair::generate_sm2();
        TbsCertificate::new_basic(&info(cn), &key.public_key()).unwrap()
    }

    #[test]
    fn test_issue_sets_issuer_from_ca_subject() {
        let config = IssuanceConfig::default();
        let ca = root(&config);
        let cert = CaIssuer::new(&ca.cert, &ca.key)
            .issue(unsigned("peer"), &CertProfile::leaf(), &config)
            .unwrap();
        assert_eq!(cert.issuer_name(), ca.cert.subject_name());
        assert!(cert.verify(&ca.cert));
    }

    #[test]
    fn test_issue_with_custom_profile() {
        let config = IssuanceConfig::default();
        let ca = root(&config);
        let cert = ca
            .issue(unsigned("bare"), &CertProfile::new(vec![]), &config)
            .unwrap();
        assert!(cert.extensions().is_empty());
        assert!(cert.verify(&ca.cert));
    }
}
