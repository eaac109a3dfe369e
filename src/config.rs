use bon::Builder;

use crate::cert::SignatureAlgorithm;

/// Distinguishing identifier used by SM2 signatures when none is configured
/// (GM/T 0009 default).
///
/// OpenSSL 3 verifies SM2 certificate signatures with an empty identifier
/// unless one is passed, e.g. `openssl verify -vfyopt distid:1234567812345678`.
/// Certificates meant for plain `openssl verify` must be issued with
/// `sm2_distid("")`.
pub const DEFAULT_SM2_DISTID: &str = "1234567812345678";

/// Settings shared by every issuance and signature call.
///
/// # Fields
/// * `signature_algorithm` - Digest/signature pair used to sign certificates.
/// * `sm2_distid` - Distinguishing identifier mixed into SM2 signatures.
///
/// # Example
/// ```
/// use certmint::cert::SignatureAlgorithm;
/// use certmint::config::IssuanceConfig;
///
/// let config = IssuanceConfig::builder()
///     .signature_algorithm(SignatureAlgorithm::EcdsaWithSha256)
///     .build();
/// assert_eq!(config.sm2_distid, certmint::config::DEFAULT_SM2_DISTID);
/// ```
#[derive(Clone, Debug, Builder, PartialEq, Eq)]
pub struct IssuanceConfig {
    #[builder(default = SignatureAlgorithm::Sm2WithSm3)]
    pub signature_algorithm: SignatureAlgorithm,
    #[builder(default = DEFAULT_SM2_DISTID.to_string(), into)]
    pub sm2_distid: String,
}

impl Default for IssuanceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl IssuanceConfig {
    /// Picks the signature algorithm matching the family of `key`, keeping
    /// the default SM2 identifier.
    pub fn for_key(key: &crate::key::KeyPair) -> Self {
        Self::builder()
            .signature_algorithm(SignatureAlgorithm::for_key(key))
            .build()
    }
}
