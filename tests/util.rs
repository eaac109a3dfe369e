#![allow(dead_code)]

use certmint::cert::params::{CertBasicInfo, DistinguishedName};
use certmint::cert::{Certificate, CertificateWithPrivateKey};
use certmint::config::IssuanceConfig;
use certmint::key::KeyPair;

pub fn subject(org: &str, unit: &str, cn: &str) -> DistinguishedName {
    DistinguishedName::builder()
        .country("CN")
        .state("Beijing")
        .locality("Haidian")
        .organization(org)
        .organization_unit(unit)
        .common_name(cn)
        .build()
}

pub fn basic_info(org: &str, unit: &str, cn: &str, years: u32) -> CertBasicInfo {
    CertBasicInfo::builder()
        .subject(subject(org, unit, cn))
        .validity_years(years)
        .build()
}

/// Self-signed root for the given key family.
pub fn generate_ca_cert_with(key: KeyPair, org: &str) -> CertificateWithPrivateKey {
    let config = IssuanceConfig::for_key(&key);
    CertificateWithPrivateKey::new_root(&basic_info(org, "ca", "ca.local", 10), key, &config)
        .unwrap()
}

pub fn generate_ca_cert() -> CertificateWithPrivateKey {
    generate_ca_cert_with(KeyPair::generate_sm2(), "org1")
}

pub fn generate_p256_ca_cert() -> CertificateWithPrivateKey {
    generate_ca_cert_with(KeyPair::generate_ecdsa_p256(), "org1")
}

/// Intermediate CA signed by `parent`, returned with its key.
pub fn generate_intermediate(parent: &CertificateWithPrivateKey) -> CertificateWithPrivateKey {
    let key = match parent.key {
        KeyPair::Sm2 { .. } => KeyPair::generate_sm2(),
        KeyPair::EcdsaP256 { .. } => KeyPair::generate_ecdsa_p256(),
    };
    let config = IssuanceConfig::for_key(&key);
    let cert = parent
        .issue_intermediate_ca(
            &basic_info("org1", "ica", "ica.local", 5),
            &key.public_key(),
            &config,
        )
        .unwrap();
    CertificateWithPrivateKey { cert, key }
}

/// Leaf certificate signed by `issuer`, returned with its key.
pub fn generate_leaf(issuer: &CertificateWithPrivateKey, cn: &str) -> (Certificate, KeyPair) {
    let key = match issuer.key {
        KeyPair::Sm2 { .. } => KeyPair::generate_sm2(),
        KeyPair::EcdsaP256 { .. } => KeyPair::generate_ecdsa_p256(),
    };
    let config = IssuanceConfig::for_key(&issuer.key);
    let cert = issuer
        .issue_leaf(
            &basic_info("org1", "peer", cn, 1),
            &key.public_key(),
            &config,
        )
        .unwrap();
    (cert, key)
}
