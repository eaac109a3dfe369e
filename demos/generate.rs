use certmint::cert::CertificateWithPrivateKey;
use certmint::cert::params::{CertBasicInfo, DistinguishedName};
use certmint::config::IssuanceConfig;
use certmint::error::CertError;
use certmint::key::KeyPair;

fn info(unit: &str, cn: &str, years: u32) -> CertBasicInfo {
    CertBasicInfo::builder()
        .subject(
            DistinguishedName::builder()
                .country("CN")
                .state("Beijing")
                .locality("Beijing")
                .organization("org1")
                .organization_unit(unit)
                .common_name(cn)
                .build(),
        )
        .validity_years(years)
        .build()
}

fn main() -> Result<(), CertError> {
    // SM2 with SM3 unless P256=1 is set
    let use_p256 = std::env::var("P256").is_ok_and(|v| v == "1");
    let new_key = || {
        if use_p256 {
            KeyPair::generate_ecdsa_p256()
        } else {
            KeyPair::generate_sm2()
        }
    };
    let root_key = new_key();
    let config = IssuanceConfig::for_key(&root_key);

    let root = CertificateWithPrivateKey::new_root(&info("ca", "ca.org1", 10), root_key, &config)?;
    println!("Root CA Certificate PEM:\n{}", root.cert.to_pem()?);
    println!("Root CA Key PEM:\n{}", root.key.to_pkcs8_pem()?);

    let ica_key = new_key();
    let ica_info = info("ica", "ica.org1", 5);
    let ica_cert = root.issue_intermediate_ca(&ica_info, &ica_key.public_key(), &config)?;
    let ica = CertificateWithPrivateKey {
        cert: ica_cert,
        key: ica_key,
    };
    println!("Intermediate CA Certificate PEM:\n{}", ica.cert.to_pem()?);

    let peer_key = new_key();
    let peer_info = info("peer", "peer0.org1", 1);
    let peer = ica.issue_leaf(&peer_info, &peer_key.public_key(), &config)?;
    println!("Leaf Certificate PEM:\n{}", peer.to_pem()?);

    println!("serial      {}", peer.serial_number_hex());
    println!("fingerprint {}", peer.fingerprint_hex()?);
    println!("expires     {}", peer.expiry_text()?);
    println!("verified by intermediate: {}", peer.verify(&ica.cert));
    println!("verified by root:         {}", peer.verify(&root.cert));

    Ok(())
}
