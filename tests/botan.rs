mod util;

use botan::Certificate as BotanCertificate;

use certmint::key::KeyPair;

fn check_cert(cert_der: &[u8]) {
    // Use botan crate to parse the DER and assert it succeeds
    BotanCertificate::load(cert_der).expect("Botan failed to parse certificate");
}

#[test]
#[ignore]
fn test_botan_ecdsa_p256() {
    let ca = util::generate_ca_cert_with(KeyPair::generate_ecdsa_p256(), "Crab widgits SE");
    let (leaf, _) = util::generate_leaf(&ca, "crabs.crabs");

    check_cert(&ca.cert.to_der().unwrap());
    check_cert(&leaf.to_der().unwrap());
}

#[test]
#[ignore]
fn test_botan_sm2() {
    let ca = util::generate_ca_cert();
    let (leaf, _) = util::generate_leaf(&ca, "crabs.crabs");
    check_cert(&ca.cert.to_der().unwrap());
    check_cert(&leaf.to_der().unwrap());
}
