mod util;

use std::fs;
use std::path::PathBuf;
use std::process::{Command, Output};

use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509, X509StoreContext};
use regex::Regex;

use certmint::cert::{Certificate, CertificateWithPrivateKey};
use certmint::config::{DEFAULT_SM2_DISTID, IssuanceConfig};
use certmint::key::KeyPair;

fn to_openssl(cert: &Certificate) -> X509 {
    X509::from_pem(cert.to_pem().unwrap().as_bytes()).expect("Failed to parse PEM")
}

fn openssl_cli_available() -> bool {
    Command::new("openssl")
        .arg("version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}

/// SM2 needs the OpenSSL 3 `-vfyopt` option and its empty default identifier.
fn openssl3_cli_available() -> bool {
    Command::new("openssl")
        .arg("version")
        .output()
        .is_ok_and(|out| out.stdout.starts_with(b"OpenSSL 3"))
}

fn write_temp_pem(name: &str, cert: &Certificate) -> PathBuf {
    let file_name = format!("certmint_{name}_{}.pem", cert.serial_number_hex());
    let path = std::env::temp_dir().join(file_name);
    fs::write(&path, cert.to_pem().unwrap()).expect("Failed to write certificate");
    path
}

/// Runs `openssl verify` on `cert` with `root` as the only trusted certificate.
fn openssl_verify(root: &Certificate, cert: &Certificate, options: &[&str]) -> Output {
    let root_path = write_temp_pem("root", root);
    let cert_path = write_temp_pem("cert", cert);
    let output = Command::new("openssl")
        .arg("verify")
        .args(options)
        .arg("-CAfile")
        .arg(&root_path)
        .arg(&cert_path)
        .output()
        .expect("Failed to execute OpenSSL command");
    fs::remove_file(&root_path).expect("Failed to remove test certificate");
    fs::remove_file(&cert_path).expect("Failed to remove test certificate");
    output
}

fn verified_ok(output: &Output) -> bool {
    output.status.success() && String::from_utf8_lossy(&output.stdout).contains(": OK")
}

fn sm2_root_and_intermediate(config: &IssuanceConfig) -> (Certificate, Certificate) {
    let root = CertificateWithPrivateKey::new_root(
        &util::basic_info("org1", "ca", "ca.local", 10),
        KeyPair::generate_sm2(),
        config,
    )
    .unwrap();
    let ica_key = KeyPair::generate_sm2();
    let ica = root
        .issue_intermediate_ca(
            &util::basic_info("org1", "ica", "ica.local", 5),
            &ica_key.public_key(),
            config,
        )
        .unwrap();
    (root.cert, ica)
}

#[test]
fn test_openssl_validate_cert() {
    if !openssl_cli_available() {
        eprintln!("openssl binary not found, skipping");
        return;
    }
    let ca = util::generate_p256_ca_cert();
    let (server_cert, _) = util::generate_leaf(&ca, "server.local");

    // Save the certificate to a temporary file
    let cert_path = write_temp_pem("server", &server_cert);

    let output = Command::new("openssl")
        .arg("x509")
        .arg("-in")
        .arg(&cert_path)
        .arg("-noout")
        .arg("-text")
        .output()
        .expect("Failed to execute OpenSSL command");
    fs::remove_file(&cert_path).expect("Failed to remove test certificate");

    assert!(
        output.status.success(),
        "OpenSSL command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let output_text = String::from_utf8_lossy(&output.stdout);

    let subject_regex = Regex::new(
        r"Subject: C ?= ?CN, ST ?= ?Beijing, L ?= ?Haidian, O ?= ?org1, OU ?= ?peer, CN ?= ?server\.local",
    )
    .unwrap();
    let issuer_regex = Regex::new(r"Issuer: C ?= ?CN, .*CN ?= ?ca\.local").unwrap();
    assert!(
        subject_regex.is_match(&output_text),
        "Subject field is incorrect"
    );
    assert!(
        issuer_regex.is_match(&output_text),
        "Issuer field is incorrect"
    );
    assert!(
        output_text.contains("Version: 3 (0x2)"),
        "Version field is incorrect"
    );
    assert!(
        output_text.contains("Signature Algorithm: ecdsa-with-SHA256"),
        "Signature Algorithm field is incorrect"
    );
    let not_after = format!("Not After : {}", server_cert.expiry_text().unwrap());
    assert!(
        output_text.contains(&not_after),
        "Not After field does not match expiry text"
    );
    assert!(output_text.contains("CA:FALSE"));
    assert!(output_text.contains("Digital Signature"));
    assert!(output_text.contains("X509v3 Authority Key Identifier"));
    assert!(!output_text.contains("X509v3 Subject Key Identifier"));
}

#[test]
fn test_openssl_crate_validate_cert() {
    let ca = util::generate_p256_ca_cert();
    let (server_cert, _) = util::generate_leaf(&ca, "server.local");
    let x509 = to_openssl(&server_cert);

    let subject = x509
        .subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap();
    assert_eq!(subject.to_string(), "server.local", "Subject CN mismatch");

    let issuer = x509
        .issuer_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap();
    assert_eq!(issuer.to_string(), "ca.local", "Issuer CN mismatch");

    assert_eq!(
        x509.version(),
        2,
        "X509 version should be 3 (0-based index)"
    );

    let serial = x509.serial_number().to_bn().unwrap().to_hex_str().unwrap();
    assert_eq!(serial.to_lowercase(), server_cert.serial_number_hex());

    assert_eq!(
        x509.signature_algorithm().object().nid(),
        Nid::ECDSA_WITH_SHA256,
        "Signature algorithm should be ecdsa-with-SHA256"
    );

    let digest = x509.digest(MessageDigest::sha256()).unwrap();
    assert_eq!(&*digest, &server_cert.fingerprint_sha256().unwrap()[..]);
}

#[test]
fn test_openssl_verifies_chain() {
    let root = util::generate_p256_ca_cert();
    let ica = util::generate_intermediate(&root);
    let (leaf, _) = util::generate_leaf(&ica, "server.local");

    let mut store = X509StoreBuilder::new().unwrap();
    store.add_cert(to_openssl(&root.cert)).unwrap();
    let store = store.build();

    let mut chain = Stack::new().unwrap();
    chain.push(to_openssl(&ica.cert)).unwrap();

    let mut ctx = X509StoreContext::new().unwrap();
    let verified = ctx
        .init(&store, &to_openssl(&leaf), &chain, |c| {
            let ok = c.verify_cert()?;
            if !ok {
                eprintln!("openssl verify error: {}", c.error());
            }
            Ok(ok)
        })
        .unwrap();
    assert!(verified);
}

#[test]
fn test_openssl_rejects_foreign_root() {
    let root = util::generate_p256_ca_cert();
    let other = util::generate_ca_cert_with(KeyPair::generate_ecdsa_p256(), "org2");
    let (leaf, _) = util::generate_leaf(&root, "server.local");

    let mut store = X509StoreBuilder::new().unwrap();
    store.add_cert(to_openssl(&other.cert)).unwrap();
    let store = store.build();
    let chain = Stack::new().unwrap();

    let mut ctx = X509StoreContext::new().unwrap();
    let verified = ctx
        .init(&store, &to_openssl(&leaf), &chain, |c| c.verify_cert())
        .unwrap();
    assert!(!verified);
    assert!(!leaf.verify(&other.cert));
}

#[test]
fn test_openssl_parses_sm2_certificate() {
    let ca = util::generate_ca_cert();
    let x509 = to_openssl(&ca.cert);

    let org = x509
        .subject_name()
        .entries_by_nid(Nid::ORGANIZATIONNAME)
        .next()
        .unwrap()
        .data()
        .as_utf8()
        .unwrap();
    assert_eq!(org.to_string(), "org1");
    let serial = x509.serial_number().to_bn().unwrap().to_hex_str().unwrap();
    assert_eq!(serial.to_lowercase(), ca.cert.serial_number_hex());
    let digest = x509.digest(MessageDigest::sha256()).unwrap();
    assert_eq!(&*digest, &ca.cert.fingerprint_sha256().unwrap()[..]);
}

#[test]
fn test_openssl_cli_verifies_sm2_chain_with_default_distid() {
    if !openssl3_cli_available() {
        eprintln!("OpenSSL 3 binary not found, skipping");
        return;
    }
    let (root, ica) = sm2_root_and_intermediate(&IssuanceConfig::default());

    let distid = format!("distid:{DEFAULT_SM2_DISTID}");
    let output = openssl_verify(&root, &ica, &["-vfyopt", distid.as_str()]);
    assert!(
        verified_ok(&output),
        "openssl verify failed: {}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    // Without the identifier OpenSSL 3 checks against an empty one.
    let output = openssl_verify(&root, &ica, &[]);
    assert!(!verified_ok(&output));
}

#[test]
fn test_openssl_cli_verifies_sm2_chain_with_empty_distid() {
    if !openssl3_cli_available() {
        eprintln!("OpenSSL 3 binary not found, skipping");
        return;
    }
    let config = IssuanceConfig::builder().sm2_distid("").build();
    let (root, ica) = sm2_root_and_intermediate(&config);
    assert!(ica.verify_with_config(&root, &config));

    let output = openssl_verify(&root, &ica, &[]);
    assert!(
        verified_ok(&output),
        "openssl verify failed: {}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}
