//! # certmint - X.509 certificate issuance for small PKIs
//!
//! certmint issues and checks the certificates of a small, self-managed PKI:
//! a self-signed root, intermediate CAs below it, and end-entity (leaf)
//! certificates. It is built on the RustCrypto crates and signs with SM2 over
//! an SM3 digest by default, with ECDSA P-256 / SHA-256 as an alternative.
//!
//! ## Issuance steps
//!
//! Every certificate goes through the same pipeline:
//!
//! 1. [`tbs_certificate::TbsCertificate::new_basic`] fills in a random 128-bit
//!    serial, a validity window of whole 365-day years starting now, the
//!    subject name and the public key.
//! 2. The issuer name is set and a [`cert::profile::CertProfile`] attaches the
//!    extensions in order (CA or leaf set).
//! 3. The DER encoding of the to-be-signed part is signed with the issuer key.
//!
//! Any failure discards the certificate under construction.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use certmint::cert::{Certificate, CertificateWithPrivateKey};
//! use certmint::cert::params::{CertBasicInfo, DistinguishedName};
//! use certmint::config::IssuanceConfig;
//! use certmint::key::KeyPair;
//!
//! # fn main() -> Result<(), certmint::error::CertError> {
//! let config = IssuanceConfig::default();
//!
//! let root_info = CertBasicInfo::builder()
//!     .subject(
//!         DistinguishedName::builder()
//!             .country("CN")
//!             .organization("org1")
//!             .common_name("ca.org1")
//!             .build(),
//!     )
//!     .validity_years(10)
//!     .build();
//! let root = CertificateWithPrivateKey::new_root(&root_info, KeyPair::generate_sm2(), &config)?;
//!
//! let peer_key = KeyPair::generate_sm2();
//! let peer_info = CertBasicInfo::builder()
//!     .subject(
//!         DistinguishedName::builder()
//!             .organization("org1")
//!             .common_name("peer1.org1")
//!             .build(),
//!     )
//!     .validity_years(1)
//!     .build();
//! let peer: Certificate = root.issue_leaf(&peer_info, &peer_key.public_key(), &config)?;
//!
//! assert!(peer.verify(&root.cert));
//! println!("{}", peer.to_pem()?);
//! println!("fingerprint {}", peer.fingerprint_hex()?);
//! println!("expires {}", peer.expiry_text()?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Construction and export return [`error::CertError`]. Verification failure
//! is not an error: [`cert::Certificate::verify`] returns `false`, and
//! [`cert::Certificate::verify_detailed`] explains why with an
//! [`error::VerifyFailure`].
//!
//! ```rust
//! use certmint::{error::CertError, key::KeyPair};
//!
//! match KeyPair::from_pkcs8_pem("invalid pem data") {
//!     Ok(_) => println!("Key imported successfully"),
//!     Err(CertError::DecodingError(msg)) => println!("Failed to read key: {}", msg),
//!     Err(e) => println!("Other error: {}", e),
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`key`]: SM2 and P-256 key pairs, public keys, message signatures
//! - [`cert`]: the signed certificate handle, issuance entry points, export and accessors
//! - [`issuer`]: the signing pipeline shared by self-signed and CA issuance
//! - [`verify`]: verification against a single trust anchor
//! - [`config`]: algorithm selection and the SM2 distinguishing identifier
//! - [`pem_utils`]: PEM helpers and certificate bundles
//! - [`tbs_certificate`]: the unsigned certificate
//! - [`error`]: error types

pub mod cert;
pub mod config;
pub mod error;
pub mod issuer;
pub mod key;
pub mod pem_utils;
pub mod tbs_certificate;
pub mod verify;
