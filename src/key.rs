use const_oid::ObjectIdentifier;
use der::asn1::{BitString, Uint};
use der::{Any, Decode, Encode, Sequence, Tag};
use ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{
    Signature as P256Signature, SigningKey as P256SigningKey, VerifyingKey as P256VerifyingKey,
};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use sha1::{Digest, Sha1};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::cert::SignatureAlgorithm;
use crate::config::IssuanceConfig;
use crate::error::{CertError, VerifyFailure};

type Result<T> = std::result::Result<T, CertError>;

/// Named curve OID of the SM2 curve (GM/T 0006).
pub const SM2_CURVE_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.156.10197.1.301");

const SCALAR_LEN: usize = 32;

/// Ecdsa-Sig-Value, shared by ECDSA and SM2 signatures in certificates.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
struct SignatureValue {
    r: Uint,
    s: Uint,
}

impl SignatureValue {
    fn from_fixed(r: &[u8], s: &[u8]) -> Result<Self> {
        Ok(Self {
            r: Uint::new(r)?,
            s: Uint::new(s)?,
        })
    }

    /// Left-pads both integers back into the fixed `r || s` layout.
    fn to_fixed(&self) -> std::result::Result<[u8; 2 * SCALAR_LEN], VerifyFailure> {
        let mut out = [0u8; 2 * SCALAR_LEN];
        for (i, part) in [&self.r, &self.s].into_iter().enumerate() {
            let bytes = part.as_bytes();
            if bytes.len() > SCALAR_LEN {
                return Err(VerifyFailure::BadSignature);
            }
            let end = (i + 1) * SCALAR_LEN;
            out[end - bytes.len()..end].copy_from_slice(bytes);
        }
        Ok(out)
    }
}

/// Supported key types for certificate operations.
///
/// The key pair is owned by the caller; certificates only ever borrow it for
/// the duration of a signing call.
#[derive(Clone, Debug)]
pub enum KeyPair {
    Sm2 {
        secret_key: sm2::SecretKey,
        public_key: sm2::PublicKey,
    },
    EcdsaP256 {
        signing_key: P256SigningKey,
        verifying_key: P256VerifyingKey,
    },
}

impl KeyPair {
    /// Generate an SM2 key pair.
    pub fn generate_sm2() -> Self {
        let mut rng = rand_core::OsRng;
        let secret_key = sm2::SecretKey::random(&mut rng);
        let public_key = secret_key.public_key();
        KeyPair::Sm2 {
            secret_key,
            public_key,
        }
    }

    /// Generate an ECDSA P-256 key pair.
    pub fn generate_ecdsa_p256() -> Self {
        let mut rng = rand_core::OsRng;
        let signing_key = P256SigningKey::random(&mut rng);
        let verifying_key = signing_key.verifying_key().to_owned();
        KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        }
    }

    /// Returns the public half of the key pair.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_key_pair(self)
    }

    /// Returns the SubjectPublicKeyInfo of the public half.
    pub fn as_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        self.public_key().to_spki()
    }

    /// Signs `data` with the algorithm named in `config` and returns the DER
    /// encoded signature value.
    pub fn sign_data(&self, data: &[u8], config: &IssuanceConfig) -> Result<Vec<u8>> {
        match (self, config.signature_algorithm) {
            (KeyPair::Sm2 { secret_key, .. }, SignatureAlgorithm::Sm2WithSm3) => {
                let signing_key = sm2::dsa::SigningKey::new(&config.sm2_distid, secret_key)
                    .map_err(|e| CertError::InvalidKey(e.to_string()))?;
                let signature: sm2::dsa::Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CertError::SigningError(e.to_string()))?;
                let bytes = signature.to_bytes();
                let (r, s) = bytes.split_at(SCALAR_LEN);
                Ok(SignatureValue::from_fixed(r, s)?.to_der()?)
            }
            (KeyPair::EcdsaP256 { signing_key, .. }, SignatureAlgorithm::EcdsaWithSha256) => {
                let signature: P256Signature = signing_key
                    .try_sign(data)
                    .map_err(|e| CertError::SigningError(e.to_string()))?;
                Ok(signature.to_der().as_bytes().to_vec())
            }
            (_, algorithm) => Err(CertError::InvalidKey(format!(
                "{} key cannot sign with {algorithm}",
                self.family()
            ))),
        }
    }

    /// Alias of [`KeyPair::sign_data`] for signing arbitrary messages.
    pub fn sign(&self, message: &[u8], config: &IssuanceConfig) -> Result<Vec<u8>> {
        self.sign_data(message, config)
    }

    /// Exports the private key as unencrypted PKCS#8 PEM.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let pem = match self {
            KeyPair::Sm2 { secret_key, .. } => secret_key.to_pkcs8_pem(LineEnding::LF),
            KeyPair::EcdsaP256 { signing_key, .. } => signing_key.to_pkcs8_pem(LineEnding::LF),
        }
        .map_err(|e| CertError::EncodingError(e.to_string()))?;
        Ok(pem.as_str().to_owned())
    }

    /// Imports an unencrypted PKCS#8 PEM private key of either supported curve.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self> {
        if let Ok(secret_key) = sm2::SecretKey::from_pkcs8_pem(pem) {
            let public_key = secret_key.public_key();
            return Ok(KeyPair::Sm2 {
                secret_key,
                public_key,
            });
        }
        let signing_key = P256SigningKey::from_pkcs8_pem(pem)
            .map_err(|e| CertError::DecodingError(e.to_string()))?;
        let verifying_key = signing_key.verifying_key().to_owned();
        Ok(KeyPair::EcdsaP256 {
            signing_key,
            verifying_key,
        })
    }

    fn family(&self) -> &'static str {
        match self {
            KeyPair::Sm2 { .. } => "SM2",
            KeyPair::EcdsaP256 { .. } => "P-256",
        }
    }
}

/// Public key bound into a certificate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PublicKey {
    Sm2(sm2::PublicKey),
    EcdsaP256(P256VerifyingKey),
}

impl PublicKey {
    pub fn from_key_pair(key_pair: &KeyPair) -> Self {
        match key_pair {
            KeyPair::Sm2 { public_key, .. } => PublicKey::Sm2(*public_key),
            KeyPair::EcdsaP256 { verifying_key, .. } => PublicKey::EcdsaP256(*verifying_key),
        }
    }

    /// Uncompressed SEC1 point, which is also the subjectPublicKey bit string.
    pub fn to_sec1_bytes(&self) -> Vec<u8> {
        match self {
            PublicKey::Sm2(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            PublicKey::EcdsaP256(key) => key.to_encoded_point(false).as_bytes().to_vec(),
        }
    }

    pub fn curve_oid(&self) -> ObjectIdentifier {
        match self {
            PublicKey::Sm2(_) => SM2_CURVE_OID,
            PublicKey::EcdsaP256(_) => const_oid::db::rfc5912::SECP_256_R_1,
        }
    }

    /// Builds the id-ecPublicKey SubjectPublicKeyInfo for this key.
    pub fn to_spki(&self) -> Result<SubjectPublicKeyInfoOwned> {
        let curve = self.curve_oid();
        Ok(SubjectPublicKeyInfoOwned {
            algorithm: AlgorithmIdentifierOwned {
                oid: const_oid::db::rfc5912::ID_EC_PUBLIC_KEY,
                parameters: Some(Any::new(Tag::ObjectIdentifier, curve.as_bytes())?),
            },
            subject_public_key: BitString::from_bytes(&self.to_sec1_bytes())?,
        })
    }

    /// DER encoded SubjectPublicKeyInfo.
    pub fn to_der(&self) -> Result<Vec<u8>> {
        self.to_spki()?
            .to_der()
            .map_err(|e| CertError::EncodingError(e.to_string()))
    }

    /// Parses a SubjectPublicKeyInfo taken from a certificate.
    pub fn from_x509spki(spki: &SubjectPublicKeyInfoOwned) -> Result<Self> {
        if spki.algorithm.oid != const_oid::db::rfc5912::ID_EC_PUBLIC_KEY {
            return Err(CertError::InvalidKey(format!(
                "unsupported public key algorithm {}",
                spki.algorithm.oid
            )));
        }
        let curve = spki
            .algorithm
            .parameters
            .as_ref()
            .ok_or_else(|| {
                CertError::InvalidKey("missing curve parameters".to_string())
            })?
            .decode_as::<ObjectIdentifier>()
            .map_err(|e| CertError::InvalidKey(e.to_string()))?;
        let point = spki
            .subject_public_key
            .as_bytes()
            .ok_or_else(|| {
                CertError::InvalidKey("public key has unused bits".to_string())
            })?;
        Self::from_sec1(curve, point)
    }

    /// Parses a DER encoded SubjectPublicKeyInfo.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let spki = SubjectPublicKeyInfoOwned::from_der(der)?;
        Self::from_x509spki(&spki)
    }

    fn from_sec1(curve: ObjectIdentifier, point: &[u8]) -> Result<Self> {
        match curve {
            SM2_CURVE_OID => sm2::PublicKey::from_sec1_bytes(point)
                .map(PublicKey::Sm2)
                .map_err(|e| CertError::InvalidKey(e.to_string())),
            const_oid::db::rfc5912::SECP_256_R_1 => P256VerifyingKey::from_sec1_bytes(point)
                .map(PublicKey::EcdsaP256)
                .map_err(|e| CertError::InvalidKey(e.to_string())),
            other => Err(CertError::InvalidKey(format!("unsupported curve {other}"))),
        }
    }

    /// SHA-1 over the subjectPublicKey bits, the "hash" key identifier method.
    pub fn key_identifier(&self) -> Vec<u8> {
        Sha1::digest(self.to_sec1_bytes()).to_vec()
    }

    /// Checks a DER encoded signature over `data`.
    pub fn verify_signature(
        &self,
        algorithm: SignatureAlgorithm,
        sm2_distid: &str,
        data: &[u8],
        signature: &[u8],
    ) -> std::result::Result<(), VerifyFailure> {
        match (self, algorithm) {
            (PublicKey::Sm2(key), SignatureAlgorithm::Sm2WithSm3) => {
                let verifying_key = sm2::dsa::VerifyingKey::new(sm2_distid, *key)
                    .map_err(|e| VerifyFailure::InvalidAnchorKey(e.to_string()))?;
                let value = SignatureValue::from_der(signature)
                    .map_err(|_| VerifyFailure::BadSignature)?;
                let signature = sm2::dsa::Signature::from_slice(&value.to_fixed()?)
                    .map_err(|_| VerifyFailure::BadSignature)?;
                verifying_key
                    .verify(data, &signature)
                    .map_err(|_| VerifyFailure::BadSignature)
            }
            (PublicKey::EcdsaP256(key), SignatureAlgorithm::EcdsaWithSha256) => {
                let signature =
                    P256Signature::from_der(signature).map_err(|_| VerifyFailure::BadSignature)?;
                key.verify(data, &signature)
                    .map_err(|_| VerifyFailure::BadSignature)
            }
            (_, algorithm) => Err(VerifyFailure::InvalidAnchorKey(format!(
                "key cannot verify {algorithm}"
            ))),
        }
    }
}
