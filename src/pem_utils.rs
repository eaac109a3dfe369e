use crate::cert::Certificate;
use crate::error::CertError;

/// PEM label of X.509 certificates.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

/// Convert DER‑encoded data into a PEM‑encoded string with the provided label.
pub fn der_to_pem(der: &[u8], label: &str) -> String {
    let pem = pem::Pem::new(label, der);
    let config = pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF);
    pem::encode_config(&pem, config)
}

/// Convert a PEM‑encoded string to DER‑encoded bytes.
pub fn pem_to_der(pem_str: &str) -> Result<Vec<u8>, CertError> {
    let pem = pem::parse(pem_str).map_err(|e| CertError::DecodingError(e.to_string()))?;
    Ok(pem.contents().to_vec())
}

/// Parses every `CERTIFICATE` block in `bundle`, in order.
///
/// Blocks with other labels (keys, CRLs) are skipped. A bundle without any
/// certificate is an error.
pub fn certificates_from_pem_bundle(bundle: &str) -> Result<Vec<Certificate>, CertError> {
    let blocks = pem::parse_many(bundle).map_err(|e| CertError::DecodingError(e.to_string()))?;
    let certs = blocks
        .iter()
        .filter(|block| block.tag() == CERTIFICATE_LABEL)
        .map(|block| Certificate::from_der(block.contents()))
        .collect::<Result<Vec<_>, _>>()?;
    if certs.is_empty() {
        return Err(CertError::DecodingError(
            "no certificate found in PEM bundle".to_string(),
        ));
    }
    Ok(certs)
}

/// Concatenates the PEM encodings of `certs`.
pub fn certificates_to_pem_bundle(certs: &[Certificate]) -> Result<String, CertError> {
    certs.iter().map(Certificate::to_pem).collect()
}
