//! Detached PKCS#7 (CMS SignedData) signatures with an in-process RSA key.

use super::provider::SignatureProvider;
use super::types::DigestAlgorithm;
use crate::error::{Error, Result};
use cms::builder::{SignedDataBuilder, SignerInfoBuilder};
use cms::cert::x509::Certificate;
use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::signed_data::{EncapsulatedContentInfo, SignerIdentifier};
use der::{Decode, Encode};
use pkcs1::DecodeRsaPrivateKey;
use pkcs8::DecodePrivateKey;
use rsa::pkcs1v15::{Signature, SigningKey};
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use sha2::Sha256;
use spki::AlgorithmIdentifierOwned;
use std::io::Read;

/// Room for the SignedData framing and the signed attributes.
const CMS_OVERHEAD: usize = 2048;

/// Signs with an RSA key and its X.509 certificate, producing
/// `adbe.pkcs7.detached` contents (SHA-256, PKCS#1 v1.5).
pub struct Pkcs7Signer {
    certificate: Certificate,
    certificate_len: usize,
    key: RsaPrivateKey,
}

impl std::fmt::Debug for Pkcs7Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pkcs7Signer")
            .field("subject", &self.certificate.tbs_certificate.subject.to_string())
            .field("key_bits", &(self.key.size() * 8))
            .finish_non_exhaustive()
    }
}

impl Pkcs7Signer {
    /// Load a DER certificate and a DER private key (PKCS#8, or PKCS#1 as a fallback).
    pub fn from_der(certificate: &[u8], private_key: &[u8]) -> Result<Self> {
        let cert = Certificate::from_der(certificate)
            .map_err(|e| Error::signer(format!("invalid certificate: {}", e)))?;
        let key = match RsaPrivateKey::from_pkcs8_der(private_key) {
            Ok(key) => key,
            Err(pkcs8_err) => RsaPrivateKey::from_pkcs1_der(private_key).map_err(|pkcs1_err| {
                Error::signer(format!(
                    "invalid RSA private key (PKCS#8: {}; PKCS#1: {})",
                    pkcs8_err, pkcs1_err
                ))
            })?,
        };
        Ok(Self {
            certificate: cert,
            certificate_len: certificate.len(),
            key,
        })
    }

    /// Read the certificate and key from DER files.
    pub fn from_files(certificate: impl AsRef<std::path::Path>, private_key: impl AsRef<std::path::Path>) -> Result<Self> {
        let cert = std::fs::read(certificate)?;
        let key = std::fs::read(private_key)?;
        Self::from_der(&cert, &key)
    }

    fn build(&self, digest: &[u8]) -> std::result::Result<Vec<u8>, String> {
        let digest_algorithm = AlgorithmIdentifierOwned {
            oid: const_oid::db::rfc5912::ID_SHA_256,
            parameters: None,
        };
        let content = EncapsulatedContentInfo {
            econtent_type: const_oid::db::rfc5911::ID_DATA,
            econtent: None,
        };
        let sid = SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
            issuer: self.certificate.tbs_certificate.issuer.clone(),
            serial_number: self.certificate.tbs_certificate.serial_number.clone(),
        });

        let signing_key = SigningKey::<Sha256>::new(self.key.clone());
        let signer_info = SignerInfoBuilder::new(
            &signing_key,
            sid,
            digest_algorithm.clone(),
            &content,
            Some(digest),
        )
        .map_err(|e| e.to_string())?;

        let content_info = SignedDataBuilder::new(&content)
            .add_digest_algorithm(digest_algorithm)
            .map_err(|e| e.to_string())?
            .add_certificate(CertificateChoices::Certificate(self.certificate.clone()))
            .map_err(|e| e.to_string())?
            .add_signer_info::<SigningKey<Sha256>, Signature>(signer_info)
            .map_err(|e| e.to_string())?
            .build()
            .map_err(|e| e.to_string())?;

        content_info.to_der().map_err(|e| e.to_string())
    }
}

impl SignatureProvider for Pkcs7Signer {
    fn estimate_signature_len(&self) -> usize {
        self.certificate_len + self.key.size() + CMS_OVERHEAD
    }

    fn sign(&self, content: &mut dyn Read) -> Result<Vec<u8>> {
        let digest = DigestAlgorithm::Sha256.digest_reader(content)?;
        log::debug!("CMS message digest {}", hex::encode(&digest));
        self.build(&digest).map_err(Error::signer)
    }
}
