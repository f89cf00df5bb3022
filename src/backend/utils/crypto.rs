// src/backend/utils/crypto.rs
// Signature verification and deterministic principal derivation.

use crate::error::LegacyError;
use crate::models::common::PrincipalId;
use candid::{CandidType, Principal};
use p256::ecdsa::signature::Verifier;
use p256::ecdsa::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// DER SubjectPublicKeyInfo header for an uncompressed secp256r1 point.
/// The full key is this prefix followed by the 65-byte SEC1 point.
const P256_SPKI_PREFIX: [u8; 26] = [
    0x30, 0x59, 0x30, 0x13, 0x06, 0x07, 0x2a, 0x86, 0x48, 0xce, 0x3d, 0x02, 0x01, 0x06, 0x08,
    0x2a, 0x86, 0x48, 0xce, 0x3d, 0x03, 0x01, 0x07, 0x03, 0x42, 0x00,
];

/// An ECDSA/P-256 authorization: the signer's full DER-encoded public key
/// plus a raw `r || s` signature over a caller-specified message.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct SignedAuthorization {
    #[serde(with = "serde_bytes")]
    pub public_key_der: Vec<u8>,
    /// 64 bytes, `r || s`, both big-endian.
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,
}

/// SHA-256 digest of arbitrary bytes.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Extracts the verifying key out of a DER SubjectPublicKeyInfo blob.
/// Only uncompressed secp256r1 keys are accepted.
fn verifying_key_from_der(public_key_der: &[u8]) -> Result<VerifyingKey, LegacyError> {
    if public_key_der.len() != P256_SPKI_PREFIX.len() + 65
        || public_key_der[..P256_SPKI_PREFIX.len()] != P256_SPKI_PREFIX
    {
        return Err(LegacyError::SignatureInvalid);
    }
    VerifyingKey::from_sec1_bytes(&public_key_der[P256_SPKI_PREFIX.len()..])
        .map_err(|_| LegacyError::SignatureInvalid)
}

/// Verifies `auth.signature` over `message` and binds the public key to the
/// claimed principal: the key's self-authenticating principal must equal
/// `expected`, otherwise any valid key could impersonate any account.
pub fn verify_signed_by(
    message: &[u8],
    auth: &SignedAuthorization,
    expected: &PrincipalId,
) -> Result<(), LegacyError> {
    let key = verifying_key_from_der(&auth.public_key_der)?;
    let signature =
        Signature::from_slice(&auth.signature).map_err(|_| LegacyError::SignatureInvalid)?;
    key.verify(message, &signature)
        .map_err(|_| LegacyError::SignatureInvalid)?;

    if Principal::self_authenticating(&auth.public_key_der) != *expected {
        return Err(LegacyError::SignatureInvalid);
    }
    Ok(())
}

/// The exact creation consent message an owner signs. Byte-for-byte stable;
/// clients build the same string independently.
pub fn creation_message(predicted_legacy: &Principal, timestamp_secs: u64) -> String {
    format!(
        "I agree to legacy at address {} at timestamp {}",
        predicted_legacy.to_text().to_lowercase(),
        timestamp_secs
    )
}

/// Verifies the owner's consent signature for creating a legacy at the
/// predicted address. Freshness of `timestamp_secs` is the router's check.
pub fn verify_creation(
    owner: &PrincipalId,
    predicted_legacy: &Principal,
    timestamp_secs: u64,
    auth: &SignedAuthorization,
) -> Result<(), LegacyError> {
    let message = creation_message(predicted_legacy, timestamp_secs);
    verify_signed_by(message.as_bytes(), auth, owner)
}

/// Digest a beneficiary signs to authorize activation. Packs the deployment
/// domain, the router-kind constant, the legacy id and both principals, so
/// a signature can never be replayed across deployments, variants, legacies
/// or accounts.
pub fn beneficiary_activation_digest(
    domain_id: u64,
    router_kind: u8,
    legacy_id: u64,
    owner: &PrincipalId,
    beneficiary: &PrincipalId,
) -> [u8; 32] {
    let mut packed = Vec::with_capacity(17 + 29 * 2);
    packed.extend_from_slice(&domain_id.to_be_bytes());
    packed.push(router_kind);
    packed.extend_from_slice(&legacy_id.to_be_bytes());
    packed.extend_from_slice(owner.as_slice());
    packed.extend_from_slice(beneficiary.as_slice());
    sha256(&packed)
}

/// Verifies a beneficiary's activation authorization against the packed
/// digest above.
pub fn verify_beneficiary_authorization(
    domain_id: u64,
    router_kind: u8,
    legacy_id: u64,
    owner: &PrincipalId,
    beneficiary: &PrincipalId,
    auth: &SignedAuthorization,
) -> Result<(), LegacyError> {
    let digest =
        beneficiary_activation_digest(domain_id, router_kind, legacy_id, owner, beneficiary);
    verify_signed_by(&digest, auth, beneficiary)
}

/// Deterministic principal a legacy will be known by, computable before the
/// creation call so the consent signature can cover it. Depends only on the
/// owner and their next nonce.
pub fn derive_legacy_principal(owner: &PrincipalId, nonce: u64) -> Principal {
    let mut seed = Vec::with_capacity(32 + 29);
    seed.extend_from_slice(b"legacy-engine:legacy");
    seed.extend_from_slice(owner.as_slice());
    seed.extend_from_slice(&nonce.to_be_bytes());
    Principal::self_authenticating(sha256(&seed))
}
