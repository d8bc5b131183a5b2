use bitcoin::hashes::{hash160, Hash};
use bitcoin::secp256k1::{PublicKey as SecpPublicKey, Secp256k1, SecretKey};

use crate::error::{Result, SwapError};
use crate::network::NetworkParams;

/// A private key recovered from WIF. Zeroized on drop.
#[derive(Debug)]
pub struct PrivateKeyBytes {
    pub secret: SecretKey,
    pub compressed: bool,
}

impl Drop for PrivateKeyBytes {
    fn drop(&mut self) {
        self.secret.non_secure_erase();
    }
}

/// Decodes `version_byte || 32-byte-key || [0x01 if compressed]` base58check,
/// verifying the version byte against `network.wif_version_byte`.
pub fn decode_wif(wif: &str, network: NetworkParams) -> Result<PrivateKeyBytes> {
    let payload = bitcoin::base58::decode_check(wif).map_err(|e| SwapError::BadKey(e.to_string()))?;
    if payload.len() != 33 && payload.len() != 34 {
        return Err(SwapError::BadKey(format!(
            "unexpected WIF payload length {}",
            payload.len()
        )));
    }
    if payload[0] != network.wif_version_byte {
        return Err(SwapError::BadKey(format!(
            "WIF version byte {:#x} does not match network {:#x}",
            payload[0], network.wif_version_byte
        )));
    }
    let compressed = match payload.len() {
        34 if payload[33] == 0x01 => true,
        33 => false,
        _ => return Err(SwapError::BadKey("malformed compression flag".into())),
    };
    let secret = SecretKey::from_slice(&payload[1..33]).map_err(|e| SwapError::BadKey(e.to_string()))?;
    Ok(PrivateKeyBytes { secret, compressed })
}

pub fn encode_wif(key: &PrivateKeyBytes, network: NetworkParams) -> String {
    let mut payload = Vec::with_capacity(34);
    payload.push(network.wif_version_byte);
    payload.extend_from_slice(&key.secret.secret_bytes());
    if key.compressed {
        payload.push(0x01);
    }
    bitcoin::base58::encode_check(&payload)
}

/// Public key bytes (33 compressed, 65 uncompressed) derived from a secret key.
pub fn derive_pubkey_bytes<C: bitcoin::secp256k1::Signing>(
    secp: &Secp256k1<C>,
    key: &PrivateKeyBytes,
) -> Vec<u8> {
    let pk = SecpPublicKey::from_secret_key(secp, &key.secret);
    if key.compressed {
        pk.serialize().to_vec()
    } else {
        pk.serialize_uncompressed().to_vec()
    }
}

/// HASH160 of a serialized public key, matching `PublicKey::pubkey_hash`.
pub fn hash160_of(pubkey_bytes: &[u8]) -> [u8; 20] {
    hash160::Hash::hash(pubkey_bytes).to_byte_array()
}

/// Base58Check P2PKH address for a given HASH160 and network.
pub fn p2pkh_address(pubkey_hash: &[u8; 20], network: NetworkParams) -> String {
    let mut payload = Vec::with_capacity(21);
    payload.push(network.p2pkh_version_byte);
    payload.extend_from_slice(pubkey_hash);
    bitcoin::base58::encode_check(&payload)
}

/// Decodes a Base58Check address into its version byte and 20-byte hash,
/// without distinguishing P2PKH from P2SH (caller knows which it expects).
pub fn decode_address(address: &str) -> Result<(u8, [u8; 20])> {
    let payload = bitcoin::base58::decode_check(address)
        .map_err(|e| SwapError::BadKey(format!("bad address: {e}")))?;
    if payload.len() != 21 {
        return Err(SwapError::BadKey(format!(
            "unexpected address payload length {}",
            payload.len()
        )));
    }
    let mut hash = [0u8; 20];
    hash.copy_from_slice(&payload[1..]);
    Ok((payload[0], hash))
}
