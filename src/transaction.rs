use bitcoin::absolute::LockTime;
use bitcoin::consensus::encode::serialize;
use bitcoin::hashes::Hash;
use bitcoin::script::PushBytesBuf;
use bitcoin::secp256k1::{Message, Secp256k1, SecretKey};
use bitcoin::sighash::SighashCache;
use bitcoin::{Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness};

use crate::error::{Result, SwapError};
use crate::keys::{decode_address, decode_wif, derive_pubkey_bytes, hash160_of};
use crate::network::NetworkParams;

pub const SIGHASH_ALL: u32 = 0x01;

/// A fully signed, serialized transaction.
#[derive(Debug)]
pub struct BuiltTransaction {
    pub tx_hex: Vec<u8>,
    pub txid: [u8; 32],
}

/// Reverses a big-endian display-order txid hex string into the internal
/// byte order used by `OutPoint`.
pub fn txid_from_display_hex(hex_str: &str) -> Result<[u8; 32]> {
    let mut bytes = hex::decode(hex_str).map_err(|e| SwapError::BadAmount(e.to_string()))?;
    if bytes.len() != 32 {
        return Err(SwapError::BadAmount(format!(
            "txid must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    bytes.reverse();
    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

fn p2pkh_script(pubkey_hash: &[u8; 20]) -> ScriptBuf {
    use bitcoin::opcodes::all::{OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160};
    ScriptBuf::builder()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(*pubkey_hash)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}

fn destination_script(address: &str, network: NetworkParams) -> Result<ScriptBuf> {
    let (version, hash) = decode_address(address)?;
    if version != network.p2pkh_version_byte {
        return Err(SwapError::BadKey(format!(
            "address version byte {version:#x} does not match network P2PKH byte {:#x}",
            network.p2pkh_version_byte
        )));
    }
    Ok(p2pkh_script(&hash))
}

fn der_signature(secp: &Secp256k1<bitcoin::secp256k1::All>, secret: &SecretKey, sighash: [u8; 32]) -> Result<Vec<u8>> {
    let msg = Message::from_digest(sighash);
    let sig = secp.sign_ecdsa(&msg, secret);
    let mut der = sig.serialize_der().to_vec();
    der.push(SIGHASH_ALL as u8);
    Ok(der)
}

fn finish(tx: Transaction) -> BuiltTransaction {
    let txid = tx.compute_txid().to_byte_array();
    let tx_hex = serialize(&tx);
    BuiltTransaction { tx_hex, txid }
}

/// Inputs shared by claim and refund transaction construction.
pub struct SpendParams<'a> {
    pub funding_txid: [u8; 32],
    pub funding_vout: u32,
    pub redeem_script: &'a ScriptBuf,
    pub privkey_wif: &'a str,
    pub destination_address: &'a str,
    pub input_value: u64,
    pub fee: u64,
    pub network: NetworkParams,
}

fn check_funds(input_value: u64, fee: u64, network: NetworkParams) -> Result<u64> {
    if fee >= input_value {
        return Err(SwapError::Underfunded(format!(
            "fee {fee} >= input value {input_value}"
        )));
    }
    let output_value = input_value - fee;
    if output_value < network.dust_threshold {
        return Err(SwapError::Underfunded(format!(
            "output value {output_value} below dust threshold {}",
            network.dust_threshold
        )));
    }
    Ok(output_value)
}

/// Builds the claim (reveal-preimage) spending transaction: one input
/// satisfying the `OP_IF` branch of the HTLC, one P2PKH output.
pub fn build_claim_transaction(params: &SpendParams, preimage: &[u8; 32]) -> Result<BuiltTransaction> {
    let output_value = check_funds(params.input_value, params.fee, params.network)?;
    let dest_script = destination_script(params.destination_address, params.network)?;
    let key = decode_wif(params.privkey_wif, params.network)?;
    let secp = Secp256k1::new();
    let pubkey_bytes = derive_pubkey_bytes(&secp, &key);

    let outpoint = OutPoint {
        txid: Txid::from_byte_array(params.funding_txid),
        vout: params.funding_vout,
    };

    let mut tx = Transaction {
        version: bitcoin::transaction::Version(1),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(output_value),
            script_pubkey: dest_script,
        }],
    };

    let sighash = {
        let cache = SighashCache::new(&tx);
        cache
            .legacy_signature_hash(0, params.redeem_script, SIGHASH_ALL)
            .map_err(|e| SwapError::SigningFailed(e.to_string()))?
            .to_byte_array()
    };
    let der_sig = der_signature(&secp, &key.secret, sighash)?;

    let preimage_push = PushBytesBuf::try_from(preimage.to_vec())
        .map_err(|_| SwapError::SigningFailed("preimage push too large".into()))?;
    let pubkey_push =
        PushBytesBuf::try_from(pubkey_bytes).map_err(|_| SwapError::SigningFailed("pubkey push too large".into()))?;
    let sig_push =
        PushBytesBuf::try_from(der_sig).map_err(|_| SwapError::SigningFailed("signature push too large".into()))?;
    let redeem_push = PushBytesBuf::try_from(params.redeem_script.to_bytes())
        .map_err(|_| SwapError::SigningFailed("redeem script push too large".into()))?;

    use bitcoin::opcodes::all::OP_PUSHNUM_1;
    tx.input[0].script_sig = ScriptBuf::builder()
        .push_slice(&sig_push)
        .push_slice(&pubkey_push)
        .push_slice(&preimage_push)
        .push_opcode(OP_PUSHNUM_1)
        .push_slice(&redeem_push)
        .into_script();

    Ok(finish(tx))
}

/// Builds the refund (post-timeout) spending transaction: one input
/// satisfying the `OP_ELSE` branch of the HTLC, one P2PKH output.
/// `locktime` must equal the HTLC's timelock; the caller (the coordinator)
/// enforces that it has already elapsed — this builder does not check.
pub fn build_refund_transaction(params: &SpendParams, locktime: u32) -> Result<BuiltTransaction> {
    let output_value = check_funds(params.input_value, params.fee, params.network)?;
    let dest_script = destination_script(params.destination_address, params.network)?;
    let key = decode_wif(params.privkey_wif, params.network)?;
    let secp = Secp256k1::new();
    let pubkey_bytes = derive_pubkey_bytes(&secp, &key);

    let outpoint = OutPoint {
        txid: Txid::from_byte_array(params.funding_txid),
        vout: params.funding_vout,
    };

    let mut tx = Transaction {
        version: bitcoin::transaction::Version(1),
        lock_time: LockTime::from_consensus(locktime),
        input: vec![TxIn {
            previous_output: outpoint,
            script_sig: ScriptBuf::new(),
            sequence: Sequence::from_consensus(0xFFFFFFFE),
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(output_value),
            script_pubkey: dest_script,
        }],
    };

    let sighash = {
        let cache = SighashCache::new(&tx);
        cache
            .legacy_signature_hash(0, params.redeem_script, SIGHASH_ALL)
            .map_err(|e| SwapError::SigningFailed(e.to_string()))?
            .to_byte_array()
    };
    let der_sig = der_signature(&secp, &key.secret, sighash)?;

    let pubkey_push =
        PushBytesBuf::try_from(pubkey_bytes).map_err(|_| SwapError::SigningFailed("pubkey push too large".into()))?;
    let sig_push =
        PushBytesBuf::try_from(der_sig).map_err(|_| SwapError::SigningFailed("signature push too large".into()))?;
    let redeem_push = PushBytesBuf::try_from(params.redeem_script.to_bytes())
        .map_err(|_| SwapError::SigningFailed("redeem script push too large".into()))?;

    tx.input[0].script_sig = ScriptBuf::builder()
        .push_slice(&sig_push)
        .push_slice(&pubkey_push)
        .push_opcode(bitcoin::opcodes::OP_FALSE)
        .push_slice(&redeem_push)
        .into_script();

    Ok(finish(tx))
}

/// HASH160 of a WIF-decoded private key's public key — convenience for
/// tests and for callers that need to confirm a key matches an HTLC side.
pub fn pubkey_hash_for_wif(wif: &str, network: NetworkParams) -> Result<[u8; 20]> {
    let key = decode_wif(wif, network)?;
    let secp = Secp256k1::new();
    let bytes = derive_pubkey_bytes(&secp, &key);
    Ok(hash160_of(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashlock::hash_preimage;
    use crate::keys::{encode_wif, PrivateKeyBytes};
    use crate::script::build_htlc;

    fn test_key(byte: u8, compressed: bool, network: NetworkParams) -> (String, Vec<u8>) {
        let secret = SecretKey::from_slice(&[byte; 32]).unwrap();
        let wif_key = PrivateKeyBytes { secret, compressed };
        let secp = Secp256k1::new();
        let pubkey_bytes = derive_pubkey_bytes(&secp, &wif_key);
        (encode_wif(&wif_key, network), pubkey_bytes)
    }

    #[test]
    fn claim_then_refund_build_structurally_valid_transactions() {
        let network = NetworkParams::bitcoin_regtest();
        let (claim_wif, claim_pk) = test_key(0x11, true, network);
        let (refund_wif, refund_pk) = test_key(0x22, true, network);

        let mut preimage = [0u8; 32];
        preimage[31] = 7;
        let hash = hash_preimage(&preimage);

        let htlc = build_htlc(&hash, 600_000, &claim_pk, &refund_pk, network).unwrap();

        let funding_txid = [0x42u8; 32];
        let dest_hash = [0x55u8; 20];
        let dest_address = crate::keys::p2pkh_address(&dest_hash, network);

        let claim_params = SpendParams {
            funding_txid,
            funding_vout: 0,
            redeem_script: &htlc.redeem_script,
            privkey_wif: &claim_wif,
            destination_address: &dest_address,
            input_value: 100_000,
            fee: 1_000,
            network,
        };
        let claim_tx = build_claim_transaction(&claim_params, &preimage).unwrap();
        assert!(!claim_tx.tx_hex.is_empty());
        assert_eq!(claim_tx.txid.len(), 32);

        let refund_params = SpendParams {
            privkey_wif: &refund_wif,
            ..claim_params
        };
        let refund_tx = build_refund_transaction(&refund_params, htlc.timelock).unwrap();
        assert!(!refund_tx.tx_hex.is_empty());
        assert_ne!(refund_tx.txid, claim_tx.txid);
    }

    #[test]
    fn scenario_f_dust_rejected() {
        let network = NetworkParams::bitcoin_regtest();
        let (wif, pk) = test_key(0x33, true, network);
        let hash = [1u8; 32];
        let htlc = build_htlc(&hash, 100, &pk, &pk, network).unwrap();
        let dest_address = crate::keys::p2pkh_address(&[0u8; 20], network);
        let params = SpendParams {
            funding_txid: [0u8; 32],
            funding_vout: 0,
            redeem_script: &htlc.redeem_script,
            privkey_wif: &wif,
            destination_address: &dest_address,
            input_value: 900,
            fee: 500,
            network,
        };
        let err = build_claim_transaction(&params, &[0u8; 32]).unwrap_err();
        assert!(matches!(err, SwapError::Underfunded(_)));
    }
}
