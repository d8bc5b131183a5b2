use bitcoin::hashes::{hash160, Hash};
use bitcoin::opcodes::all::{
    OP_CHECKSIG, OP_CLTV, OP_DROP, OP_DUP, OP_ELSE, OP_ENDIF, OP_EQUAL, OP_EQUALVERIFY,
    OP_HASH160, OP_IF, OP_SHA256,
};
use bitcoin::script::PushBytesBuf;
use bitcoin::{PublicKey, ScriptBuf};

use crate::error::{Result, SwapError};
use crate::network::NetworkParams;

/// Immutable description of one side's HTLC, produced by [`build_htlc`].
#[derive(Debug, Clone)]
pub struct HtlcDescriptor {
    pub redeem_script: ScriptBuf,
    pub address: String,
    pub script_pubkey: ScriptBuf,
    pub hash: [u8; 32],
    pub timelock: u32,
    pub claim_key_hash: [u8; 20],
    pub refund_key_hash: [u8; 20],
    pub network: NetworkParams,
}

fn parse_pubkey(bytes: &[u8]) -> Result<PublicKey> {
    if bytes.len() != 33 && bytes.len() != 65 {
        return Err(SwapError::BadPublicKey(format!(
            "expected 33 or 65 bytes, got {}",
            bytes.len()
        )));
    }
    PublicKey::from_slice(bytes).map_err(|e| SwapError::BadPublicKey(e.to_string()))
}

/// Builds the canonical HTLC redeem script, byte-for-byte:
///
/// ```text
/// OP_IF
///     OP_SHA256 <hash>  OP_EQUALVERIFY
///     OP_DUP OP_HASH160 <HASH160(claim_pubkey)> OP_EQUALVERIFY OP_CHECKSIG
/// OP_ELSE
///     <timelock>  OP_CLTV (CHECKLOCKTIMEVERIFY)  OP_DROP
///     OP_DUP OP_HASH160 <HASH160(refund_pubkey)> OP_EQUALVERIFY OP_CHECKSIG
/// OP_ENDIF
/// ```
pub fn build_htlc(
    hash: &[u8; 32],
    timelock: u32,
    claim_pubkey: &[u8],
    refund_pubkey: &[u8],
    network: NetworkParams,
) -> Result<HtlcDescriptor> {
    if timelock == 0 || timelock > i32::MAX as u32 {
        return Err(SwapError::BadTimelock(format!(
            "timelock must be in 1..=2^31-1, got {timelock}"
        )));
    }

    let claim_key = parse_pubkey(claim_pubkey)?;
    let refund_key = parse_pubkey(refund_pubkey)?;
    let claim_key_hash = claim_key.pubkey_hash().to_byte_array();
    let refund_key_hash = refund_key.pubkey_hash().to_byte_array();

    let hash_push = PushBytesBuf::try_from(hash.to_vec())
        .map_err(|_| SwapError::BadHash(hash.len()))?;

    let redeem_script = ScriptBuf::builder()
        .push_opcode(OP_IF)
        .push_opcode(OP_SHA256)
        .push_slice(&hash_push)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(claim_key_hash)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .push_opcode(OP_ELSE)
        .push_int(timelock as i64)
        .push_opcode(OP_CLTV)
        .push_opcode(OP_DROP)
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(refund_key_hash)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .push_opcode(OP_ENDIF)
        .into_script();

    let script_hash = hash160::Hash::hash(redeem_script.as_bytes()).to_byte_array();

    let mut payload = Vec::with_capacity(21);
    payload.push(network.p2sh_version_byte);
    payload.extend_from_slice(&script_hash);
    let address = bitcoin::base58::encode_check(&payload);

    let script_pubkey = ScriptBuf::builder()
        .push_opcode(OP_HASH160)
        .push_slice(script_hash)
        .push_opcode(OP_EQUAL)
        .into_script();

    Ok(HtlcDescriptor {
        redeem_script,
        address,
        script_pubkey,
        hash: *hash,
        timelock,
        claim_key_hash,
        refund_key_hash,
        network,
    })
}

/// Confirms a P2SH script_pubkey derives from the expected redeem script —
/// useful as an operator sanity check before funding an address and for
/// golden-fixture tests.
pub fn decompile_matches_redeem_script(script_pubkey: &ScriptBuf, redeem_script: &ScriptBuf) -> bool {
    let expected_hash = hash160::Hash::hash(redeem_script.as_bytes()).to_byte_array();
    let expected = ScriptBuf::builder()
        .push_opcode(OP_HASH160)
        .push_slice(expected_hash)
        .push_opcode(OP_EQUAL)
        .into_script();
    *script_pubkey == expected
}
