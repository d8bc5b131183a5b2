use bitcoin::consensus::encode::deserialize;
use bitcoin::hashes::{sha256, Hash};
use bitcoin::script::Instruction;
use bitcoin::Transaction;

use crate::error::{Result, SwapError};

/// Decompiles every input's scriptSig and returns the first 32-byte push
/// whose SHA-256 matches `expected_hash`. `None` — not an error — when no
/// such push exists (a refund, or an unrelated transaction).
pub fn extract_preimage(tx_bytes: &[u8], expected_hash: &[u8; 32]) -> Result<Option<[u8; 32]>> {
    let tx: Transaction =
        deserialize(tx_bytes).map_err(|e| SwapError::MalformedTransaction(e.to_string()))?;

    for input in &tx.input {
        for instruction in input.script_sig.instructions() {
            let instruction =
                instruction.map_err(|e| SwapError::MalformedTransaction(e.to_string()))?;
            if let Instruction::PushBytes(bytes) = instruction {
                if bytes.len() == 32 {
                    let digest = sha256::Hash::hash(bytes.as_bytes()).to_byte_array();
                    if &digest == expected_hash {
                        let mut out = [0u8; 32];
                        out.copy_from_slice(bytes.as_bytes());
                        return Ok(Some(out));
                    }
                }
            }
        }
    }
    Ok(None)
}
