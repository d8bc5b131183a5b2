use bitcoin::hashes::{sha256, Hash};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Result, SwapError};

/// 32 uniformly random secret bytes. Never logged; zeroized on drop.
pub struct Preimage(pub [u8; 32]);

impl Drop for Preimage {
    fn drop(&mut self) {
        for b in self.0.iter_mut() {
            *b = 0;
        }
    }
}

impl Preimage {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|_| SwapError::BadHash(0))?;
        if bytes.len() != 32 {
            return Err(SwapError::BadHash(bytes.len()));
        }
        let mut buf = [0u8; 32];
        buf.copy_from_slice(&bytes);
        Ok(Preimage(buf))
    }
}

/// SHA-256(preimage).
pub fn hash_preimage(preimage: &[u8; 32]) -> [u8; 32] {
    sha256::Hash::hash(preimage).to_byte_array()
}

/// Draws 32 bytes from the OS CSPRNG and returns `(preimage, hash)`.
///
/// Fails with `RngUnavailable` if the system RNG cannot be read — `OsRng`
/// panics rather than returning an error on total RNG failure, so this is
/// realized as a `try_fill_bytes` call whose error is mapped through.
pub fn generate_hashlock() -> Result<(Preimage, [u8; 32])> {
    let mut buf = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut buf)
        .map_err(|_| SwapError::RngUnavailable)?;
    let hash = hash_preimage(&buf);
    Ok((Preimage(buf), hash))
}
