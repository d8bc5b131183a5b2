use async_trait::async_trait;

use crate::error::Result;

/// One unspent output observed at an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Utxo {
    pub txid: [u8; 32],
    pub vout: u32,
    pub amount_minor: u64,
    pub confirmations: u32,
}

/// Confirmation status of a transaction already known to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxStatus {
    pub confirmations: u32,
    pub block_height: Option<u32>,
}

/// Abstract per-chain operations consumed by the coordinator (C6). One
/// instance per chain (primary, alt). All methods may suspend; this is
/// the only place a coordinator operation suspends (§5).
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_address_utxos(&self, address: &str) -> Result<Vec<Utxo>>;
    async fn get_raw_transaction(&self, txid: &[u8; 32]) -> Result<Vec<u8>>;
    async fn send_raw_transaction(&self, tx_hex: &[u8]) -> Result<[u8; 32]>;
    async fn get_transaction(&self, txid: &[u8; 32]) -> Result<TxStatus>;
    async fn current_time(&self) -> Result<u64>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use bitcoin::consensus::encode::deserialize;
    use bitcoin::hashes::Hash;
    use bitcoin::Transaction;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory `ChainClient` test double: no process-external I/O, used
    /// to drive the coordinator's scenarios deterministically.
    #[derive(Default)]
    pub struct MockChain {
        pub utxos: Mutex<HashMap<String, Vec<Utxo>>>,
        pub raw_txs: Mutex<HashMap<[u8; 32], Vec<u8>>>,
        pub broadcast: Mutex<Vec<Vec<u8>>>,
        pub now: Mutex<u64>,
        pub unavailable: Mutex<bool>,
    }

    impl MockChain {
        pub fn new(now: u64) -> Self {
            MockChain {
                now: Mutex::new(now),
                ..Default::default()
            }
        }

        pub fn fund(&self, address: &str, utxo: Utxo) {
            self.utxos
                .lock()
                .unwrap()
                .entry(address.to_string())
                .or_default()
                .push(utxo);
        }

        pub fn advance_time(&self, seconds: u64) {
            *self.now.lock().unwrap() += seconds;
        }

        pub fn set_unavailable(&self, unavailable: bool) {
            *self.unavailable.lock().unwrap() = unavailable;
        }
    }

    #[async_trait]
    impl ChainClient for MockChain {
        async fn get_address_utxos(&self, address: &str) -> Result<Vec<Utxo>> {
            if *self.unavailable.lock().unwrap() {
                return Err(crate::error::SwapError::ChainUnavailable("mock offline".into()));
            }
            Ok(self
                .utxos
                .lock()
                .unwrap()
                .get(address)
                .cloned()
                .unwrap_or_default())
        }

        async fn get_raw_transaction(&self, txid: &[u8; 32]) -> Result<Vec<u8>> {
            self.raw_txs
                .lock()
                .unwrap()
                .get(txid)
                .cloned()
                .ok_or_else(|| crate::error::SwapError::ChainUnavailable("unknown txid".into()))
        }

        async fn send_raw_transaction(&self, tx_hex: &[u8]) -> Result<[u8; 32]> {
            if *self.unavailable.lock().unwrap() {
                return Err(crate::error::SwapError::ChainUnavailable("mock offline".into()));
            }
            let tx: Transaction = deserialize(tx_hex)
                .map_err(|e| crate::error::SwapError::MalformedTransaction(e.to_string()))?;
            let txid = tx.compute_txid().to_byte_array();
            self.raw_txs.lock().unwrap().insert(txid, tx_hex.to_vec());
            self.broadcast.lock().unwrap().push(tx_hex.to_vec());
            Ok(txid)
        }

        async fn get_transaction(&self, txid: &[u8; 32]) -> Result<TxStatus> {
            if self.raw_txs.lock().unwrap().contains_key(txid) {
                Ok(TxStatus {
                    confirmations: 1,
                    block_height: Some(100),
                })
            } else {
                Err(crate::error::SwapError::ChainUnavailable("unknown txid".into()))
            }
        }

        async fn current_time(&self) -> Result<u64> {
            Ok(*self.now.lock().unwrap())
        }
    }
}
