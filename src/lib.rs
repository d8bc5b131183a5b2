//! Core building blocks for a cross-chain Bitcoin/ALT HTLC atomic swap:
//! hashlock generation, legacy P2SH HTLC scripts, claim/refund transaction
//! construction, preimage extraction, an abstract chain client, and the
//! swap coordinator state machine built on top of them.

pub mod chain;
pub mod error;
pub mod hashlock;
pub mod keys;
pub mod network;
pub mod preimage;
pub mod script;
pub mod swap;
pub mod transaction;

pub use chain::{ChainClient, TxStatus, Utxo};
pub use error::{Result, SwapError};
pub use hashlock::{generate_hashlock, hash_preimage, Preimage};
pub use keys::{decode_wif, derive_pubkey_bytes, encode_wif, p2pkh_address, PrivateKeyBytes};
pub use network::NetworkParams;
pub use preimage::extract_preimage;
pub use script::{build_htlc, HtlcDescriptor};
pub use swap::{
    abort_swap, complete_swap, handle_timeout, initiate_swap, verify_funding, watch_for_preimage,
    Amounts, ClaimKeys, ClaimReport, FundingReport, InitiateParams, RefundKeys, RefundReport,
    RequiredConfirmations, SwapRecord, SwapRecordDto, SwapStatus, Timeouts,
};
pub use transaction::{build_claim_transaction, build_refund_transaction, BuiltTransaction, SpendParams};
