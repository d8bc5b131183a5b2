/// Base58Check version bytes and message parameters for one chain.
///
/// The redeem script itself is network-independent (§3); only address and
/// WIF encoding read from this struct. Primary and ALT are both plain
/// instances of this type, not variants of a hardcoded enum, so a third
/// Bitcoin-derived chain can be supported without touching C2/C3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    pub p2sh_version_byte: u8,
    pub p2pkh_version_byte: u8,
    pub wif_version_byte: u8,
    pub dust_threshold: u64,
}

impl NetworkParams {
    pub const fn bitcoin_mainnet() -> Self {
        NetworkParams {
            p2sh_version_byte: 0x05,
            p2pkh_version_byte: 0x00,
            wif_version_byte: 0x80,
            dust_threshold: 546,
        }
    }

    pub const fn bitcoin_testnet() -> Self {
        NetworkParams {
            p2sh_version_byte: 0xc4,
            p2pkh_version_byte: 0x6f,
            wif_version_byte: 0xef,
            dust_threshold: 546,
        }
    }

    pub const fn bitcoin_regtest() -> Self {
        // Regtest shares testnet version bytes.
        NetworkParams::bitcoin_testnet()
    }

    /// ALT mainnet: a Bitcoin-derived chain with its own version bytes.
    pub const fn alt_mainnet() -> Self {
        NetworkParams {
            p2sh_version_byte: 0x32,
            p2pkh_version_byte: 0x32,
            wif_version_byte: 0xb2,
            dust_threshold: 546,
        }
    }

    pub const fn alt_testnet() -> Self {
        NetworkParams {
            p2sh_version_byte: 0x13,
            p2pkh_version_byte: 0x6f,
            wif_version_byte: 0xef,
            dust_threshold: 546,
        }
    }
}
