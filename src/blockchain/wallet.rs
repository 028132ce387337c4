//! Session key derivation and digest signing.
//!
//! # Security
//! - The mnemonic is consumed at construction and never stored
//! - Keys are never logged or serialized
//! - The derived address must match the one the caller expects

use base64::Engine;
use bech32::{Bech32, Hrp};
use bip32::{DerivationPath, XPrv};
use bip39::Mnemonic;
use k256::ecdsa::signature::hazmat::PrehashSigner;
use k256::ecdsa::{Signature, SigningKey};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::blockchain::types::{BluzelleError, BluzelleResult};

/// Environment variable consulted when the config file carries no mnemonic.
pub const MNEMONIC_ENV_VAR: &str = "BLUZELLE_MNEMONIC";

/// BIP-44 path of the session account (coin type 118, first address).
pub const DERIVATION_PATH: &str = "m/44'/118'/0'/0/0";

/// Bech32 human-readable prefix of network addresses.
pub const ADDRESS_PREFIX: &str = "bluzelle";

/// Amino type tag of secp256k1 public keys.
pub const PUBKEY_TYPE: &str = "tendermint/PubKeySecp256k1";

/// Private key and address of a session.
#[derive(Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    public_key: [u8; 33],
    address: String,
}

impl Wallet {
    /// Derive the session key from a BIP-39 mnemonic.
    pub fn from_mnemonic(mnemonic: &str) -> BluzelleResult<Self> {
        let mnemonic = Mnemonic::parse_normalized(mnemonic.trim())
            .map_err(|e| BluzelleError::Wallet(format!("Invalid mnemonic: {}", e)))?;
        let seed = mnemonic.to_seed("");

        let path: DerivationPath = DERIVATION_PATH
            .parse()
            .map_err(|e| BluzelleError::Wallet(format!("Invalid derivation path: {}", e)))?;
        let xprv = XPrv::derive_from_path(seed, &path)
            .map_err(|e| BluzelleError::Wallet(format!("Key derivation failed: {}", e)))?;

        Self::from_signing_key(xprv.private_key().clone())
    }

    /// Derive the key and check it against the address the caller expects.
    ///
    /// This is the only authentication step of a session.
    pub fn from_mnemonic_checked(mnemonic: &str, expected_address: &str) -> BluzelleResult<Self> {
        let wallet = Self::from_mnemonic(mnemonic)?;
        if wallet.address != expected_address {
            return Err(BluzelleError::CredentialMismatch {
                expected: expected_address.to_string(),
                derived: wallet.address,
            });
        }

        tracing::info!(address = %wallet.address, "Wallet initialized");
        Ok(wallet)
    }

    fn from_signing_key(signing_key: SigningKey) -> BluzelleResult<Self> {
        let encoded = signing_key.verifying_key().to_encoded_point(true);
        let mut public_key = [0u8; 33];
        public_key.copy_from_slice(encoded.as_bytes());
        let address = public_key_to_address(&public_key, ADDRESS_PREFIX)?;

        Ok(Self {
            signing_key,
            public_key,
            address,
        })
    }

    /// Bech32 address of the session account.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Compressed SEC1 public key.
    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    /// Public key as carried in transaction signatures.
    pub fn public_key_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.public_key)
    }

    /// Sign a 32-byte digest, returning the 64-byte `r || s` compact body.
    ///
    /// RFC 6979 nonces make the result deterministic for a given key and digest.
    pub fn sign_digest(&self, digest: &[u8]) -> BluzelleResult<[u8; 64]> {
        let signature: Signature = self
            .signing_key
            .sign_prehash(digest)
            .map_err(|e| BluzelleError::Wallet(format!("Signing failed: {}", e)))?;
        let signature = signature.normalize_s().unwrap_or(signature);

        let mut out = [0u8; 64];
        out.copy_from_slice(&signature.to_bytes());
        Ok(out)
    }

    #[cfg(test)]
    pub(crate) fn verifying_key(&self) -> &k256::ecdsa::VerifyingKey {
        self.signing_key.verifying_key()
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// bech32(prefix, RIPEMD160(SHA256(pubkey))).
pub fn public_key_to_address(public_key: &[u8; 33], prefix: &str) -> BluzelleResult<String> {
    let sha = Sha256::digest(public_key);
    let ripemd = Ripemd160::digest(sha);

    let hrp = Hrp::parse(prefix)
        .map_err(|e| BluzelleError::Wallet(format!("Invalid address prefix '{}': {}", prefix, e)))?;
    bech32::encode::<Bech32>(hrp, ripemd.as_slice())
        .map_err(|e| BluzelleError::Wallet(format!("Bech32 encoding failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::signature::hazmat::PrehashVerifier;

    // Well-known BIP-39 test vector; never holds funds.
    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    #[test]
    fn test_derivation_is_deterministic() {
        let a = Wallet::from_mnemonic(TEST_MNEMONIC).unwrap();
        let b = Wallet::from_mnemonic(TEST_MNEMONIC).unwrap();
        assert_eq!(a.address(), b.address());
        assert_eq!(a.public_key(), b.public_key());
        assert!(a.address().starts_with("bluzelle1"));
    }

    #[test]
    fn test_address_encodes_pubkey_hash() {
        let wallet = Wallet::from_mnemonic(TEST_MNEMONIC).unwrap();
        let (hrp, data) = bech32::decode(wallet.address()).unwrap();
        assert_eq!(hrp.to_string(), ADDRESS_PREFIX);

        let expected = Ripemd160::digest(Sha256::digest(wallet.public_key()));
        assert_eq!(data, expected.to_vec());
    }

    #[test]
    fn test_compressed_public_key() {
        let wallet = Wallet::from_mnemonic(TEST_MNEMONIC).unwrap();
        assert!(wallet.public_key()[0] == 0x02 || wallet.public_key()[0] == 0x03);
    }

    #[test]
    fn test_malformed_mnemonic() {
        let result = Wallet::from_mnemonic("not a real mnemonic phrase");
        assert!(matches!(result, Err(BluzelleError::Wallet(_))));
    }

    #[test]
    fn test_checked_derivation() {
        let address = Wallet::from_mnemonic(TEST_MNEMONIC).unwrap().address().to_string();
        assert!(Wallet::from_mnemonic_checked(TEST_MNEMONIC, &address).is_ok());

        let result = Wallet::from_mnemonic_checked(TEST_MNEMONIC, "bluzelle1wrongaddress");
        match result {
            Err(BluzelleError::CredentialMismatch { expected, derived }) => {
                assert_eq!(expected, "bluzelle1wrongaddress");
                assert_eq!(derived, address);
            }
            other => panic!("expected credential mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_sign_digest_is_deterministic_and_verifies() {
        let wallet = Wallet::from_mnemonic(TEST_MNEMONIC).unwrap();
        let digest = Sha256::digest(b"payload");

        let first = wallet.sign_digest(&digest).unwrap();
        let second = wallet.sign_digest(&digest).unwrap();
        assert_eq!(first, second);

        let signature = Signature::from_slice(&first).unwrap();
        assert!(wallet.verifying_key().verify_prehash(&digest, &signature).is_ok());
    }

    #[test]
    fn test_known_address() {
        let wallet = Wallet::from_mnemonic(TEST_MNEMONIC).unwrap();
        // same key hash as cosmos19rl4cm2hmr8afy4kldpxz3fka4jguq0auqdal4
        assert_eq!(wallet.address(), "bluzelle19rl4cm2hmr8afy4kldpxz3fka4jguq0afcwley");
        assert_eq!(
            hex::encode(wallet.public_key()),
            "024f4e2ad99c34d60b9ba6283c9431a8418af8673212961f97a77b6377fcd05b62"
        );
    }

    #[test]
    fn test_known_signature() {
        let wallet = Wallet::from_mnemonic(TEST_MNEMONIC).unwrap();
        let digest = Sha256::digest(b"payload");
        assert_eq!(
            hex::encode(wallet.sign_digest(&digest).unwrap()),
            "c29ab05b642477af485d6de25d9c778b3ce7b437b420b14396c664813876f485\
             166179db101faa7ccf846042d20c42b47321b1b0a45f92ae64e5e127f1ffc8a0"
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let wallet = Wallet::from_mnemonic(TEST_MNEMONIC).unwrap();
        let debug = format!("{:?}", wallet);
        assert!(debug.contains("REDACTED"));
    }
}
