//! Signing payload construction and transaction signatures.

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::blockchain::canonical::{escape_json, CanonicalValue};
use crate::blockchain::types::{AccountState, BluzelleResult};
use crate::blockchain::wallet::{Wallet, PUBKEY_TYPE};

/// Public key entry of a transaction signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub value: String,
}

/// Signature object attached to a transaction.
///
/// `account_number` and `sequence` are the exact strings that went into the
/// signed payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSignature {
    pub pub_key: PubKey,
    pub signature: String,
    pub account_number: String,
    pub sequence: String,
}

/// Document whose canonical JSON is hashed and signed.
///
/// Field order is part of the wire contract.
#[derive(Serialize)]
struct SignDoc<'a> {
    account_number: &'a str,
    chain_id: &'a str,
    fee: CanonicalValue,
    memo: &'a str,
    msgs: CanonicalValue,
    sequence: &'a str,
}

/// Build the escaped JSON text that gets hashed for signing.
pub fn signing_payload(
    account_number: &str,
    chain_id: &str,
    fee: &Value,
    memo: &str,
    msgs: &Value,
    sequence: &str,
) -> BluzelleResult<String> {
    let doc = SignDoc {
        account_number,
        chain_id,
        fee: CanonicalValue::from_json(fee),
        memo,
        msgs: CanonicalValue::from_json(msgs),
        sequence,
    };
    Ok(escape_json(&serde_json::to_string(&doc)?))
}

/// Signs transaction templates on behalf of a wallet.
pub struct TxSigner<'a> {
    wallet: &'a Wallet,
    chain_id: &'a str,
}

impl<'a> TxSigner<'a> {
    pub fn new(wallet: &'a Wallet, chain_id: &'a str) -> Self {
        Self { wallet, chain_id }
    }

    /// Sign `fee`, `memo` and `msgs` at the given account state.
    pub fn sign(
        &self,
        account: AccountState,
        fee: &Value,
        memo: &str,
        msgs: &Value,
    ) -> BluzelleResult<TxSignature> {
        let account_number = account.account_number.to_string();
        let sequence = account.sequence.to_string();

        let payload = signing_payload(&account_number, self.chain_id, fee, memo, msgs, &sequence)?;
        let digest = Sha256::digest(payload.as_bytes());
        let signature = self.wallet.sign_digest(&digest)?;

        tracing::debug!(
            account_number = %account_number,
            sequence = %sequence,
            payload_len = payload.len(),
            "Transaction signed"
        );

        Ok(TxSignature {
            pub_key: PubKey {
                key_type: PUBKEY_TYPE.to_string(),
                value: self.wallet.public_key_base64(),
            },
            signature: base64::engine::general_purpose::STANDARD.encode(signature),
            account_number,
            sequence,
        })
    }
}
