use std::fmt::{Debug, Formatter};

use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

use super::{digest::HexDigest, ElectionId, ReceiptDigest, VoterId};

/// Random bytes in a receipt code: 160 bits, rendered as 40 hex characters.
pub const RECEIPT_CODE_BYTES: usize = 20;

/// Characters kept at each end of a masked receipt code.
const MASK_KEEP: usize = 8;

/// A voter's proof of participation.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    #[serde(rename = "_id")]
    pub id: Id,
    pub voter_id: VoterId,
    pub election_id: ElectionId,
    /// The secret handed to the voter. Kept at rest only for masked display.
    pub receipt_code: String,
    /// `ReceiptDigest` of `receipt_code`.
    pub receipt_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    pub ip_address: Option<String>,
}

impl Receipt {
    /// Generate a fresh receipt with a random code from `rng`.
    pub fn generate(
        voter_id: VoterId,
        election_id: ElectionId,
        ip_address: Option<String>,
        mut rng: impl RngCore + CryptoRng,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut bytes = [0u8; RECEIPT_CODE_BYTES];
        rng.fill_bytes(&mut bytes);
        let receipt_code = HEXLOWER.encode(&bytes);
        let receipt_hash = ReceiptDigest::hex(receipt_code.as_bytes());
        Self {
            id: Id::new(),
            voter_id,
            election_id,
            receipt_code,
            receipt_hash,
            created_at,
            ip_address,
        }
    }

    /// Does `code` hash to our stored digest?
    pub fn verify_code(&self, code: &str) -> bool {
        ReceiptDigest::matches(code.as_bytes(), &self.receipt_hash)
    }

    /// The code with everything but its ends hidden, safe for display and logs.
    pub fn masked(&self) -> String {
        mask_code(&self.receipt_code)
    }
}

/// Never print the plaintext code, even in debug output.
impl Debug for Receipt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receipt")
            .field("id", &self.id)
            .field("voter_id", &self.voter_id)
            .field("election_id", &self.election_id)
            .field("receipt_code", &self.masked())
            .field("receipt_hash", &self.receipt_hash)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

fn mask_code(code: &str) -> String {
    let chars: Vec<char> = code.chars().collect();
    if chars.len() > 2 * MASK_KEEP {
        let head: String = chars[..MASK_KEEP].iter().collect();
        let tail: String = chars[chars.len() - MASK_KEEP..].iter().collect();
        format!("{head}...{tail}")
    } else {
        code.to_string()
    }
}
