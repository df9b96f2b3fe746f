use chrono::{DateTime, Utc};
use rand::rngs::OsRng;

use crate::model::{
    api::ReceiptVerification,
    common::{ElectionId, HexDigest, Receipt, ReceiptDigest, VoterId},
    store::{BallotStore, ElectionDirectory, StoreResult, StoreTransaction},
};

/// Issue a fresh receipt for `voter` in `election` and stage it in `tx`.
///
/// The code comes from the operating system's CSPRNG. A second receipt for
/// the same voter and election fails at commit with a duplicate error.
pub async fn issue(
    tx: &mut dyn StoreTransaction,
    voter: VoterId,
    election: ElectionId,
    ip_address: Option<String>,
    now: DateTime<Utc>,
) -> StoreResult<Receipt> {
    let receipt = Receipt::generate(voter, election, ip_address, OsRng, now);
    tx.insert_receipt(&receipt).await?;
    Ok(receipt)
}

/// Find the receipt a code belongs to, if the code is genuine.
pub async fn find(store: &dyn BallotStore, code: &str) -> StoreResult<Option<Receipt>> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(None);
    }
    let receipt = store
        .receipt_by_hash(&ReceiptDigest::hex(code.as_bytes()))
        .await?;
    Ok(receipt.filter(|r| r.verify_code(code)))
}

/// Check a presented receipt code. Every kind of miss looks the same.
pub async fn verify(
    store: &dyn BallotStore,
    directory: &dyn ElectionDirectory,
    code: &str,
) -> StoreResult<ReceiptVerification> {
    let Some(receipt) = find(store, code).await? else {
        return Ok(ReceiptVerification::invalid());
    };
    let title = directory
        .election(receipt.election_id)
        .await?
        .map(|e| e.title);
    Ok(ReceiptVerification {
        valid: true,
        election_id: Some(receipt.election_id),
        election_title: title,
        voted_at: Some(receipt.created_at),
    })
}
