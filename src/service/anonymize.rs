use chrono::Utc;
use rand::rngs::OsRng;

use crate::config::ChoiceRetention;
use crate::model::{
    common::{AnonVote, VoteChoice},
    store::{StoreResult, StoreTransaction},
};

/// Turn a raw choice into an unlinkable tally record, inside `tx`.
///
/// The choice is flagged as anonymized and, under [`ChoiceRetention::Purge`],
/// deleted as well. An already-anonymized choice is left alone and `None` is
/// returned, so a choice never produces two tally records.
///
/// Nothing about the submission beyond the (election, position, candidate)
/// triple reaches the tally record: its ID, nonce and day come from here.
pub async fn anonymize(
    tx: &mut dyn StoreTransaction,
    choice: &mut VoteChoice,
    retention: ChoiceRetention,
) -> StoreResult<Option<AnonVote>> {
    if choice.anonymized {
        return Ok(None);
    }

    let vote = AnonVote::new(
        choice.election_id,
        choice.position_id,
        choice.candidate_id,
        OsRng,
        Utc::now(),
    );
    tx.insert_anon_vote(&vote).await?;
    tx.mark_anonymized(choice.id).await?;
    if retention == ChoiceRetention::Purge {
        tx.delete_choice(choice.id).await?;
    }
    choice.anonymized = true;

    Ok(Some(vote))
}
