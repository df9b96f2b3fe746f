use std::fmt::{Display, Formatter};
use std::{ops::Deref, str::FromStr};

use mongodb::bson::{doc, oid::ObjectId, Document};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// Document ID for the records this crate creates (receipts, ballots,
/// vote choices, anonymized votes). Generated client-side so a whole
/// submission can be assembled before anything is written.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id(ObjectId);

impl Id {
    /// A fresh, unique ID.
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(ObjectId::new())
    }

    /// An ID drawn entirely from `rng`. Unlike [`Id::new`], it carries no
    /// creation time and no process counter, so it says nothing about which
    /// other records were written alongside it.
    pub fn random(mut rng: impl RngCore + CryptoRng) -> Self {
        let mut bytes = [0u8; 12];
        rng.fill_bytes(&mut bytes);
        Self(ObjectId::from_bytes(bytes))
    }

    /// A filter document matching this ID.
    pub fn as_doc(&self) -> Document {
        doc! { "_id": self.0 }
    }
}

impl Deref for Id {
    type Target = ObjectId;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_hex())
    }
}

impl FromStr for Id {
    type Err = mongodb::bson::oid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse::<ObjectId>()?))
    }
}

impl From<ObjectId> for Id {
    fn from(id: ObjectId) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trips_through_from_str() {
        let id = Id::new();
        let parsed: Id = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!(id.to_string().len(), 24);
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(Id::new(), Id::new());
        let mut rng = rand::thread_rng();
        assert_ne!(Id::random(&mut rng), Id::random(&mut rng));
    }

    #[test]
    fn random_ids_do_not_follow_the_sequence() {
        let mut rng = rand::thread_rng();
        let sequential = Id::new();
        let random = Id::random(&mut rng);
        // A random timestamp lands within an hour of now about once in
        // 600000 draws.
        let apart =
            random.timestamp().timestamp_millis() - sequential.timestamp().timestamp_millis();
        assert!(apart.abs() > 60 * 60 * 1000, "random ID dated {apart}ms from now");
    }
}
