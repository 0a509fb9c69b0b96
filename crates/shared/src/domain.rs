use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::is_valid_id;

/// Reviewer name stored when a review does not name its author.
pub const GUEST_REVIEWER: &str = "Guest";

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Accepts only well-formed keys; stored lower-cased.
            pub fn parse(raw: &str) -> Option<Self> {
                is_valid_id(raw).then(|| Self(raw.to_ascii_lowercase()))
            }

            pub fn generate() -> Self {
                Self(generate_key())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(ItemId);
id_newtype!(ReviewId);

// 8 hex chars of creation time followed by 16 random hex chars.
fn generate_key() -> String {
    let seconds = Utc::now().timestamp() as u32;
    let random = Uuid::new_v4().simple().to_string();
    format!("{seconds:08x}{}", &random[..16])
}

/// Star rating, always within `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 5;

    pub fn new(value: i64) -> Option<Self> {
        (Self::MIN..=Self::MAX)
            .contains(&value)
            .then(|| Self(value as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| {
            format!(
                "rating must be between {} and {}, got {value}",
                Self::MIN,
                Self::MAX
            )
        })
    }
}

impl From<Rating> for i64 {
    fn from(value: Rating) -> Self {
        i64::from(value.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub is_deleted: bool,
    pub review_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub item_id: ItemId,
    pub reviewed_by: String,
    pub text: Option<String>,
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// A review that has passed validation but has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    pub item_id: ItemId,
    pub reviewed_by: String,
    pub text: Option<String>,
    pub rating: Rating,
    pub reviewed_at: DateTime<Utc>,
}

/// Partial update of a review. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewFields {
    pub rating: Option<Rating>,
    pub text: Option<String>,
    pub reviewed_by: Option<String>,
}

impl ReviewFields {
    pub fn is_empty(&self) -> bool {
        self.rating.is_none() && self.text.is_none() && self.reviewed_by.is_none()
    }
}

/// Item state with the review that was just written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemWithReview {
    #[serde(flatten)]
    pub item: Item,
    pub review: Review,
}
