use thiserror::Error;

use crate::error::GenerationError;
use crate::object_store::{StorageObject, sort_newest_first};

/// Images attributed to one session, newest first.
pub type ResultSet = Vec<StorageObject>;

/// Nothing new appeared in the bucket, so the most recent objects stand in.
///
/// Another session writing to the same bucket can make these someone else's
/// images. Objects are not tagged with a session at write time, so this
/// cannot be told apart here.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("no new objects appeared after the job; using the {} most recent objects in the bucket", .fallback.len())]
pub struct AttributionUncertain {
    pub fallback: ResultSet,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Derived from objects that appeared between the two snapshots.
    Attributed(ResultSet),
    Uncertain(AttributionUncertain),
}

impl Resolution {
    pub fn images(&self) -> &[StorageObject] {
        match self {
            Resolution::Attributed(images) => images,
            Resolution::Uncertain(uncertain) => &uncertain.fallback,
        }
    }

    pub fn is_attributed(&self) -> bool {
        matches!(self, Resolution::Attributed(_))
    }

    pub fn into_result(self) -> Result<ResultSet, AttributionUncertain> {
        match self {
            Resolution::Attributed(images) => Ok(images),
            Resolution::Uncertain(uncertain) => Err(uncertain),
        }
    }
}

fn newest(mut objects: Vec<StorageObject>, count: usize) -> ResultSet {
    sort_newest_first(&mut objects);
    objects.truncate(count);
    objects
}

/// Picks at most `desired` images: the newest new objects if there are any,
/// else the newest objects of the post-job listing.
///
/// Fails with [`GenerationError::EmptyBucket`] when both inputs are empty.
pub fn resolve(
    diff: Vec<StorageObject>,
    post_snapshot: &[StorageObject],
    desired: usize,
) -> Result<Resolution, GenerationError> {
    if !diff.is_empty() {
        return Ok(Resolution::Attributed(newest(diff, desired)));
    }
    if post_snapshot.is_empty() {
        return Err(GenerationError::EmptyBucket);
    }
    Ok(Resolution::Uncertain(AttributionUncertain {
        fallback: newest(post_snapshot.to_vec(), desired),
    }))
}
