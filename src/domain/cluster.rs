//! Market participants.
//!
//! A [`Cluster`] models a group of validators acting as one participant.
//! Only the static data lives here; everything a cluster earns or pays is
//! tracked separately in its [`Balance`](super::Balance).

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use rust_decimal::Decimal;
use serde::Serialize;

/// Cluster identifier.
///
/// This is the cluster's position in the canonical order of the distribution
/// that created it. The inner value is private so ids only come from a
/// [`StakeDistribution`](super::StakeDistribution).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ClusterId(usize);

impl ClusterId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Get the underlying index.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cluster-{}", self.0)
    }
}

/// Tag shared by every cluster of one distribution.
///
/// Ids are only positions, so two distributions hand out the same ids. The
/// origin tells their clusters apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct Origin(u64);

impl Origin {
    /// A tag no other distribution in this process carries.
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// A cluster of validators.
///
/// Immutable once created. Two clusters are the same participant only if
/// they come from the same distribution and carry the same id; two distinct
/// clusters with equal size and reputation factor are still different
/// participants.
#[derive(Debug, Clone, Copy)]
pub struct Cluster {
    origin: Origin,
    id: ClusterId,
    validator_count: u64,
    reputation_factor: Decimal,
}

impl Cluster {
    pub(crate) const fn new(
        origin: Origin,
        id: ClusterId,
        validator_count: u64,
        reputation_factor: Decimal,
    ) -> Self {
        Self {
            origin,
            id,
            validator_count,
            reputation_factor,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ClusterId {
        self.id
    }

    /// Number of validators in this cluster.
    #[must_use]
    pub const fn validator_count(&self) -> u64 {
        self.validator_count
    }

    /// How much this cluster values reputation.
    #[must_use]
    pub const fn reputation_factor(&self) -> Decimal {
        self.reputation_factor
    }
}

impl PartialEq for Cluster {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin && self.id == other.id
    }
}

impl Eq for Cluster {}

impl Hash for Cluster {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.hash(state);
        self.id.hash(state);
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} validators)", self.id, self.validator_count)
    }
}
