//! Strongly-typed identifiers.
//!
//! Catalog items and taxonomy terms are owned by the host platform, which
//! numbers them with positive integers. Lease owners are minted locally.

use core::num::NonZeroU64;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a catalog item on the host platform.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

/// Identifier of a taxonomy term.
///
/// Never zero: the platform's "0 means no such term" convention is expressed
/// as `Option<TermId>` instead.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TermId(NonZeroU64);

/// Identifier of a lease holder (one per acquisition).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseOwnerId(Uuid);

impl ItemId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl TermId {
    /// Wrap a raw platform term id; `0` yields `None`.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl LeaseOwnerId {
    /// Create a new owner id.
    ///
    /// Uses UUIDv7 (time-ordered).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for LeaseOwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::fmt::Display for TermId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl core::fmt::Display for LeaseOwnerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl FromStr for ItemId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(Self)
            .map_err(|e| DomainError::invalid_id(format!("ItemId: {e}")))
    }
}

impl FromStr for TermId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s
            .trim()
            .parse::<u64>()
            .map_err(|e| DomainError::invalid_id(format!("TermId: {e}")))?;
        Self::new(raw).ok_or_else(|| DomainError::invalid_id("TermId: zero is reserved"))
    }
}

impl FromStr for LeaseOwnerId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s)
            .map_err(|e| DomainError::invalid_id(format!("LeaseOwnerId: {e}")))?;
        Ok(Self(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_term_id_is_absent() {
        assert!(TermId::new(0).is_none());
        assert_eq!(TermId::new(42).map(TermId::get), Some(42));
    }

    #[test]
    fn term_id_parse_rejects_zero() {
        assert!(matches!("0".parse::<TermId>(), Err(DomainError::InvalidId(_))));
        assert_eq!("17".parse::<TermId>().unwrap().get(), 17);
    }

    #[test]
    fn item_id_parse_trims() {
        assert_eq!(" 9 ".parse::<ItemId>().unwrap(), ItemId::new(9));
        assert!("nine".parse::<ItemId>().is_err());
    }

    #[test]
    fn lease_owner_round_trips_through_display() {
        let owner = LeaseOwnerId::new();
        let parsed: LeaseOwnerId = owner.to_string().parse().unwrap();
        assert_eq!(parsed, owner);
    }
}
