//! Filter for listing tunnels
//!
//! The filter only collects predicates; the directory evaluates them, all
//! of them conjunctively.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::TIME_LAYOUT;

/// A single constraint on listed tunnels
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterPredicate {
    /// Hide soft-deleted tunnels
    NoDeleted,
    Name(String),
    /// Only tunnels that existed at the given instant
    ExistedAt(DateTime<Utc>),
    TunnelId(Uuid),
}

impl FilterPredicate {
    /// Query key and value understood by the directory API
    pub fn query_pair(&self) -> (&'static str, String) {
        match self {
            FilterPredicate::NoDeleted => ("is_deleted", "false".to_string()),
            FilterPredicate::Name(name) => ("name", name.clone()),
            FilterPredicate::ExistedAt(at) => ("existed_at", at.to_rfc3339_opts(TIME_LAYOUT, true)),
            FilterPredicate::TunnelId(id) => ("uuid", id.to_string()),
        }
    }
}

/// Accumulated tunnel list constraints.
///
/// An empty filter means no filtering at all, soft-deleted tunnels
/// included. Predicates are kept in an ordered set, so the order in which
/// they were added does not matter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelFilter {
    predicates: BTreeSet<FilterPredicate>,
}

impl TunnelFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_deleted(&mut self) -> &mut Self {
        self.predicates.insert(FilterPredicate::NoDeleted);
        self
    }

    pub fn by_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.predicates.insert(FilterPredicate::Name(name.into()));
        self
    }

    pub fn by_existed_at(&mut self, at: DateTime<Utc>) -> &mut Self {
        self.predicates.insert(FilterPredicate::ExistedAt(at));
        self
    }

    pub fn by_tunnel_id(&mut self, id: Uuid) -> &mut Self {
        self.predicates.insert(FilterPredicate::TunnelId(id));
        self
    }

    pub fn predicates(&self) -> impl Iterator<Item = &FilterPredicate> {
        self.predicates.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn includes_deleted(&self) -> bool {
        !self.predicates.contains(&FilterPredicate::NoDeleted)
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        self.predicates.iter().map(FilterPredicate::query_pair).collect()
    }
}
