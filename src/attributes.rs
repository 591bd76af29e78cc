//! BGP path attributes carried by a prefix and the rules for merging two
//! contributors into an aggregate route (RFC 4271, section 9.2.2.2).
//!
//! Only MED, ORIGIN, ATOMIC_AGGREGATE and communities are modelled.
//! AS_PATH and extended communities are not computed for aggregates.

use crate::error::{AppError, AppErrorKind};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The ORIGIN attribute. The derived ordering is the aggregation precedence:
/// `Incomplete` > `Egp` > `Igp`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    #[default]
    Igp,
    Egp,
    Incomplete,
}

impl Display for Origin {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Igp => write!(f, "igp"),
            Origin::Egp => write!(f, "egp"),
            Origin::Incomplete => write!(f, "incomplete"),
        }
    }
}

impl FromStr for Origin {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "igp" => Ok(Origin::Igp),
            "egp" => Ok(Origin::Egp),
            "incomplete" => Ok(Origin::Incomplete),
            _ => Err(AppError::new(
                AppErrorKind::ParseError,
                format!("unknown origin: {s}").as_str(),
            )),
        }
    }
}

/// Routing metadata attached to a prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteAttributes {
    pub communities: BTreeSet<String>,
    pub med: Option<u32>,
    pub origin: Origin,
    pub atomic_aggregate: bool,
}

impl RouteAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_med(mut self, med: u32) -> Self {
        self.med = Some(med);
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub fn with_atomic_aggregate(mut self, atomic_aggregate: bool) -> Self {
        self.atomic_aggregate = atomic_aggregate;
        self
    }

    #[must_use]
    pub fn with_communities<I, S>(mut self, communities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.communities
            .extend(communities.into_iter().map(Into::into));
        self
    }
}

/// Combines the attributes of two adjacent contributors into the attributes of
/// their aggregate.
///
/// # Returns
/// `None` when the routes must not be aggregated, which is the case when their
/// MED values differ. Two absent MEDs are equal; an absent and a present MED are not.
pub fn merge(route: &RouteAttributes, adjacent: &RouteAttributes) -> Option<RouteAttributes> {
    if route.med != adjacent.med {
        return None;
    }

    Some(RouteAttributes {
        communities: route
            .communities
            .union(&adjacent.communities)
            .cloned()
            .collect(),
        med: route.med,
        origin: route.origin.max(adjacent.origin),
        atomic_aggregate: route.atomic_aggregate || adjacent.atomic_aggregate,
    })
}
