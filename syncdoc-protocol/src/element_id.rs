use crate::error::InvalidElementId;
use crate::{ActorId, Key};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Identifies a position in a list or text object. `Head` is the virtual
/// predecessor of the first element; every real element id pairs the
/// inserting actor with a counter that actor assigned at insertion time.
///
/// The derived order is by counter first, then actor id. Sibling
/// traversal in the insertion tree walks this order descending, which is
/// the Lamport tie-break rule for concurrent inserts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementId {
    Head,
    Id(ActorId, u32),
}

impl ElementId {
    pub fn actor(&self) -> Option<&ActorId> {
        match self {
            ElementId::Head => None,
            ElementId::Id(actor, _) => Some(actor),
        }
    }

    pub fn counter(&self) -> Option<u32> {
        match self {
            ElementId::Head => None,
            ElementId::Id(_, elem) => Some(*elem),
        }
    }

    pub fn as_key(&self) -> Key {
        Key(self.to_string())
    }

    pub fn is_head(&self) -> bool {
        matches!(self, ElementId::Head)
    }
}

impl Ord for ElementId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ElementId::Head, ElementId::Head) => Ordering::Equal,
            (ElementId::Head, _) => Ordering::Less,
            (_, ElementId::Head) => Ordering::Greater,
            (ElementId::Id(actor1, elem1), ElementId::Id(actor2, elem2)) => {
                elem1.cmp(elem2).then_with(|| actor1.cmp(actor2))
            }
        }
    }
}

impl PartialOrd for ElementId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ElementId::Head => write!(f, "_head"),
            ElementId::Id(actor, elem) => write!(f, "{}:{}", actor, elem),
        }
    }
}

impl FromStr for ElementId {
    type Err = InvalidElementId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "_head" {
            return Ok(ElementId::Head);
        }
        // the actor id may itself contain a colon, so split on the last one
        let mut parts = s.rsplitn(2, ':');
        let elem = parts.next();
        let actor = parts.next();
        match (actor, elem) {
            (Some(actor), Some(elem)) if !actor.is_empty() => elem
                .parse::<u32>()
                .map(|elem| ElementId::Id(actor.into(), elem))
                .map_err(|_| InvalidElementId(s.to_string())),
            _ => Err(InvalidElementId(s.to_string())),
        }
    }
}

impl Serialize for ElementId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ElementId::from_str(&s).map_err(de::Error::custom)
    }
}
