use core::fmt;
use std::borrow::Borrow;
use core::num::NonZeroU32;
use std::collections::{HashMap, HashSet};

/// Compact, stable identifier used for connections and other model-owned records.
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<Id>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

pub type ConnectionId = Id;

/// Unique, human-readable identifier of a component inside a model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentId(pub String);

impl ComponentId {
    /// Create a new component ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// Lets registries keyed by `ComponentId` be queried with `&str`.
impl Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ComponentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Id generation service owned by a model.
///
/// Hands out `<prefix>_<n>` component ids with one counter per prefix, skipping ids
/// the owner has already reserved, and sequential connection ids.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    counters: HashMap<String, u32>,
    taken: HashSet<String>,
    next_connection: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an explicit id as used so generated ids never collide with it.
    pub fn reserve(&mut self, id: &ComponentId) {
        self.taken.insert(id.0.clone());
    }

    /// Forget a previously reserved id (the component was removed).
    pub fn release(&mut self, id: &ComponentId) {
        self.taken.remove(&id.0);
    }

    pub fn is_taken(&self, id: &str) -> bool {
        self.taken.contains(id)
    }

    /// Produce and reserve the next free id for `prefix`.
    pub fn next_component(&mut self, prefix: &str) -> ComponentId {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        loop {
            let candidate = format!("{prefix}_{counter}");
            *counter += 1;
            if !self.taken.contains(&candidate) {
                self.taken.insert(candidate.clone());
                return ComponentId(candidate);
            }
        }
    }

    /// Reserve `preferred` if free, otherwise fall back to a generated id with that prefix.
    pub fn claim_or_next(&mut self, preferred: &str) -> ComponentId {
        if self.taken.insert(preferred.to_string()) {
            ComponentId(preferred.to_string())
        } else {
            self.next_component(preferred)
        }
    }

    pub fn next_connection(&mut self) -> ConnectionId {
        let id = Id::from_index(self.next_connection);
        self.next_connection += 1;
        id
    }
}
