// Physical Traits
//
// Properties attached to every plan node: calling convention, row ordering (collation)
// and data distribution. A node "satisfies" a required trait set when it can be used
// wherever that trait set is demanded without an enforcer in between.

use std::fmt;

/// Calling convention of a plan node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Convention {
    /// Not directly runnable; produced by the converter and the rewrite phase
    Logical,
    /// Runnable by the federation executor
    Executable,
}

/// One ordering key: output field index and direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub index: usize,
    pub descending: bool,
}

impl SortKey {
    pub fn asc(index: usize) -> Self {
        SortKey { index, descending: false }
    }

    pub fn desc(index: usize) -> Self {
        SortKey { index, descending: true }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${} {}", self.index, if self.descending { "DESC" } else { "ASC" })
    }
}

/// Row distribution. Executable plans are always `Singleton`: the federation layer
/// pulls every data source into one stream, so no alternative is chosen by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Distribution {
    /// No requirement
    Any,
    /// All rows in one stream, as delivered to the client
    Singleton,
}

/// Convention, collation and distribution of a plan node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TraitSet {
    pub convention: Convention,
    /// Ordering of the output rows; empty means unordered
    pub collation: Vec<SortKey>,
    pub distribution: Distribution,
}

impl TraitSet {
    /// Traits of every logical node
    pub fn logical() -> Self {
        TraitSet {
            convention: Convention::Logical,
            collation: Vec::new(),
            distribution: Distribution::Any,
        }
    }

    /// Root requirement of the cost-based phase: runnable, single stream, any order
    pub fn executable() -> Self {
        TraitSet {
            convention: Convention::Executable,
            collation: Vec::new(),
            distribution: Distribution::Singleton,
        }
    }

    pub fn with_collation(mut self, collation: Vec<SortKey>) -> Self {
        self.collation = collation;
        self
    }

    /// A provided collation satisfies a requirement when the requirement is a prefix of it
    pub fn collation_satisfies(provided: &[SortKey], required: &[SortKey]) -> bool {
        required.len() <= provided.len() && provided[..required.len()] == *required
    }

    pub fn satisfies(&self, required: &TraitSet) -> bool {
        if self.convention != required.convention {
            return false;
        }
        if required.distribution == Distribution::Singleton && self.distribution != Distribution::Singleton {
            return false;
        }
        Self::collation_satisfies(&self.collation, &required.collation)
    }
}

impl fmt::Display for TraitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let convention = match self.convention {
            Convention::Logical => "LOGICAL",
            Convention::Executable => "EXECUTABLE",
        };
        let collation = self.collation.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ");
        write!(f, "{}.[{}]", convention, collation)
    }
}
