//! State baseline table for election resolution.
//!
//! The table maps each state to its partisan lean, elector count, and
//! turnout weight. It is loaded once at startup from
//! `hustings-baseline.yaml` and treated as read-only for the life of the
//! process; resolution never mutates it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use hustings_types::StateCode;

/// Errors that can occur when loading the baseline table.
#[derive(Debug, thiserror::Error)]
pub enum BaselineError {
    /// Failed to read the baseline file from disk.
    #[error("failed to read baseline file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse baseline YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for BaselineError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Per-state baseline parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StateBaseline {
    /// Signed partisan lean in percentage points. Positive favors the
    /// player's candidate.
    pub lean: f64,
    /// Electors awarded winner-take-all.
    pub electors: u32,
    /// Relative weight of the state in the national popular estimate.
    pub turnout_weight: f64,
}

/// Read-only map of every state participating in resolution.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct BaselineTable {
    states: BTreeMap<StateCode, StateBaseline>,
}

impl BaselineTable {
    /// Load the table from a YAML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns [`BaselineError::Io`] if the file cannot be read, or
    /// [`BaselineError::Yaml`] if the content is not valid YAML (including
    /// malformed state codes, which fail `StateCode` deserialization).
    pub fn from_file(path: &Path) -> Result<Self, BaselineError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse the table from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`BaselineError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, BaselineError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Build a table from an in-memory map. Used by tests and fixtures.
    pub const fn from_states(states: BTreeMap<StateCode, StateBaseline>) -> Self {
        Self { states }
    }

    /// Whether the table holds no states.
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of states in the table.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Baseline parameters for one state.
    pub fn get(&self, state: &StateCode) -> Option<&StateBaseline> {
        self.states.get(state)
    }

    /// Whether the table contains the state.
    pub fn contains(&self, state: &StateCode) -> bool {
        self.states.contains_key(state)
    }

    /// Iterate over all states in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&StateCode, &StateBaseline)> {
        self.states.iter()
    }

    /// Total electors across the table. This is the full pool every
    /// resolution must allocate.
    pub fn total_electors(&self) -> u32 {
        self.states
            .values()
            .fold(0_u32, |acc, s| acc.saturating_add(s.electors))
    }
}
