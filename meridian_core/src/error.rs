// meridian_core/src/error.rs

use std::fmt;

use thiserror::Error;

use crate::types::TrialIndex;

/// Which side of the algorithm boundary a capability name was declared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingDirection {
    Input,
    Output,
}

impl fmt::Display for BindingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingDirection::Input => write!(f, "input"),
            BindingDirection::Output => write!(f, "output"),
        }
    }
}

/// Error taxonomy of the simulation core.
///
/// Configuration and binding problems are detected eagerly and abort
/// construction; they never surface mid-run. A per-trial failure aborts the
/// remaining trials of that run but leaves already-completed trial data
/// intact. Plot-time issues (out-of-range trial index, unsupported series
/// name) are not errors at all: they are logged and skipped.
#[derive(Debug, Error)]
pub enum SimError {
    /// Malformed motion-definition table or invalid scenario argument.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An algorithm declared a capability name this engine does not provide
    /// in the required catalog.
    #[error("cannot bind algorithm {direction} '{name}': not a supported capability")]
    CapabilityBinding {
        name: String,
        direction: BindingDirection,
    },

    /// An algorithm declared zero inputs or zero outputs.
    #[error("invalid algorithm: {0}")]
    InvalidAlgorithm(&'static str),

    /// A payload's column count disagrees with the container's fixed legend.
    #[error("shape mismatch for '{container}': legend has {expected} columns, payload has {actual}")]
    Shape {
        container: String,
        expected: usize,
        actual: usize,
    },

    /// The algorithm returned a result count different from its declared
    /// output count.
    #[error("algorithm returned {actual} outputs but declared {expected}")]
    OutputArity { expected: usize, actual: usize },

    /// A planned payload lookup found no data. Indicates a broken run
    /// sequence, not a user error.
    #[error("container '{container}' holds no data for trial {trial:?}")]
    MissingData {
        container: String,
        trial: Option<TrialIndex>,
    },

    /// The engine was asked to do something while a run is in progress.
    #[error("engine is busy: a run is in progress")]
    Busy,

    /// A trial failed mid-run. Data from earlier trials is preserved; later
    /// trials were not executed.
    #[error("trial {index} failed: {source}")]
    Trial {
        index: TrialIndex,
        #[source]
        source: Box<SimError>,
    },

    /// Cooperative cancellation was requested between trials.
    #[error("run cancelled before trial {index}")]
    Cancelled { index: TrialIndex },

    /// The per-run deadline expired between trials.
    #[error("run deadline exceeded before trial {index}")]
    DeadlineExceeded { index: TrialIndex },

    /// An external collaborator (trajectory generator, sensor synthesizer)
    /// reported a failure.
    #[error("{collaborator} failed: {message}")]
    Collaborator {
        collaborator: &'static str,
        message: String,
    },

    /// The external chart backend failed to draw.
    #[error("chart backend error: {0}")]
    Chart(String),
}
