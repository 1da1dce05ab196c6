//! Error types for HiveStore operations
//!
//! All HiveStore errors are represented by the HiveError enum, which provides
//! detailed context for debugging and recovery. Decode-side parse failures and
//! per-key cleanup failures are absorbed where they occur (logged, treated as
//! absent / skipped); construction and lock-timeout errors propagate.

use std::error::Error;
use std::fmt;
use std::time::Duration;

/// HiveStore error types with detailed context
#[derive(Debug, Clone)]
pub enum HiveError {
    /// Database name is empty or contains a forbidden character
    InvalidName {
        /// The rejected name
        name: String,
        /// Why the name was rejected
        reason: String,
    },

    /// A lock wait exceeded the configured bound
    LockTimeout {
        /// The resource that stayed held
        resource: String,
        /// How long the caller waited before giving up
        waited: Duration,
    },

    /// Stored payload could not be deserialized
    ///
    /// Absorbed at the decode layer: the entry is reported as absent and a
    /// diagnostic is logged. Never surfaced from `get`.
    Parse {
        /// Base key of the malformed entry
        base: String,
        /// Deserializer message
        reason: String,
    },

    /// A value could not be serialized for storage
    Serialize {
        /// Base key the value was destined for
        base: String,
        /// Serializer message
        reason: String,
    },

    /// An individual write or deletion against the host store failed
    HostWrite {
        /// The host property key involved
        key: String,
        /// Description of the failure
        reason: String,
    },
}

impl fmt::Display for HiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HiveError::InvalidName { name, reason } => {
                write!(f, "Invalid database name {:?}: {}", name, reason)
            }

            HiveError::LockTimeout { resource, waited } => {
                write!(f, "Lock timeout for resource {:?} after {:?}", resource, waited)
            }

            HiveError::Parse { base, reason } => {
                write!(f, "Failed to parse entry at {:?}: {}", base, reason)
            }

            HiveError::Serialize { base, reason } => {
                write!(f, "Failed to serialize entry for {:?}: {}", base, reason)
            }

            HiveError::HostWrite { key, reason } => {
                write!(f, "Host store write failed for key {:?}: {}", key, reason)
            }
        }
    }
}

impl Error for HiveError {}

/// Result type alias for HiveStore operations
pub type HiveResult<T> = Result<T, HiveError>;
