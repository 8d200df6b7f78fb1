//! Unified error type for the navigation stack
//!
//! Most conditions a navigation stack meets at runtime are not errors at all:
//! navigating to an already-attached destination, popping to a destination that
//! is not on the stack, or detaching twice are silent no-ops. The variants here
//! cover configuration problems and the two contract violations (asking for a
//! successor that does not exist, and a stack-change broadcast without a stack
//! identity).

use crate::identifiers::DestinationId;

/// Unified error type for navigation operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    /// Configuration value out of range or unparsable
    #[error("Invalid config: {message}")]
    InvalidConfig {
        /// What was wrong with the configuration
        message: String,
    },

    /// Configuration file could not be read
    #[error("Config I/O error: {message}")]
    ConfigIo {
        /// Underlying I/O failure
        message: String,
    },

    /// No async runtime available to host deferred notifications
    #[error("Scheduler unavailable: {message}")]
    SchedulerUnavailable {
        /// Why the scheduler could not be created
        message: String,
    },

    /// A stack-changed broadcast arrived without its stack identity
    #[error("Malformed broadcast on topic '{topic}': missing stack identity")]
    MalformedBroadcast {
        /// Topic of the offending broadcast
        topic: String,
    },

    /// A successor was requested for a destination that has none
    #[error("No destination after '{destination}'")]
    NoSuccessor {
        /// Destination whose successor was requested
        destination: DestinationId,
    },
}

impl NavigationError {
    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a configuration I/O error
    pub fn config_io(message: impl Into<String>) -> Self {
        Self::ConfigIo {
            message: message.into(),
        }
    }

    /// Create a scheduler unavailable error
    pub fn scheduler_unavailable(message: impl Into<String>) -> Self {
        Self::SchedulerUnavailable {
            message: message.into(),
        }
    }

    /// Create a malformed broadcast error
    pub fn malformed_broadcast(topic: impl Into<String>) -> Self {
        Self::MalformedBroadcast {
            topic: topic.into(),
        }
    }

    /// Create a missing successor error
    pub fn no_successor(destination: DestinationId) -> Self {
        Self::NoSuccessor { destination }
    }

    /// Whether this error marks a bug at the call site rather than a runtime condition.
    #[must_use]
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::MalformedBroadcast { .. } | Self::NoSuccessor { .. }
        )
    }
}

/// Standard Result type for navigation operations
pub type Result<T> = std::result::Result<T, NavigationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NavigationError::invalid_config("bus_capacity must be positive");
        assert_eq!(
            err.to_string(),
            "Invalid config: bus_capacity must be positive"
        );

        let err = NavigationError::malformed_broadcast("stack-changed");
        assert_eq!(
            err.to_string(),
            "Malformed broadcast on topic 'stack-changed': missing stack identity"
        );

        let err = NavigationError::no_successor(DestinationId::new("settings"));
        assert_eq!(err.to_string(), "No destination after 'settings'");
    }

    #[test]
    fn test_contract_violations() {
        assert!(NavigationError::no_successor(DestinationId::new("a")).is_contract_violation());
        assert!(NavigationError::malformed_broadcast("stack-changed").is_contract_violation());
        assert!(!NavigationError::invalid_config("x").is_contract_violation());
        assert!(!NavigationError::config_io("x").is_contract_violation());
        assert!(!NavigationError::scheduler_unavailable("x").is_contract_violation());
    }
}
