//! Error taxonomy for the vehicle dynamics core.
//!
//! Every fallible construction path in this crate returns a [`DynamicsResult`].
//! The hot per-tick functions are infallible by construction: once a subsystem
//! has passed validation at construction time, its per-tick update cannot fail
//! in the `Result`-propagating sense. Numerical trouble discovered mid-tick is
//! handled by rollback (see [`crate::rigid_body::RigidBody`]) rather than by
//! returning an `Err` out of the tick.

use thiserror::Error;

/// Result type alias used throughout construction and configuration paths.
pub type DynamicsResult<T> = Result<T, DynamicsError>;

/// Categorical error kinds for the dynamics core.
///
/// Query-miss (a raycast with no hits) is deliberately NOT a variant here: it
/// is represented in-band as a cleared ground-contact flag, not as an error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DynamicsError {
    /// A subsystem was asked to run with an unusable configuration (missing
    /// parent link, zero stiffness, zero mass). The subsystem disables itself
    /// for the session; this variant exists to drive the one-time log event.
    #[error("misconfigured {subsystem}: {reason}")]
    Misconfiguration {
        subsystem: &'static str,
        reason: String,
    },

    /// A force, torque, or orientation went non-finite during a tick. The
    /// orchestrator rolls the body back to its pre-tick snapshot.
    #[error("numerical instability: {detail}")]
    Numerical { detail: String },

    /// A parameter was rejected at configuration time (negative stiffness,
    /// an inverted clutch bite window, a non-invertible inertia tensor).
    /// There is no runtime recovery; construction simply fails.
    #[error("invalid parameter {parameter} = {value}: {constraint}")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
        constraint: &'static str,
    },
}

impl DynamicsError {
    /// Builds a [`DynamicsError::Misconfiguration`].
    pub fn misconfiguration(subsystem: &'static str, reason: impl Into<String>) -> Self {
        Self::Misconfiguration {
            subsystem,
            reason: reason.into(),
        }
    }

    /// Builds a [`DynamicsError::Numerical`].
    pub fn numerical(detail: impl Into<String>) -> Self {
        Self::Numerical {
            detail: detail.into(),
        }
    }

    /// Builds a [`DynamicsError::InvalidParameter`].
    pub fn invalid_parameter(
        parameter: &'static str,
        value: impl std::fmt::Display,
        constraint: &'static str,
    ) -> Self {
        Self::InvalidParameter {
            parameter,
            value: value.to_string(),
            constraint,
        }
    }
}
