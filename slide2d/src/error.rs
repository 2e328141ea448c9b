use thiserror::Error;

use crate::world::EntityId;

/// Errors raised for genuinely invalid input.
///
/// Blocked moves, empty raycasts and repeated registrations are ordinary
/// outcomes and are reported through return values instead.
#[derive(Debug, Error)]
pub enum PhysicsError {
    #[error("entity {0:?} does not exist")]
    UnknownEntity(EntityId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid physics configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PhysicsError>;

pub(crate) fn ensure_finite(value: f64, what: &str) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidArgument(format!(
            "{what} must be finite, got {value}"
        )))
    }
}
