use thiserror::Error;

use crate::types::Entity;

/// Errors surfaced by component writes and configuration.
///
/// Queries never error: a stale handle or a missing component is an inert
/// miss (`None`, `false`, or an empty list).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("entity {0:?} is not alive")]
    NoSuchEntity(Entity),

    #[error("invalid configuration: `{field}` {reason}")]
    InvalidConfig { field: &'static str, reason: &'static str },

    #[error("entity {child:?} cannot be parented to {parent:?}: {reason}")]
    InvalidParent { child: Entity, parent: Entity, reason: &'static str },
}

pub type Result<T, E = PhysicsError> = std::result::Result<T, E>;
