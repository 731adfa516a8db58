//! Error type shared by every engine.

use thiserror::Error;

/// Failures reported by container operations.
///
/// Lookups that require a present key (`search`, `search_mut`, `at`) are the
/// only operations that fail at runtime. `InvalidConfig` is raised solely
/// while building a hash engine from a [`TableConfig`](crate::TableConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("key not found")]
    NotFound,

    #[error("invalid table configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(Error::NotFound.to_string(), "key not found");
        assert_eq!(
            Error::InvalidConfig("initial_capacity must be > 0".into()).to_string(),
            "invalid table configuration: initial_capacity must be > 0"
        );
    }
}
