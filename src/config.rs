//! Sizing configuration for the hash engines.

use crate::error::{Error, Result};

/// Initial sizing and growth threshold of a hash engine.
///
/// The table is always sized to the next prime `>= initial_capacity`
/// (minimum 3). After an insertion leaves `len / bucket_count` at or above
/// `max_load_factor`, the table grows to the next prime `>= 2 * bucket_count`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableConfig {
    pub initial_capacity: usize,
    pub max_load_factor: f64,
}

impl TableConfig {
    pub const DEFAULT_CAPACITY: usize = 19;
    pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.5;
    /// Smallest accepted threshold. Below it a single insertion would keep
    /// doubling the table.
    pub const MIN_MAX_LOAD_FACTOR: f64 = 0.05;

    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_max_load_factor(mut self, load_factor: f64) -> Self {
        self.max_load_factor = load_factor;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 {
            return Err(Error::InvalidConfig(
                "initial_capacity must be greater than 0".to_string(),
            ));
        }
        // NaN fails both comparisons.
        if !(self.max_load_factor >= Self::MIN_MAX_LOAD_FACTOR && self.max_load_factor < 1.0) {
            return Err(Error::InvalidConfig(format!(
                "max_load_factor must lie in [{}, 1), got {}",
                Self::MIN_MAX_LOAD_FACTOR,
                self.max_load_factor
            )));
        }
        Ok(())
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: Self::DEFAULT_CAPACITY,
            max_load_factor: Self::DEFAULT_MAX_LOAD_FACTOR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let c = TableConfig::default();
        assert_eq!(c.initial_capacity, 19);
        assert_eq!(c.max_load_factor, 0.5);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn rejects_zero_capacity() {
        let c = TableConfig::default().with_initial_capacity(0);
        assert!(matches!(c.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn rejects_out_of_range_load_factor() {
        for lf in [0.0, 1e-300, 0.049, 1.0, 1.5, -0.1, f64::NAN] {
            let c = TableConfig::default().with_max_load_factor(lf);
            assert!(c.validate().is_err(), "load factor {lf} accepted");
        }
        for lf in [TableConfig::MIN_MAX_LOAD_FACTOR, 0.75, 0.99] {
            let c = TableConfig::default().with_max_load_factor(lf);
            assert!(c.validate().is_ok(), "load factor {lf} rejected");
        }
    }
}
