//! Task id allocation.

use crate::error::{Error, Result};
use crate::task::MAX_TASK_ID;

/// Monotonic id counter seeded from the loaded collection.
///
/// Never consults the collection again after seeding, so ids of deleted
/// tasks are never handed out twice within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new(seed: u64) -> Self {
        Self { next: seed }
    }

    /// Value the next call to [`IdAllocator::next_id`] will return.
    pub fn peek(&self) -> u64 {
        self.next
    }

    /// Return the current value and advance.
    ///
    /// Fails once the counter has passed [`MAX_TASK_ID`].
    pub fn next_id(&mut self) -> Result<u64> {
        let id = self.next;
        if id > MAX_TASK_ID {
            return Err(Error::OperationFailed("no task ids left".to_string()));
        }
        self.next = id + 1;
        Ok(id)
    }

    /// Administrative override.
    pub fn reset(&mut self, next: i64) -> Result<()> {
        if next < 0 {
            return Err(Error::InvalidArgument(
                "Next ID cannot be negative.".to_string(),
            ));
        }
        self.next = next as u64;
        Ok(())
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_out_increasing_ids() {
        let mut ids = IdAllocator::new(6);
        assert_eq!(ids.next_id().unwrap(), 6);
        assert_eq!(ids.next_id().unwrap(), 7);
        assert_eq!(ids.peek(), 8);
    }

    #[test]
    fn reset_rejects_negative() {
        let mut ids = IdAllocator::default();
        let err = ids.reset(-1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(ids.peek(), 0);

        ids.reset(42).unwrap();
        assert_eq!(ids.next_id().unwrap(), 42);
    }

    #[test]
    fn exhausted_counter_fails_instead_of_wrapping() {
        let mut ids = IdAllocator::new(MAX_TASK_ID);
        assert_eq!(ids.next_id().unwrap(), MAX_TASK_ID);
        assert!(matches!(ids.next_id(), Err(Error::OperationFailed(_))));
        assert!(matches!(ids.next_id(), Err(Error::OperationFailed(_))));
        assert_eq!(ids.peek(), u64::MAX);
    }
}
