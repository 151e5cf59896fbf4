//! Id strategies for newly created todos.

use rand::Rng;

/// Exclusive upper bound for random ids.
pub const RANDOM_ID_UPPER_BOUND: i64 = 1000;

/// Source of ids for created todos.
pub trait IdGenerator: Send + Sync + 'static {
    /// Next id to hand out.
    fn next_id(&self) -> i64;
}

/// Uniform random ids in `[0, 1000)`. Not unique.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> i64 {
        rand::rng().random_range(0..RANDOM_ID_UPPER_BOUND)
    }
}

impl<F> IdGenerator for F
where
    F: Fn() -> i64 + Send + Sync + 'static,
{
    fn next_id(&self) -> i64 {
        self()
    }
}
