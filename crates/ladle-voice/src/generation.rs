//! Monotonic session tokens for discarding stale asynchronous results.

use std::fmt;

use serde::Serialize;

/// Identifies one `speak()` session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Generation(u64);

impl Generation {
    /// The generation before any session has started.
    pub const ZERO: Self = Self(0);

    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen#{}", self.0)
    }
}

/// Source of [`Generation`]s. Lives inside the session lock.
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: Generation,
}

impl GenerationCounter {
    pub const fn new() -> Self {
        Self {
            current: Generation::ZERO,
        }
    }

    /// Invalidate every outstanding token and return the new current one.
    pub const fn advance(&mut self) -> Generation {
        self.current = Generation(self.current.0.wrapping_add(1));
        self.current
    }

    pub const fn current(&self) -> Generation {
        self.current
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        self.current == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_is_monotonic() {
        let mut counter = GenerationCounter::new();
        assert_eq!(counter.current(), Generation::ZERO);

        let first = counter.advance();
        let second = counter.advance();
        assert!(second > first);
        assert_eq!(second.value(), 2);
    }

    #[test]
    fn test_only_latest_is_current() {
        let mut counter = GenerationCounter::new();
        let a = counter.advance();
        assert!(counter.is_current(a));

        let b = counter.advance();
        assert!(!counter.is_current(a));
        assert!(counter.is_current(b));
    }

    #[test]
    fn test_display() {
        let mut counter = GenerationCounter::new();
        assert_eq!(counter.advance().to_string(), "gen#1");
    }
}
