use std::iter::FusedIterator;

/// Monotonic unique-identifier generator.
///
/// Ids start at `0` and increase by exactly one per call. A counter never hands
/// out the same id twice: after `u64::MAX - 1` has been issued it is exhausted
/// and yields `None` from then on.
///
/// Advancing takes `&mut self`; a counter shared across threads must sit behind
/// a lock owned by the caller.
#[derive(Debug, Default)]
pub struct Counter {
    next: u64,
}

impl Counter {
    #[inline]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Returns the id the next call will issue, without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<u64> {
        (self.next != u64::MAX).then_some(self.next)
    }

    /// Number of ids issued so far.
    #[inline]
    pub fn issued(&self) -> u64 {
        self.next
    }
}

impl Iterator for Counter {
    type Item = u64;

    #[inline]
    fn next(&mut self) -> Option<u64> {
        let id = self.peek()?;
        self.next += 1;
        Some(id)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = u64::MAX - self.next;
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}

impl FusedIterator for Counter {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero_and_steps_by_one() {
        let mut counter = Counter::new();
        let ids: Vec<u64> = (0..100).map(|_| counter.next().unwrap()).collect();

        assert_eq!(ids[0], 0);
        for pair in ids.windows(2) {
            assert_eq!(pair[1], pair[0] + 1);
        }
        assert_eq!(counter.issued(), 100);
    }

    #[test]
    fn fresh_counters_are_independent() {
        let mut a = Counter::new();
        let mut b = Counter::default();

        a.next();
        a.next();

        assert_eq!(b.next(), Some(0));
        assert_eq!(a.next(), Some(2));
        assert_eq!(b.next(), Some(1));
    }

    #[test]
    fn peek_does_not_advance() {
        let mut counter = Counter::new();
        assert_eq!(counter.peek(), Some(0));
        assert_eq!(counter.peek(), Some(0));
        assert_eq!(counter.next(), Some(0));
        assert_eq!(counter.peek(), Some(1));
    }

    #[test]
    fn exhausted_counter_stops_instead_of_wrapping() {
        let mut counter = Counter { next: u64::MAX - 2 };

        assert_eq!(counter.next(), Some(u64::MAX - 2));
        assert_eq!(counter.next(), Some(u64::MAX - 1));
        assert_eq!(counter.next(), None);
        assert_eq!(counter.next(), None);
        assert_eq!(counter.peek(), None);
    }
}
