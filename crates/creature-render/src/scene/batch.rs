use crate::transform::Transform;

use super::BatchError;

/// One queued draw: the pose plus the shape parameters, both copied in.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DrawInstance<S> {
    pub transform: Transform,
    pub shape: S,
}

/// Lifecycle state of a [`DrawBatch`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum BatchState {
    /// Nothing recorded since construction.
    #[default]
    Ready,
    /// Between `begin` and `end`; accepts draws.
    Batching,
    /// After `end`; contents are frozen until the next `begin`.
    Finalized,
}

/// Ordered per-frame record of draw requests.
///
/// - `push()` is O(1) amortized; storage is reused across frames and never shrinks
/// - instances stay in insertion order, nothing is sorted or culled
///
/// ```text
/// Ready ──begin──▶ Batching ──end──▶ Finalized
///                    ▲  │ push             │
///                    └──┴──────begin───────┘
/// ```
#[derive(Debug)]
pub struct DrawBatch<S> {
    instances: Vec<DrawInstance<S>>,
    state: BatchState,
}

impl<S> Default for DrawBatch<S> {
    fn default() -> Self {
        Self {
            instances: Vec::new(),
            state: BatchState::Ready,
        }
    }
}

impl<S> DrawBatch<S> {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            instances: Vec::with_capacity(capacity),
            state: BatchState::Ready,
        }
    }

    #[inline]
    pub fn state(&self) -> BatchState {
        self.state
    }

    /// Number of recorded instances.
    #[inline]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Starts a new batch, discarding whatever was recorded before.
    pub fn begin(&mut self) {
        if self.state == BatchState::Batching {
            log::warn!(
                "begin called on an open batch; discarding {} unfinished instances",
                self.instances.len()
            );
        }
        self.instances.clear();
        self.state = BatchState::Batching;
    }

    /// Appends one instance.
    pub fn push(&mut self, transform: Transform, shape: S) -> Result<(), BatchError> {
        if self.state != BatchState::Batching {
            return Err(BatchError::NotBatching { op: "draw", state: self.state });
        }
        self.instances.push(DrawInstance { transform, shape });
        Ok(())
    }

    /// Freezes the batch and returns its contents in insertion order.
    pub fn end(&mut self) -> Result<&[DrawInstance<S>], BatchError> {
        if self.state != BatchState::Batching {
            return Err(BatchError::NotBatching { op: "end", state: self.state });
        }
        self.state = BatchState::Finalized;
        Ok(&self.instances)
    }

    /// Returns the finalized contents. `op` names the caller in the error.
    ///
    /// A batch that was never begun reads as empty; only an open batch is an
    /// error.
    pub fn finalized(&self, op: &'static str) -> Result<&[DrawInstance<S>], BatchError> {
        match self.state {
            BatchState::Ready | BatchState::Finalized => Ok(&self.instances),
            state => Err(BatchError::NotFinalized { op, state }),
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;

    fn t(x: f32) -> Transform {
        Transform::from_translation(Vec3::new(x, 0.0, 0.0))
    }

    // ── state machine ─────────────────────────────────────────────────────

    #[test]
    fn push_before_begin_is_rejected() {
        let mut batch = DrawBatch::<u32>::new();
        assert_eq!(
            batch.push(t(0.0), 1),
            Err(BatchError::NotBatching { op: "draw", state: BatchState::Ready })
        );
        assert!(batch.is_empty());
    }

    #[test]
    fn push_after_end_is_rejected() {
        let mut batch = DrawBatch::<u32>::new();
        batch.begin();
        batch.push(t(0.0), 1).unwrap();
        batch.end().unwrap();

        assert!(batch.push(t(1.0), 2).is_err());
        assert_eq!(batch.finalized("read").unwrap().len(), 1);
    }

    #[test]
    fn end_without_begin_is_rejected() {
        let mut batch = DrawBatch::<u32>::new();
        assert!(matches!(batch.end(), Err(BatchError::NotBatching { op: "end", .. })));
    }

    #[test]
    fn reading_open_batch_is_rejected() {
        let mut batch = DrawBatch::<u32>::new();
        batch.begin();
        assert_eq!(
            batch.finalized("encode"),
            Err(BatchError::NotFinalized { op: "encode", state: BatchState::Batching })
        );
    }

    #[test]
    fn unbegun_batch_reads_as_empty() {
        let batch = DrawBatch::<u32>::new();
        assert_eq!(batch.finalized("encode"), Ok(&[][..]));
    }

    // ── contents ──────────────────────────────────────────────────────────

    #[test]
    fn len_counts_draws_since_begin() {
        let mut batch = DrawBatch::new();
        batch.begin();
        for i in 0..7 {
            batch.push(t(i as f32), i).unwrap();
        }
        assert_eq!(batch.end().unwrap().len(), 7);

        batch.begin();
        assert_eq!(batch.len(), 0);
        assert_eq!(batch.state(), BatchState::Batching);
    }

    #[test]
    fn begin_on_open_batch_resets_it() {
        let mut batch = DrawBatch::new();
        batch.begin();
        batch.push(t(0.0), 'a').unwrap();
        batch.push(t(1.0), 'b').unwrap();

        batch.begin();
        batch.push(t(2.0), 'c').unwrap();

        let shapes: Vec<char> = batch.end().unwrap().iter().map(|i| i.shape).collect();
        assert_eq!(shapes, vec!['c']);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut batch = DrawBatch::new();
        batch.begin();
        for i in [5, 3, 9, 1] {
            batch.push(t(i as f32), i).unwrap();
        }
        let finalized = batch.end().unwrap();

        let shapes: Vec<i32> = finalized.iter().map(|i| i.shape).collect();
        assert_eq!(shapes, vec![5, 3, 9, 1]);
        assert_eq!(finalized[2].transform, t(9.0));
    }

    #[test]
    fn capacity_survives_begin() {
        let mut batch = DrawBatch::with_capacity(4);
        batch.begin();
        for i in 0..100 {
            batch.push(t(0.0), i).unwrap();
        }
        let grown = batch.instances.capacity();

        batch.begin();
        assert!(batch.instances.capacity() >= grown);
    }
}
