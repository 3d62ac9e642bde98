//! Query-side access shared by the views.

/// A denormalized view kept current by a [`Projection`](crate::Projection).
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of rows held. May report zero while a writer holds the lock.
    fn count(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.count() == 0
    }
}
