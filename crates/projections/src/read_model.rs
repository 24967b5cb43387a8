//! Read model trait for query-side views.

/// Query access to a denormalized view.
///
/// Views are only written by their projection; readers may see them lag the
/// event log until the next catch-up.
pub trait ReadModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of entries currently held, or zero while a writer holds the view.
    fn count(&self) -> usize;
}
