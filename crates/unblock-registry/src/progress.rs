//! Optional progress observer

/// Observer notified around each resolution stage.
///
/// Calls are synchronous and made from the resolving task. Every resolver
/// entry point works the same with or without a sink.
pub trait ProgressSink: Send + Sync {
    /// A stage of `total` lookups named `label` is starting
    fn begin(&self, total: usize, label: &str);
    /// One lookup finished (`label` is the package name)
    fn advance(&self, label: &str);
    /// The stage finished
    fn end(&self);
}
