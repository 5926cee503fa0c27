// # Status Sink Trait
//
// Receives the user-visible outcome lines: one per update attempt, plus the
// guard and visibility transitions that matter to the user.

/// Trait for status/log sinks
///
/// `record` must not block: it is called from the scheduler between
/// attempts and from the control loop.
pub trait StatusSink: Send + Sync {
    /// Append a line with a success/failure indicator
    fn record(&self, message: &str, success: bool);
}
