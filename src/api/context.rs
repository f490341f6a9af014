use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Execution context handed to a collection cycle and to the callbacks it
/// runs.
///
/// A context may carry a deadline and a cancellation token. Once either fires
/// the context reports [`Context::is_done`] and a cycle in progress skips its
/// remaining work. Cancelling a context also cancels every context derived
/// from it.
#[derive(Clone, Debug, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancellation: Option<CancellationToken>,
}

impl Context {
    /// An empty context with neither deadline nor cancellation.
    pub fn new() -> Self {
        Context::default()
    }

    /// Returns a copy of this context that expires `timeout` from now.
    ///
    /// An existing earlier deadline is kept.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a copy of this context that expires at `deadline`.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Context {
            deadline: Some(deadline),
            cancellation: self.cancellation.clone(),
        }
    }

    /// Returns a cancellable copy of this context along with the handle that
    /// cancels it.
    ///
    /// The copy stays tied to this context: cancelling this context cancels
    /// the copy as well, while the returned handle only reaches the copy.
    pub fn with_cancellation(&self) -> (Self, CancelHandle) {
        let token = match &self.cancellation {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let cx = Context {
            deadline: self.deadline,
            cancellation: Some(token.clone()),
        };
        (cx, CancelHandle(token))
    }

    /// The deadline of this context, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether the deadline has passed or the context was cancelled.
    pub fn is_done(&self) -> bool {
        if let Some(token) = &self.cancellation {
            if token.is_cancelled() {
                return true;
            }
        }
        self.deadline.map_or(false, |deadline| Instant::now() >= deadline)
    }
}

/// Cancels the context it was created with.
#[derive(Clone, Debug)]
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    /// Cancel the associated context, every clone of it and every context
    /// derived from it.
    pub fn cancel(&self) {
        self.0.cancel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_is_never_done() {
        assert!(!Context::new().is_done());
    }

    #[test]
    fn expired_deadline_is_done() {
        let cx = Context::new().with_timeout(Duration::from_secs(0));
        assert!(cx.is_done());
    }

    #[test]
    fn earlier_deadline_wins() {
        let now = Instant::now();
        let cx = Context::new().with_deadline(now);
        let later = cx.with_timeout(Duration::from_secs(60));
        assert_eq!(later.deadline(), Some(now));
    }

    #[test]
    fn cancellation_reaches_clones() {
        let (cx, handle) = Context::new().with_cancellation();
        let copy = cx.clone();
        assert!(!copy.is_done());
        handle.cancel();
        assert!(cx.is_done());
        assert!(copy.is_done());
    }

    #[test]
    fn cancelling_parent_reaches_derived_contexts() {
        let (parent, handle) = Context::new().with_cancellation();
        let (child, _child_handle) = parent.with_cancellation();
        let child_with_deadline = child.with_timeout(Duration::from_secs(60));
        handle.cancel();
        assert!(parent.is_done());
        assert!(child.is_done());
        assert!(child_with_deadline.is_done());
    }

    #[test]
    fn cancelling_child_leaves_parent_running() {
        let (parent, _handle) = Context::new().with_cancellation();
        let (child, child_handle) = parent.with_cancellation();
        child_handle.cancel();
        assert!(child.is_done());
        assert!(!parent.is_done());
    }
}
