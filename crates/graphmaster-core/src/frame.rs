//! Coalesces transform updates into at most one apply per display frame.

use crate::camera::ViewTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FrameState {
    #[default]
    Idle,
    /// An apply is wanted but the host has not been asked to schedule one.
    Requested,
    /// The host has a frame callback queued.
    Scheduled,
}

/// At most one pending apply task.
///
/// Mutations call [`request`](Self::request). The host polls
/// [`take_schedule`](Self::take_schedule) after handling an event and, when it
/// returns true, queues a frame callback that calls [`run`](Self::run).
#[derive(Debug, Clone, Default)]
pub struct FrameScheduler {
    state: FrameState,
    last_applied: Option<ViewTransform>,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the transform as needing an apply.
    pub fn request(&mut self) {
        if self.state == FrameState::Idle {
            self.state = FrameState::Requested;
        }
    }

    /// Whether an apply is pending.
    pub fn is_pending(&self) -> bool {
        self.state != FrameState::Idle
    }

    /// Returns true exactly once per pending apply: the host must schedule a
    /// frame callback.
    pub fn take_schedule(&mut self) -> bool {
        if self.state == FrameState::Requested {
            self.state = FrameState::Scheduled;
            true
        } else {
            false
        }
    }

    /// Run the pending apply, returning the transform to write.
    ///
    /// Returns `None` when nothing is pending or the transform equals the
    /// one applied last.
    pub fn run(&mut self, current: ViewTransform) -> Option<ViewTransform> {
        if self.state == FrameState::Idle {
            return None;
        }
        self.state = FrameState::Idle;
        if self.last_applied == Some(current) {
            return None;
        }
        self.last_applied = Some(current);
        Some(current)
    }

    /// The transform written by the last apply.
    pub fn last_applied(&self) -> Option<ViewTransform> {
        self.last_applied
    }

    /// Forget the last applied transform so the next run always writes.
    ///
    /// Needed after the displayed element is replaced.
    pub fn invalidate(&mut self) {
        self.last_applied = None;
        self.request();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_coalesce() {
        let mut frames = FrameScheduler::new();
        frames.request();
        frames.request();
        assert!(frames.take_schedule());
        frames.request();
        assert!(!frames.take_schedule());

        let view = ViewTransform::new(2.0, 1.0, 1.0);
        assert_eq!(frames.run(view), Some(view));
        assert!(!frames.is_pending());
        assert_eq!(frames.run(view), None);
    }

    #[test]
    fn test_unchanged_transform_not_rewritten() {
        let mut frames = FrameScheduler::new();
        let view = ViewTransform::IDENTITY;
        frames.request();
        assert_eq!(frames.run(view), Some(view));

        frames.request();
        assert!(frames.take_schedule());
        assert_eq!(frames.run(view), None);
        assert_eq!(frames.last_applied(), Some(view));
    }

    #[test]
    fn test_invalidate_forces_write() {
        let mut frames = FrameScheduler::new();
        let view = ViewTransform::IDENTITY;
        frames.request();
        frames.run(view);

        frames.invalidate();
        assert!(frames.take_schedule());
        assert_eq!(frames.run(view), Some(view));
    }
}
