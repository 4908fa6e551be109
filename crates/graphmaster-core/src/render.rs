//! Render-cycle coordination: one layout call in flight at a time.
//!
//! The layout engine is an external collaborator. The coordinator only
//! sequences requests, owns the current artifact and keeps its busy flag
//! honest; fitting and persisting happen in the viewer around it.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};
#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

use crate::geometry::ArtifactGeometry;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Errors reported by a layout engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("Syntax error: {0}")]
    Syntax(String),
    #[error("Layout engine unavailable: {0}")]
    Unavailable(String),
    #[error("Layout failed: {0}")]
    Failed(String),
}

impl LayoutError {
    /// Message shown in the preview's error area.
    pub fn user_message(&self) -> String {
        match self {
            LayoutError::Syntax(detail) => {
                format!("Render error: {}\nCheck the DOT syntax.", detail.trim())
            }
            other => format!("Render error: {}", other),
        }
    }
}

/// Render request errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("A render is already in progress")]
    AlreadyRendering,
    #[error(transparent)]
    Layout(#[from] LayoutError),
}

/// Turns document text into a rendered artifact.
pub trait LayoutEngine {
    type Artifact: ArtifactGeometry;

    /// Lay out and render `source`.
    fn render<'a>(&'a self, source: &'a str) -> BoxFuture<'a, Result<Self::Artifact, LayoutError>>;
}

/// Coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderState {
    #[default]
    Idle,
    Rendering,
}

/// Proof that a render was started; hand it back to finish the render.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a started render must be finished"]
pub struct RenderTicket {
    generation: u64,
    fit_after: bool,
}

impl RenderTicket {
    pub fn fit_after(&self) -> bool {
        self.fit_after
    }
}

/// What starting a render did.
#[derive(Debug, PartialEq, Eq)]
pub enum RenderStart {
    /// The document was empty: the artifact was dropped, nothing to lay out.
    Cleared,
    /// A layout call should be made, then passed to `finish`.
    Started(RenderTicket),
}

/// What finishing a render did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The artifact was dropped because the document was empty.
    Cleared,
    /// A new artifact is displayed.
    Rendered { fit_after: bool },
    /// The layout failed; the artifact was dropped.
    Failed(LayoutError),
    /// The ticket did not belong to the current render and was ignored.
    Stale,
}

/// Sequences render requests and owns the displayed artifact.
#[derive(Debug)]
pub struct RenderCoordinator<A> {
    state: RenderState,
    artifact: Option<A>,
    generation: u64,
}

impl<A> Default for RenderCoordinator<A> {
    fn default() -> Self {
        Self {
            state: RenderState::Idle,
            artifact: None,
            generation: 0,
        }
    }
}

impl<A> RenderCoordinator<A> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RenderState {
        self.state
    }

    pub fn is_rendering(&self) -> bool {
        self.state == RenderState::Rendering
    }

    /// The artifact currently displayed.
    pub fn artifact(&self) -> Option<&A> {
        self.artifact.as_ref()
    }

    /// Drop the displayed artifact and abandon any render in flight.
    pub fn clear(&mut self) {
        self.artifact = None;
        if self.is_rendering() {
            log::debug!("Render {} abandoned", self.generation);
            self.generation += 1;
            self.state = RenderState::Idle;
        }
    }

    /// Start a render of `text`.
    ///
    /// Rejects the request while another render is in flight; requests are
    /// never queued.
    pub fn begin(&mut self, text: &str, fit_after: bool) -> Result<RenderStart, RenderError> {
        if self.is_rendering() {
            log::debug!("Render rejected: already rendering");
            return Err(RenderError::AlreadyRendering);
        }
        if text.trim().is_empty() {
            self.artifact = None;
            return Ok(RenderStart::Cleared);
        }
        self.generation += 1;
        self.state = RenderState::Rendering;
        log::debug!("Render {} started", self.generation);
        Ok(RenderStart::Started(RenderTicket {
            generation: self.generation,
            fit_after,
        }))
    }

    /// Finish a render with the layout engine's result.
    ///
    /// Always leaves the coordinator idle.
    pub fn finish(&mut self, ticket: RenderTicket, result: Result<A, LayoutError>) -> RenderOutcome {
        if ticket.generation != self.generation || !self.is_rendering() {
            log::debug!("Ignoring stale render {}", ticket.generation);
            return RenderOutcome::Stale;
        }
        self.state = RenderState::Idle;
        match result {
            Ok(artifact) => {
                self.artifact = Some(artifact);
                log::debug!("Render {} finished", ticket.generation);
                RenderOutcome::Rendered {
                    fit_after: ticket.fit_after,
                }
            }
            Err(e) => {
                log::error!("Render {} failed: {}", ticket.generation, e);
                self.artifact = None;
                RenderOutcome::Failed(e)
            }
        }
    }
}

/// Delays automatic renders until editing pauses.
#[derive(Debug, Clone)]
pub struct RenderDebounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl RenderDebounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Restart the wait from `now`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    /// When the pending render is due, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns true once when the deadline has passed, disarming it.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_request_rejected_while_rendering() {
        let mut renders: RenderCoordinator<&str> = RenderCoordinator::new();
        let first = match renders.begin("digraph { a }", true).unwrap() {
            RenderStart::Started(ticket) => ticket,
            other => panic!("unexpected {:?}", other),
        };
        assert_eq!(renders.begin("digraph { b }", true), Err(RenderError::AlreadyRendering));

        let outcome = renders.finish(first, Ok("a"));
        assert_eq!(outcome, RenderOutcome::Rendered { fit_after: true });
        assert_eq!(renders.artifact(), Some(&"a"));
        assert!(!renders.is_rendering());
    }

    #[test]
    fn test_empty_text_clears() {
        let mut renders: RenderCoordinator<&str> = RenderCoordinator::new();
        let RenderStart::Started(ticket) = renders.begin("x", false).unwrap() else {
            panic!("expected a render");
        };
        renders.finish(ticket, Ok("old"));

        assert_eq!(renders.begin("  \n", false), Ok(RenderStart::Cleared));
        assert_eq!(renders.artifact(), None);
        assert!(!renders.is_rendering());
    }

    #[test]
    fn test_failure_returns_to_idle() {
        let mut renders: RenderCoordinator<&str> = RenderCoordinator::new();
        let RenderStart::Started(ticket) = renders.begin("x", false).unwrap() else {
            panic!("expected a render");
        };
        renders.finish(ticket, Ok("old"));

        let RenderStart::Started(ticket) = renders.begin("bad", false).unwrap() else {
            panic!("expected a render");
        };
        let outcome = renders.finish(ticket, Err(LayoutError::Syntax("line 1".into())));
        assert!(matches!(outcome, RenderOutcome::Failed(LayoutError::Syntax(_))));
        assert_eq!(renders.artifact(), None);
        assert_eq!(renders.state(), RenderState::Idle);
    }

    #[test]
    fn test_stale_ticket_ignored() {
        let mut renders: RenderCoordinator<&str> = RenderCoordinator::new();
        let RenderStart::Started(ticket) = renders.begin("x", false).unwrap() else {
            panic!("expected a render");
        };
        let forged = RenderTicket {
            generation: 99,
            fit_after: false,
        };
        assert_eq!(renders.finish(forged, Ok("forged")), RenderOutcome::Stale);
        assert!(renders.is_rendering());
        assert_eq!(
            renders.finish(ticket, Ok("real")),
            RenderOutcome::Rendered { fit_after: false }
        );
        assert_eq!(renders.artifact(), Some(&"real"));
    }

    #[test]
    fn test_clear_abandons_render_in_flight() {
        let mut renders: RenderCoordinator<&str> = RenderCoordinator::new();
        let RenderStart::Started(ticket) = renders.begin("x", true).unwrap() else {
            panic!("expected a render");
        };
        renders.clear();
        assert!(!renders.is_rendering());
        assert_eq!(renders.finish(ticket, Ok("late")), RenderOutcome::Stale);
        assert_eq!(renders.artifact(), None);

        // The coordinator accepts new work straight away.
        assert!(matches!(renders.begin("y", false), Ok(RenderStart::Started(_))));
    }

    #[test]
    fn test_syntax_message_has_hint() {
        let message = LayoutError::Syntax("syntax error in line 3 near '}'".into()).user_message();
        assert!(message.starts_with("Render error: syntax error in line 3"));
        assert!(message.ends_with("Check the DOT syntax."));
    }

    #[test]
    fn test_debounce() {
        let start = Instant::now();
        let mut debounce = RenderDebounce::from_millis(750);
        assert!(!debounce.fire(start));

        debounce.arm(start);
        assert!(!debounce.fire(start + Duration::from_millis(500)));
        // Another edit pushes the deadline out.
        debounce.arm(start + Duration::from_millis(500));
        assert!(!debounce.fire(start + Duration::from_millis(900)));
        assert!(debounce.fire(start + Duration::from_millis(1250)));
        assert!(!debounce.fire(start + Duration::from_millis(2000)));
    }
}
