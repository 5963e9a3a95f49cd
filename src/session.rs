//! Preview session state: rendered page surfaces, the decode state machine,
//! and the controller that enforces the single-active-session invariant.
//!
//! A session is created by [`crate::preview`] and owned by the caller (or by
//! a [`Previewer`]). The session keeps the resolved input alive — for URL
//! inputs this pins the downloaded temp file — so a later export can
//! re-derive pages from the same source bytes.

use crate::cancel::CancelToken;
use crate::pipeline::input::ResolvedInput;
use image::DynamicImage;
use std::path::Path;

/// One rendered PDF page.
#[derive(Debug, Clone)]
pub struct PageSurface {
    /// 1-based page number.
    pub page_num: usize,
    /// Rendered raster surface.
    pub image: DynamicImage,
    /// Pixel width at the render scale.
    pub width: u32,
    /// Pixel height at the render scale.
    pub height: u32,
    /// Scale the page was rendered at, relative to its point dimensions.
    pub scale: f32,
}

/// Decode state machine of a preview.
///
/// `Idle → Loading → Rendering → Completed`, with `Paused` reachable from
/// `Loading` or `Rendering` at any page boundary, and `Failed` on a decode
/// error. Pages held by a `Paused` or `Failed` session are real rendered
/// surfaces but are not a complete set.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewState {
    Idle,
    Loading,
    Rendering { done: usize, total: usize },
    Completed,
    Paused { rendered: usize },
    Failed { detail: String },
}

/// State of one preview run over one uploaded PDF.
pub struct PreviewSession {
    pub(crate) source: ResolvedInput,
    /// Scale the session's pages were rendered at.
    pub scale: f32,
    /// PDF password used to open the document, if any.
    pub password: Option<String>,
    pub state: PreviewState,
    /// Rendered pages, in page order, contiguous from page 1.
    pub pages: Vec<PageSurface>,
    /// Page count of the source document (0 until loading finished).
    pub total_pages: usize,
    pub(crate) cancel: CancelToken,
}

impl PreviewSession {
    /// Path of the source PDF (local file or pinned download).
    pub fn source_path(&self) -> &Path {
        self.source.path()
    }

    /// A clone of the session's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// True when every page of the document was rendered.
    pub fn is_complete(&self) -> bool {
        self.state == PreviewState::Completed
    }

    /// Count of pages rendered so far.
    pub fn rendered_pages(&self) -> usize {
        self.pages.len()
    }

    /// True when an export at `scale` can reuse this session's surfaces
    /// without re-deriving from source: the session must be complete and
    /// rendered at the same scale.
    pub fn is_reusable_at(&self, scale: f32) -> bool {
        self.is_complete() && (self.scale - scale).abs() < 1e-3
    }
}

impl std::fmt::Debug for PreviewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSession")
            .field("source", &self.source_path())
            .field("scale", &self.scale)
            .field("state", &self.state)
            .field("pages", &self.pages.len())
            .field("total_pages", &self.total_pages)
            .finish()
    }
}

/// Controller owning the lifecycle of preview sessions.
///
/// Invariant: at most one session is active at a time. [`Previewer::begin`]
/// cancels the previous session's token before handing out a new one, so a
/// superseded decode task observes cancellation at its next checkpoint.
#[derive(Default)]
pub struct Previewer {
    token: Option<CancelToken>,
    session: Option<PreviewSession>,
}

impl Previewer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session: cancels any in-flight one and returns the token
    /// to pass into [`crate::preview`].
    pub fn begin(&mut self) -> CancelToken {
        if let Some(previous) = self.token.take() {
            previous.cancel();
        }
        self.session = None;
        let token = CancelToken::new();
        self.token = Some(token.clone());
        token
    }

    /// Cooperatively pause the in-flight session, if any.
    pub fn pause(&self) {
        if let Some(token) = &self.token {
            token.cancel();
        }
    }

    /// Store a finished session for later export reuse.
    pub fn store(&mut self, session: PreviewSession) -> &PreviewSession {
        self.session.insert(session)
    }

    /// The most recent finished session, if any.
    pub fn session(&self) -> Option<&PreviewSession> {
        self.session.as_ref()
    }

    /// Take ownership of the stored session.
    pub fn take_session(&mut self) -> Option<PreviewSession> {
        self.session.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn begin_cancels_previous_token() {
        let mut previewer = Previewer::new();
        let first = previewer.begin();
        assert!(!first.is_cancelled());

        let second = previewer.begin();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
    }

    #[test]
    fn pause_cancels_active_token() {
        let mut previewer = Previewer::new();
        let token = previewer.begin();
        previewer.pause();
        assert!(token.is_cancelled());
    }

    #[test]
    fn pause_without_session_is_a_noop() {
        let previewer = Previewer::new();
        previewer.pause();
    }
}
