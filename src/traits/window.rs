use std::sync::Arc;

use crate::core::viewport::{CanvasId, ResizeSignal, Viewport};

/// Schedules the next frame on the display refresh signal
pub trait FrameScheduler {
    /// Ask for one more frame slot; repeated requests before the slot fires coalesce
    fn request_frame(&self);
}

/// Container that a rendering surface is attached to.
///
/// Source of truth for the drawable size. Resize observers subscribe through
/// the surface's [`ResizeSignal`] rather than owning the surface.
pub trait ViewportSurface {
    /// Current size in physical pixels
    fn viewport(&self) -> Viewport;

    fn resize_signal(&self) -> &ResizeSignal;

    /// Remove the currently attached canvas, returning it
    fn detach_canvas(&mut self) -> Option<CanvasId>;

    fn attach_canvas(&mut self, canvas: CanvasId);

    /// All canvases currently attached, oldest first
    fn attached_canvases(&self) -> Vec<CanvasId>;

    fn scheduler(&self) -> Arc<dyn FrameScheduler>;
}
