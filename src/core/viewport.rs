use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

/// Drawable region size in physical pixels plus the device pixel ratio
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixel_ratio: 1.0,
        }
    }

    pub fn with_pixel_ratio(mut self, pixel_ratio: f64) -> Self {
        self.pixel_ratio = pixel_ratio;
        self
    }

    /// Same viewport with each dimension raised to at least one pixel
    pub fn clamped(self) -> Self {
        Self {
            width: self.width.max(1),
            height: self.height.max(1),
            pixel_ratio: self.pixel_ratio,
        }
    }

    /// Width over height, computed on the clamped size so it is always finite
    pub fn aspect(&self) -> f32 {
        let c = self.clamped();
        c.width as f32 / c.height as f32
    }

    pub fn is_degenerate(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Identity of a rendering surface attached to a container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CanvasId(u64);

impl CanvasId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    /// (subscription id, latest undelivered viewport)
    subscribers: Vec<(u64, Option<Viewport>)>,
}

/// Resize notifications for one surface.
///
/// Subscribers receive the most recent size emitted since they last looked;
/// intermediate sizes are coalesced. Dropping a [`ResizeSubscription`]
/// unsubscribes it.
#[derive(Debug, Default)]
pub struct ResizeSignal {
    registry: Rc<RefCell<Registry>>,
}

impl ResizeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> ResizeSubscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push((id, None));
        ResizeSubscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn emit(&self, viewport: Viewport) {
        for (_, pending) in self.registry.borrow_mut().subscribers.iter_mut() {
            *pending = Some(viewport);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().subscribers.len()
    }
}

/// Handle returned by [`ResizeSignal::subscribe`]
#[derive(Debug)]
pub struct ResizeSubscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl ResizeSubscription {
    /// Take the pending resize, if any
    pub fn take(&self) -> Option<Viewport> {
        let registry = self.registry.upgrade()?;
        let mut registry = registry.borrow_mut();
        registry
            .subscribers
            .iter_mut()
            .find(|(id, _)| *id == self.id)
            .and_then(|(_, pending)| pending.take())
    }

    pub fn is_connected(&self) -> bool {
        self.registry.upgrade().is_some()
    }
}

impl Drop for ResizeSubscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
