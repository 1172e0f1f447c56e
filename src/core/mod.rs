pub mod gpu_context;
pub mod input_adapter;
pub mod orbit_controls;
pub mod viewport;

pub use gpu_context::GpuContext;
pub use input_adapter::PointerAdapter;
pub use orbit_controls::OrbitControls;
pub use viewport::{CanvasId, ResizeSignal, ResizeSubscription, Viewport};
