pub mod controller;
pub mod renderer;
pub mod window;

pub use controller::*;
pub use renderer::*;
pub use window::*;
