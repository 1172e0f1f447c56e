use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use crate::traits::PointerInput;

/// Pixels of touchpad scroll that count as one wheel step
const PIXELS_PER_LINE: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DragMode {
    Rotate,
    Pan,
}

/// Adapter that turns winit pointer events into [`PointerInput`].
///
/// Left drag rotates, right or middle drag pans, the wheel zooms.
#[derive(Debug, Clone, Default)]
pub struct PointerAdapter {
    drag: Option<DragMode>,
    /// Current cursor position (relative to window)
    cursor: Option<(f32, f32)>,
}

impl PointerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn button(&mut self, button: MouseButton, state: ElementState) {
        let mode = match button {
            MouseButton::Left => DragMode::Rotate,
            MouseButton::Right | MouseButton::Middle => DragMode::Pan,
            _ => return,
        };

        match state {
            ElementState::Pressed => {
                if self.drag.is_none() {
                    self.drag = Some(mode);
                }
            }
            ElementState::Released => {
                if self.drag == Some(mode) {
                    self.drag = None;
                }
            }
        }
    }

    pub fn cursor_moved(&mut self, x: f32, y: f32) -> Option<PointerInput> {
        let previous = self.cursor.replace((x, y));
        let (px, py) = previous?;
        let (dx, dy) = (x - px, y - py);
        if dx == 0.0 && dy == 0.0 {
            return None;
        }

        match self.drag? {
            DragMode::Rotate => Some(PointerInput::Rotate { dx, dy }),
            DragMode::Pan => Some(PointerInput::Pan { dx, dy }),
        }
    }

    pub fn wheel(&mut self, delta: MouseScrollDelta) -> PointerInput {
        let steps = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_LINE,
        };
        PointerInput::Zoom { delta: steps }
    }

    /// Cursor left the window; the next move starts a fresh drag segment
    pub fn cursor_left(&mut self) {
        self.cursor = None;
    }

    /// Process a winit WindowEvent, returning the camera input it produces
    pub fn process_event(&mut self, event: &WindowEvent) -> Option<PointerInput> {
        match event {
            WindowEvent::MouseInput { state, button, .. } => {
                self.button(*button, *state);
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(position.x as f32, position.y as f32)
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor_left();
                None
            }
            WindowEvent::MouseWheel { delta, .. } => Some(self.wheel(*delta)),
            _ => None,
        }
    }

    /// Track an event the overlay consumed. Presses and wheel steps stay with
    /// the overlay, but a release still ends the drag it belongs to and the
    /// cursor anchor keeps following the pointer.
    pub fn process_consumed_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button,
                ..
            } => self.button(*button, ElementState::Released),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some((position.x as f32, position.y as f32));
            }
            WindowEvent::CursorLeft { .. } => self.cursor_left(),
            _ => {}
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;

    // winit only hands out DeviceIds through an unsafe dummy constructor, so
    // most of these drive the adapter through its typed entry points.

    fn mouse(button: MouseButton, state: ElementState) -> WindowEvent {
        WindowEvent::MouseInput {
            // SAFETY: the id is only compared, never resolved to a device
            device_id: unsafe { winit::event::DeviceId::dummy() },
            state,
            button,
        }
    }

    #[test]
    fn moving_without_button_is_ignored() {
        let mut adapter = PointerAdapter::new();
        assert_eq!(adapter.cursor_moved(10.0, 10.0), None);
        assert_eq!(adapter.cursor_moved(20.0, 15.0), None);
        assert!(!adapter.is_dragging());
    }

    #[test]
    fn left_drag_rotates() {
        let mut adapter = PointerAdapter::new();
        adapter.cursor_moved(10.0, 10.0);
        adapter.button(MouseButton::Left, ElementState::Pressed);

        assert_eq!(
            adapter.cursor_moved(15.0, 7.0),
            Some(PointerInput::Rotate { dx: 5.0, dy: -3.0 })
        );

        adapter.button(MouseButton::Left, ElementState::Released);
        assert_eq!(adapter.cursor_moved(20.0, 7.0), None);
    }

    #[test]
    fn right_and_middle_drag_pan() {
        for button in [MouseButton::Right, MouseButton::Middle] {
            let mut adapter = PointerAdapter::new();
            adapter.cursor_moved(0.0, 0.0);
            adapter.button(button, ElementState::Pressed);
            assert_eq!(
                adapter.cursor_moved(4.0, 2.0),
                Some(PointerInput::Pan { dx: 4.0, dy: 2.0 })
            );
        }
    }

    #[test]
    fn first_button_wins_until_released() {
        let mut adapter = PointerAdapter::new();
        adapter.cursor_moved(0.0, 0.0);
        adapter.button(MouseButton::Left, ElementState::Pressed);
        adapter.button(MouseButton::Right, ElementState::Pressed);
        assert!(matches!(adapter.cursor_moved(1.0, 0.0), Some(PointerInput::Rotate { .. })));

        // Releasing the other button does not end the drag
        adapter.button(MouseButton::Right, ElementState::Released);
        assert!(adapter.is_dragging());
    }

    #[test]
    fn leaving_the_window_resets_the_anchor() {
        let mut adapter = PointerAdapter::new();
        adapter.cursor_moved(0.0, 0.0);
        adapter.button(MouseButton::Left, ElementState::Pressed);
        adapter.cursor_left();
        assert_eq!(adapter.cursor_moved(300.0, 300.0), None);
    }

    #[test]
    fn wheel_steps() {
        let mut adapter = PointerAdapter::new();
        assert_eq!(
            adapter.wheel(MouseScrollDelta::LineDelta(0.0, 2.0)),
            PointerInput::Zoom { delta: 2.0 }
        );
        assert_eq!(
            adapter.wheel(MouseScrollDelta::PixelDelta(PhysicalPosition::new(0.0, -100.0))),
            PointerInput::Zoom { delta: -2.0 }
        );
    }

    #[test]
    fn consumed_release_ends_the_drag() {
        let mut adapter = PointerAdapter::new();
        adapter.process_event(&mouse(MouseButton::Left, ElementState::Pressed));
        adapter.cursor_moved(10.0, 10.0);
        assert!(adapter.cursor_moved(20.0, 10.0).is_some());

        // Released over the overlay panel
        adapter.process_consumed_event(&mouse(MouseButton::Left, ElementState::Released));
        assert!(!adapter.is_dragging());
        assert_eq!(adapter.cursor_moved(40.0, 30.0), None);
    }

    #[test]
    fn consumed_press_does_not_start_a_drag() {
        let mut adapter = PointerAdapter::new();
        adapter.process_consumed_event(&mouse(MouseButton::Right, ElementState::Pressed));
        assert!(!adapter.is_dragging());

        adapter.cursor_moved(0.0, 0.0);
        assert_eq!(adapter.cursor_moved(5.0, 5.0), None);
    }
}
