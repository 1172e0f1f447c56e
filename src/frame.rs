use std::sync::Arc;
use std::time::Instant;

use crate::traits::FrameScheduler;

const FPS_UPDATE_INTERVAL: f32 = 1.0;

/// Frame metadata - carries frame number and timing info
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub number: u64,
    pub time: f32,
    pub delta: f32,
}

impl FrameInfo {
    pub fn new(number: u64, time: f32, delta: f32) -> Self {
        Self { number, time, delta }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Created, no frame requested yet
    Idle,
    /// A frame slot has been requested from the scheduler
    Scheduled,
    /// Inside a frame, not yet rescheduled
    Running,
    Stopped,
}

/// Self-rescheduling render loop driven by the display refresh signal.
///
/// Each display slot yields at most one frame. Missed slots are not caught up.
/// Once stopped the loop never schedules or yields again.
pub struct FrameLoop {
    scheduler: Arc<dyn FrameScheduler>,
    state: LoopState,
    frame_number: u64,
    start_time: Instant,
    last_frame_time: Instant,
}

impl FrameLoop {
    pub fn new(scheduler: Arc<dyn FrameScheduler>) -> Self {
        let now = Instant::now();
        Self {
            scheduler,
            state: LoopState::Idle,
            frame_number: 0,
            start_time: now,
            last_frame_time: now,
        }
    }

    /// Request the first frame
    pub fn begin(&mut self) {
        if self.state == LoopState::Idle {
            let now = Instant::now();
            self.start_time = now;
            self.last_frame_time = now;
            self.schedule();
        }
    }

    /// Enter a frame slot. `None` if the loop is stopped or no frame was requested.
    pub fn next_frame(&mut self) -> Option<FrameInfo> {
        if self.state != LoopState::Scheduled {
            return None;
        }

        let now = Instant::now();
        let delta = now.duration_since(self.last_frame_time).as_secs_f32();
        let time = now.duration_since(self.start_time).as_secs_f32();
        let info = FrameInfo::new(self.frame_number, time, delta);

        self.frame_number += 1;
        self.last_frame_time = now;
        self.state = LoopState::Running;

        Some(info)
    }

    /// Ask for the next display slot after finishing a frame
    pub fn reschedule(&mut self) {
        if self.state == LoopState::Running {
            self.schedule();
        }
    }

    pub fn stop(&mut self) {
        self.state = LoopState::Stopped;
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_stopped(&self) -> bool {
        self.state == LoopState::Stopped
    }

    /// Frames yielded so far
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }

    fn schedule(&mut self) {
        self.state = LoopState::Scheduled;
        self.scheduler.request_frame();
    }
}

/// Frames-per-second averaged over one-second windows
#[derive(Debug, Clone, Default)]
pub struct FpsCounter {
    fps: f32,
    frames: u32,
    elapsed: f32,
}

impl FpsCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, delta: f32) {
        self.frames += 1;
        self.elapsed += delta;

        if self.elapsed >= FPS_UPDATE_INTERVAL {
            self.fps = self.frames as f32 / self.elapsed;
            log::trace!("FPS: {:.1}", self.fps);
            self.frames = 0;
            self.elapsed = 0.0;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}
