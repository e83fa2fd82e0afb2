use super::clock::Clock;

/// Timing handed to the per-frame update hook
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    pub number: u64,
    /// Seconds since the loop started
    pub time: f32,
    /// Seconds since the previous frame
    pub delta: f32,
}

impl FrameInfo {
    pub fn new(number: u64, time: f32, delta: f32) -> Self {
        Self { number, time, delta }
    }
}

/// Produces one [`FrameInfo`] per loop tick
#[derive(Debug, Default)]
pub struct FrameCounter {
    clock: Clock,
    number: u64,
}

impl FrameCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_frame(&mut self) -> FrameInfo {
        let delta = self.clock.tick();
        let info = FrameInfo::new(self.number, self.clock.elapsed(), delta);
        self.number += 1;
        info
    }

    pub fn frame_count(&self) -> u64 {
        self.number
    }
}
