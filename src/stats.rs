use crate::core::Clock;

const FPS_UPDATE_INTERVAL: f32 = 1.0;

/// Snapshot drawn by the renderer's debug overlay
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatsPanel {
    pub fps: f32,
    pub frame_ms: f32,
    pub frames: u64,
}

/// Debug performance counter, created with the scene in debug mode
#[derive(Debug)]
pub struct Stats {
    clock: Clock,
    frame_count: u32,
    fps_update_timer: f32,
    fps: f32,
    frame_ms: f32,
    frames: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            clock: Clock::new(),
            frame_count: 0,
            fps_update_timer: 0.0,
            fps: 0.0,
            frame_ms: 0.0,
            frames: 0,
        }
    }

    /// Count one frame using wall-clock time
    pub fn update(&mut self) {
        let delta = self.clock.tick();
        self.update_with_delta(delta);
    }

    pub fn update_with_delta(&mut self, delta: f32) {
        self.frames += 1;
        self.frame_count += 1;
        self.fps_update_timer += delta;
        self.frame_ms = delta * 1000.0;

        if self.fps_update_timer >= FPS_UPDATE_INTERVAL {
            self.fps = self.frame_count as f32 / self.fps_update_timer;
            log::debug!("FPS: {:.1}", self.fps);
            self.frame_count = 0;
            self.fps_update_timer = 0.0;
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn panel(&self) -> StatsPanel {
        StatsPanel {
            fps: self.fps,
            frame_ms: self.frame_ms,
            frames: self.frames,
        }
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}
