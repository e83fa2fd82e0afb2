use glam::Vec2;
use serde::Deserialize;

/// Divisor turning a per-event pixel delta into the speed scalar
const SPEED_SCALE: f32 = 100.0;

/// How window coordinates map to normalized device coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerMapping {
    /// `y = (client_y / height) * 2 + 1`. Kept for compatibility with
    /// scenes tuned against it; y lands in [1, 3].
    #[default]
    Legacy,
    /// `y = -(client_y / height) * 2 + 1`, y up in [-1, 1]
    Standard,
}

/// Pointer position in normalized device coordinates
pub fn normalized_pointer(client: Vec2, window: (f64, f64), mapping: PointerMapping) -> Vec2 {
    let (width, height) = (window.0.max(1.0) as f32, window.1.max(1.0) as f32);
    let x = (client.x / width) * 2.0 - 1.0;
    let y = match mapping {
        PointerMapping::Legacy => (client.y / height) * 2.0 + 1.0,
        PointerMapping::Standard => -(client.y / height) * 2.0 + 1.0,
    };
    Vec2::new(x, y)
}

/// Pointer speed from consecutive move events
#[derive(Debug, Clone, Default)]
pub struct MouseSpeedTracker {
    last: Option<Vec2>,
    speed: f32,
}

impl MouseSpeedTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a page position; returns the current speed
    pub fn on_move(&mut self, page: Vec2) -> f32 {
        if let Some(last) = self.last {
            let delta = (page - last).abs();
            self.speed = delta.x.max(delta.y) / SPEED_SCALE;
        }
        self.last = Some(page);
        self.speed
    }

    /// Pointer left the document. The last position is kept, matching the
    /// host behaviour where only the speed is cleared.
    pub fn on_leave(&mut self) {
        self.speed = 0.0;
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }
}
