/// Longest real frame time folded into the accumulator. Longer stalls are
/// dropped rather than replayed.
pub const MAX_FRAME_DELTA: f32 = 0.25;

pub struct FixedTimestep {
    tick_rate: u32,
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn accumulate(&mut self, delta: f32) {
        if delta.is_finite() && delta > 0.0 {
            self.accumulator += delta.min(MAX_FRAME_DELTA);
        }
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator >= self.dt
    }

    pub fn consume_tick(&mut self) -> bool {
        if self.accumulator >= self.dt {
            self.accumulator -= self.dt;
            true
        } else {
            false
        }
    }

    /// Accumulates `delta` and returns how many whole ticks are now due.
    pub fn advance(&mut self, delta: f32) -> u32 {
        self.accumulate(delta);
        let mut ticks = 0;
        while self.consume_tick() {
            ticks += 1;
        }
        ticks
    }

    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
