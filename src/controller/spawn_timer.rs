/// Fixed-period spawn clock driven by wall time.
///
/// The timer keeps the remainder between calls so the long-run rate holds
/// even when frames arrive unevenly. After a stall (hidden tab, debugger)
/// at most `max_catch_up` periods fire at once.
#[derive(Clone, Debug)]
pub struct SpawnTimer {
    period_ms: f64,
    max_catch_up: u32,
    last_ms: Option<f64>,
    carry_ms: f64,
}

pub const DEFAULT_MAX_CATCH_UP: u32 = 10;

impl SpawnTimer {
    pub fn new(period_ms: f64) -> Self {
        Self {
            period_ms: period_ms.max(1.0),
            max_catch_up: DEFAULT_MAX_CATCH_UP,
            last_ms: None,
            carry_ms: 0.0,
        }
    }

    /// Number of periods elapsed since the previous call. The first call
    /// only starts the clock.
    pub fn due(&mut self, now_ms: f64) -> u32 {
        let Some(last) = self.last_ms.replace(now_ms) else {
            return 0;
        };
        // clock going backwards counts as no time passing
        self.carry_ms += (now_ms - last).max(0.0);

        let periods = (self.carry_ms / self.period_ms).floor();
        if periods >= self.max_catch_up as f64 {
            self.carry_ms = 0.0;
            return self.max_catch_up;
        }
        self.carry_ms -= periods * self.period_ms;
        periods as u32
    }
}
