/// Three-part amplitude shape of a played voice: rise, sustain, release over the last third.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    duration: f64,
}

const MIN_ATTACK_SECONDS: f64 = 0.5;
const DRIVE_SUSTAIN: f64 = 0.9;
const DRIVE_RELEASE: f64 = 0.35;

impl Envelope {
    pub fn new(duration_seconds: f64) -> Self {
        Self {
            duration: duration_seconds.max(0.0),
        }
    }

    fn unit(&self) -> f64 {
        self.duration / 3.0
    }

    fn attack(&self) -> f64 {
        (self.unit() * 0.75)
            .max(MIN_ATTACK_SECONDS)
            .min(self.unit() * 2.0)
    }

    /// Output gain in `[0, 1]` at `t` seconds after the trigger.
    pub fn gain(&self, t: f64) -> f64 {
        let unit = self.unit();
        if unit <= 0.0 || !(0.0..self.duration).contains(&t) {
            return 0.0;
        }
        let attack = self.attack();
        if t < attack {
            let x = t / attack;
            x * x
        } else if t < unit * 2.0 {
            1.0
        } else {
            let x = 1.0 - (t - unit * 2.0) / unit;
            (x * x).clamp(0.0, 1.0)
        }
    }

    /// Gain of the inner feedback stage, easing from sustain to release in the last third.
    pub fn drive(&self, t: f64) -> f64 {
        let unit = self.unit();
        if unit <= 0.0 || t < unit * 2.0 {
            return DRIVE_SUSTAIN;
        }
        let progress = ((t - unit * 2.0) / unit).clamp(0.0, 1.0);
        DRIVE_SUSTAIN + (DRIVE_RELEASE - DRIVE_SUSTAIN) * progress
    }
}
