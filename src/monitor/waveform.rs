//! Synthetic PQRST morphology over one normalised cardiac cycle.
//!
//! Phase runs over `[0, 1)`. Each deflection is a Gaussian bump; the R wave is
//! centred on [`R_WAVE_PHASE`], which is also where beat detection anchors.
//! Amplitudes are in display units before the amplitude gain is applied.
use std::f64::consts::PI;

/// Phase at which the oscillator reports an R-peak.
pub const R_WAVE_PHASE: f64 = 0.40;

const WANDER_AMPLITUDE: f64 = 0.03;
const WANDER_FREQUENCY_HZ: f64 = 0.33;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Deflection {
    pub name: &'static str,
    pub center: f64,
    pub width: f64,
    pub amplitude: f64,
}

impl Deflection {
    fn at(&self, phase: f64) -> f64 {
        let z = (phase - self.center) / self.width;
        self.amplitude * (-0.5 * z * z).exp()
    }
}

pub const PQRST: [Deflection; 5] = [
    Deflection { name: "P", center: 0.18, width: 0.025, amplitude: 0.10 },
    Deflection { name: "Q", center: 0.38, width: 0.010, amplitude: -0.15 },
    Deflection { name: "R", center: R_WAVE_PHASE, width: 0.015, amplitude: 1.10 },
    Deflection { name: "S", center: 0.43, width: 0.012, amplitude: -0.25 },
    Deflection { name: "T", center: 0.68, width: 0.050, amplitude: 0.30 },
];

/// Instantaneous template amplitude at `phase`.
pub fn template(phase: f64) -> f64 {
    PQRST.iter().map(|d| d.at(phase)).sum()
}

/// Slow respiratory-like drift of the isoelectric line.
pub fn baseline_wander(elapsed_seconds: f64) -> f64 {
    WANDER_AMPLITUDE * (2.0 * PI * WANDER_FREQUENCY_HZ * elapsed_seconds).sin()
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn r_wave_dominates_the_cycle() {
        let peak = template(R_WAVE_PHASE);
        assert!(peak > 1.0);
        for i in 0..1000 {
            let phase = i as f64 / 1000.0;
            assert!(template(phase) <= peak + 1e-3, "phase {phase}");
        }
    }
    #[test]
    fn deflection_signs_match_morphology() {
        assert!(template(0.18) > 0.05);
        assert!(template(0.43) < 0.0);
        assert!(template(0.68) > 0.25);
        // isoelectric stretch between T and the next P
        assert!(template(0.95).abs() < 1e-3);
    }
    #[test]
    fn wander_is_bounded() {
        for i in 0..500 {
            assert!(baseline_wander(i as f64 * 0.05).abs() <= WANDER_AMPLITUDE);
        }
        assert_eq!(baseline_wander(0.0), 0.0);
    }
}
