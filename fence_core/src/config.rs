//! Runtime configuration of the motion core.

/// Step counts for the fixed-distance helper moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionCfg {
    /// Steps per nudge button press.
    pub nudge_steps: u32,
    /// Steps moved by a calibration run.
    pub calibration_steps: u32,
}

impl Default for MotionCfg {
    fn default() -> Self {
        Self {
            nudge_steps: 3,
            calibration_steps: 1000,
        }
    }
}

/// Bounce recovery tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitCfg {
    /// Length of each reverse micro-move off a tripped switch.
    pub bounce_steps: u32,
    /// Micro-moves allowed before the switch is declared stuck.
    pub max_bounce_cycles: u32,
}

impl Default for LimitCfg {
    fn default() -> Self {
        Self {
            bounce_steps: 50,
            max_bounce_cycles: 40,
        }
    }
}
