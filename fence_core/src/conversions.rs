//! `From` implementations bridging `fence_config` types to `fence_core` types.

use crate::config::{LimitCfg, MotionCfg};
use crate::cutlist::{Cut, CutList};

impl From<&fence_config::MotionCfg> for MotionCfg {
    fn from(c: &fence_config::MotionCfg) -> Self {
        Self {
            nudge_steps: c.nudge_steps,
            calibration_steps: c.calibration_steps,
        }
    }
}

impl From<&fence_config::LimitsCfg> for LimitCfg {
    fn from(c: &fence_config::LimitsCfg) -> Self {
        Self {
            bounce_steps: c.bounce_steps,
            max_bounce_cycles: c.max_bounce_cycles,
        }
    }
}

impl From<&fence_config::CutRow> for Cut {
    fn from(r: &fence_config::CutRow) -> Self {
        Self {
            label: r.label.clone(),
            inches: r.inches,
        }
    }
}

impl From<&[fence_config::CutRow]> for CutList {
    fn from(rows: &[fence_config::CutRow]) -> Self {
        CutList::new(rows.iter().map(Cut::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_runtime_defaults() {
        let m = MotionCfg::from(&fence_config::MotionCfg::default());
        assert_eq!(m, MotionCfg::default());
        let l = LimitCfg::from(&fence_config::LimitsCfg::default());
        assert_eq!(l, LimitCfg::default());
    }

    #[test]
    fn rows_become_cuts_in_order() {
        let rows = vec![
            fence_config::CutRow {
                label: "rail".into(),
                inches: 12.5,
            },
            fence_config::CutRow {
                label: "stile".into(),
                inches: 30.0,
            },
        ];
        let mut list = CutList::from(rows.as_slice());
        assert_eq!(list.len(), 2);
        assert_eq!(list.next_cut().map(|c| c.label.clone()), Some("rail".into()));
    }
}
