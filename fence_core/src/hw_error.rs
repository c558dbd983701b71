//! Maps `Box<dyn Error>` from trait boundaries to typed `FenceError`.
//!
//! The traits in `fence_traits` use `Box<dyn Error + Send + Sync>` for maximum
//! flexibility; this module converts those to our typed error enum, with an
//! optional feature-gated path for `fence_hardware::HwError` downcasting.

use crate::error::FenceError;

/// Map a trait-boundary error to a typed `FenceError`.
///
/// Attempts to downcast known hardware error types first, then falls back
/// to string-based heuristics.
pub fn map_hw_error(e: &(dyn std::error::Error + 'static)) -> FenceError {
    #[cfg(feature = "hardware-errors")]
    {
        if let Some(hw) = e.downcast_ref::<fence_hardware::error::HwError>() {
            return match hw {
                fence_hardware::error::HwError::Disabled => FenceError::MotorDisabled,
                other => FenceError::HardwareFault(other.to_string()),
            };
        }
    }

    let s = e.to_string();
    if s.to_lowercase().contains("disabled") {
        FenceError::MotorDisabled
    } else {
        FenceError::Hardware(s)
    }
}

/// Convenience for `map_err` on boxed trait results.
pub(crate) fn to_report(e: fence_traits::BoxError) -> eyre::Report {
    eyre::Report::new(map_hw_error(&*e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_errors_fall_back_to_hardware() {
        let e: fence_traits::BoxError = "pin 13 busy".into();
        assert_eq!(
            map_hw_error(&*e),
            FenceError::Hardware("pin 13 busy".into())
        );
    }

    #[cfg(feature = "hardware-errors")]
    #[test]
    fn hw_errors_downcast() {
        let e: fence_traits::BoxError = Box::new(fence_hardware::error::HwError::Disabled);
        assert_eq!(map_hw_error(&*e), FenceError::MotorDisabled);
        let e: fence_traits::BoxError =
            Box::new(fence_hardware::error::HwError::Gpio("no /dev/gpiomem".into()));
        assert!(matches!(map_hw_error(&*e), FenceError::HardwareFault(_)));
    }
}
