//! Backend assembly: simulated axis by default, GPIO with the `hardware` feature.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fence_core::{Calibration, ControllerBuilder, FenceController, StatusPublisher, TomlFileStore};
use fence_traits::{Clock, LimitInputs, StepperDriver};

pub type Backend = (Box<dyn StepperDriver>, Box<dyn LimitInputs>);

#[cfg(not(feature = "hardware"))]
pub fn make_backend(cfg: &fence_config::Config) -> eyre::Result<(Backend, Arc<dyn Clock + Send + Sync>)> {
    use fence_hardware::{SimAxis, SimGeometry};

    let geometry = SimGeometry {
        left_trip: cfg.sim.left_trip,
        right_trip: cfg.sim.right_trip,
        release_steps: cfg.sim.release_steps,
    };
    let axis = SimAxis::new(geometry, cfg.sim.start_at);
    let (stepper, limits) = axis.split();
    let clock: Arc<dyn Clock + Send + Sync> = if cfg.sim.realtime {
        Arc::new(fence_traits::MonotonicClock::new())
    } else {
        Arc::new(fence_traits::ManualClock::new())
    };
    tracing::info!(start_at = cfg.sim.start_at, realtime = cfg.sim.realtime, "using simulated axis");
    let driver: Box<dyn StepperDriver> = Box::new(stepper);
    let limits: Box<dyn LimitInputs> = Box::new(limits);
    Ok(((driver, limits), clock))
}

#[cfg(feature = "hardware")]
pub fn make_backend(cfg: &fence_config::Config) -> eyre::Result<(Backend, Arc<dyn Clock + Send + Sync>)> {
    #[cfg(target_os = "linux")]
    {
        use eyre::WrapErr;
        use fence_hardware::gpio::{GpioLimits, GpioStepper};

        let p = &cfg.pins;
        let stepper = GpioStepper::new(
            p.motor_step,
            p.motor_dir,
            p.motor_en,
            cfg.motion.step_pulse_us,
        )
        .wrap_err("open motor pins")?;
        let limits = GpioLimits::new(
            p.limit_left,
            p.limit_right,
            cfg.limits.active_low,
            cfg.limits.samples,
        )
        .wrap_err("open limit pins")?;
        let clock: Arc<dyn Clock + Send + Sync> = Arc::new(fence_traits::MonotonicClock::new());
        let driver: Box<dyn StepperDriver> = Box::new(stepper);
        let limits: Box<dyn LimitInputs> = Box::new(limits);
        Ok(((driver, limits), clock))
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = cfg;
        eyre::bail!("the GPIO backend is only available on Linux")
    }
}

/// Load calibration from `[storage].path` and assemble the controller.
pub fn build_controller(
    cfg: &fence_config::Config,
    stop: Arc<AtomicBool>,
    events: StatusPublisher,
) -> eyre::Result<(FenceController, TomlFileStore)> {
    let store = TomlFileStore::open(&cfg.storage.path);
    let calibration = Calibration::load(&store);
    let ((driver, limits), clock) = make_backend(cfg)?;

    let mut builder = ControllerBuilder::new()
        .with_driver(driver)
        .with_limits(limits)
        .with_calibration(calibration)
        .with_motion((&cfg.motion).into())
        .with_limit_cfg((&cfg.limits).into())
        .with_clock(clock)
        .with_events(events)
        .with_stop_check(move || stop.load(Ordering::Relaxed));
    if let Some(pct) = cfg.motion.initial_speed_percent {
        builder = builder.with_initial_speed_percent(pct);
    }
    let controller = builder.build()?;
    Ok((controller, store))
}
