use proptest::prelude::*;
use pump_core::{
    InfusionController, PumpEvent, ReservoirCfg, TickCfg, TickStatus,
};

fn build(capacity_ul: f64, increment_ul: f64) -> (InfusionController, crossbeam_channel::Receiver<PumpEvent>) {
    InfusionController::builder()
        .with_reservoir(ReservoirCfg {
            capacity_ul,
            low_fraction: 0.05,
        })
        .with_tick(TickCfg {
            increment_ul,
            fallback_delay_ms: 100,
        })
        .build()
        .unwrap()
}

proptest! {
    /// For any valid dose and any pause schedule, progress is monotone,
    /// bounded by the target, ends exactly at the target, and the
    /// reservoir loses exactly the injected volume.
    #[test]
    fn runs_conserve_volume_under_pauses(
        target_du in 1u32..2000,        // decimicroliters: 0.1 ..= 199.9 uL
        increment_du in 1u32..20,       // 0.1 ..= 1.9 uL per tick
        pause_every in prop::option::of(5usize..50),
    ) {
        let target_ul = f64::from(target_du) / 10.0;
        let increment_ul = f64::from(increment_du) / 10.0;
        let (mut ctl, rx) = build(5000.0, increment_ul);

        prop_assert!(ctl.start(target_ul, 1.0).is_ok());
        let mut ticks = 0usize;
        loop {
            ticks += 1;
            prop_assert!(ticks < 1_000_000, "run did not terminate");
            if let Some(n) = pause_every
                && ticks % n == 0
            {
                prop_assert!(ctl.pause().is_ok());
                prop_assert!(ctl.start(0.0, 0.0).is_ok()); // resume
            }
            match ctl.tick() {
                TickStatus::Running { .. } => continue,
                TickStatus::Finished => break,
                TickStatus::Idle => prop_assert!(false, "tick while not running"),
            }
        }

        // Conservation: injected == target, reservoir down by target.
        prop_assert_eq!(ctl.injected_ul(), ctl.target_ul());
        prop_assert!((5000.0 - ctl.remaining_ul() - ctl.injected_ul()).abs() < 1e-9);

        // Progress stream: monotone non-decreasing, bounded by target.
        let mut last = 0.0f64;
        let mut alerts = 0usize;
        for ev in rx.try_iter() {
            match ev {
                PumpEvent::Progress { injected_ul, target_ul, .. } => {
                    prop_assert!(injected_ul >= last);
                    prop_assert!(injected_ul <= target_ul);
                    last = injected_ul;
                }
                PumpEvent::LowReservoirAlert => alerts += 1,
                _ => {}
            }
        }
        prop_assert!(alerts <= 1, "low alert fired {alerts} times in one run");
    }
}
