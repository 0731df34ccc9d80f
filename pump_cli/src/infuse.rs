//! The `infuse` and `self-check` commands: pump assembly, signal
//! handling, and event rendering.

use eyre::{Result, eyre};
use pump_core::{
    InfusionControllerBuilder, Pump, PumpEvent, RejectReason, ReservoirCfg, TickStatus,
};
use pump_traits::{Clock, MonotonicClock};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

pub struct InfuseArgs {
    pub volume_ul: f64,
    pub speed_ul_s: f64,
    pub capacity_ul: Option<f64>,
    pub level_ul: Option<f64>,
    pub yes: bool,
    pub json: bool,
}

/// How often the event loop wakes to check for a pending ctrl-c.
const SIGNAL_POLL: Duration = Duration::from_millis(100);

enum Outcome {
    Finished,
    Stopped { injected_ul: f64 },
    Rejected(RejectReason),
}

pub fn run(cfg: &pump_config::Config, args: InfuseArgs) -> Result<()> {
    // Advisory thresholds only warn inside the controller; refusing to
    // proceed without explicit confirmation is this layer's job.
    if !args.yes {
        if args.volume_ul > cfg.advisory.max_volume_ul {
            eyre::bail!(
                "target volume {} uL exceeds the advisory limit of {} uL; rerun with --yes to proceed",
                args.volume_ul,
                cfg.advisory.max_volume_ul
            );
        }
        if args.speed_ul_s > cfg.advisory.max_speed_ul_s {
            eyre::bail!(
                "speed {} uL/s exceeds the advisory limit of {} uL/s; rerun with --yes to proceed",
                args.speed_ul_s,
                cfg.advisory.max_speed_ul_s
            );
        }
    }

    let mut builder = InfusionControllerBuilder::from_config(cfg);
    if let Some(capacity_ul) = args.capacity_ul {
        builder = builder.with_reservoir(ReservoirCfg {
            capacity_ul,
            low_fraction: cfg.reservoir.low_fraction,
        });
    }
    if let Some(level_ul) = args.level_ul {
        builder = builder.with_initial_level_ul(level_ul);
    }
    let pump = Pump::spawn(builder).map_err(eyre::Report::new)?;
    let rx = pump.events();

    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = Arc::clone(&interrupted);
        ctrlc::set_handler(move || interrupted.store(true, Ordering::SeqCst))
            .map_err(|e| eyre!("installing ctrl-c handler: {e}"))?;
    }

    let clock = MonotonicClock::new();
    let epoch = clock.now();
    pump.start(args.volume_ul, args.speed_ul_s);

    let mut stop_sent = false;
    let mut last_decile = 0u8;
    let outcome = loop {
        if interrupted.load(Ordering::SeqCst) && !stop_sent {
            tracing::warn!("interrupt received, stopping infusion");
            pump.stop();
            stop_sent = true;
        }
        match rx.recv_timeout(SIGNAL_POLL) {
            Ok(ev) => {
                let at_ms = clock.ms_since(epoch);
                if let Some(outcome) = render(&ev, args.json, at_ms, &mut last_decile) {
                    break outcome;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                return Err(eyre!("pump worker exited unexpectedly"));
            }
        }
    };
    let elapsed_ms = clock.ms_since(epoch);
    drop(pump); // joins the worker

    match outcome {
        Outcome::Finished => {
            summary(args.json, "finished", args.volume_ul, elapsed_ms);
            Ok(())
        }
        Outcome::Stopped { injected_ul } => {
            summary(args.json, "stopped", injected_ul, elapsed_ms);
            Ok(())
        }
        Outcome::Rejected(reason) => Err(eyre!("infusion rejected: {reason}")),
    }
}

/// Render one event; returns the outcome when the event is terminal
/// for a single-run session.
fn render(ev: &PumpEvent, json: bool, at_ms: u64, last_decile: &mut u8) -> Option<Outcome> {
    if json {
        println!("{}", event_json(ev, at_ms));
    }
    match ev {
        PumpEvent::Progress {
            injected_ul,
            target_ul,
            remaining_ul,
        } => {
            tracing::debug!(injected_ul, target_ul, remaining_ul, "progress");
            if !json && *target_ul > 0.0 {
                // Decile milestones keep a slow run quiet but visible.
                let decile = ((injected_ul / target_ul) * 10.0).floor() as u8;
                if decile > *last_decile {
                    *last_decile = decile;
                    tracing::info!(
                        "{:.1}% done ({injected_ul:.1} of {target_ul:.1} uL)",
                        injected_ul / target_ul * 100.0
                    );
                }
            }
            None
        }
        PumpEvent::StateChanged(state) => {
            tracing::debug!(%state, "state changed");
            None
        }
        PumpEvent::Paused { injected_ul } => {
            tracing::info!(injected_ul, "paused");
            None
        }
        PumpEvent::Stopped { injected_ul } => Some(Outcome::Stopped {
            injected_ul: *injected_ul,
        }),
        PumpEvent::Finished => Some(Outcome::Finished),
        PumpEvent::LowReservoirAlert => {
            tracing::warn!("reservoir level is low");
            None
        }
        PumpEvent::Rejected(reason) => Some(Outcome::Rejected(reason.clone())),
        PumpEvent::Advisory(adv) => {
            tracing::warn!("advisory: {adv}");
            None
        }
        PumpEvent::Log(msg) => {
            tracing::info!(target: "pump", "{msg}");
            None
        }
    }
}

fn event_json(ev: &PumpEvent, at_ms: u64) -> serde_json::Value {
    match ev {
        PumpEvent::Progress {
            injected_ul,
            target_ul,
            remaining_ul,
        } => serde_json::json!({
            "t_ms": at_ms,
            "event": "progress",
            "injected_ul": injected_ul,
            "target_ul": target_ul,
            "remaining_ul": remaining_ul,
        }),
        PumpEvent::StateChanged(state) => serde_json::json!({
            "t_ms": at_ms,
            "event": "state_changed",
            "state": state.to_string(),
        }),
        PumpEvent::Paused { injected_ul } => serde_json::json!({
            "t_ms": at_ms,
            "event": "paused",
            "injected_ul": injected_ul,
        }),
        PumpEvent::Stopped { injected_ul } => serde_json::json!({
            "t_ms": at_ms,
            "event": "stopped",
            "injected_ul": injected_ul,
        }),
        PumpEvent::Finished => serde_json::json!({
            "t_ms": at_ms,
            "event": "finished",
        }),
        PumpEvent::LowReservoirAlert => serde_json::json!({
            "t_ms": at_ms,
            "event": "low_reservoir_alert",
        }),
        PumpEvent::Rejected(reason) => serde_json::json!({
            "t_ms": at_ms,
            "event": "rejected",
            "reason": reason.to_string(),
        }),
        PumpEvent::Advisory(adv) => serde_json::json!({
            "t_ms": at_ms,
            "event": "advisory",
            "detail": adv.to_string(),
        }),
        PumpEvent::Log(msg) => serde_json::json!({
            "t_ms": at_ms,
            "event": "log",
            "message": msg,
        }),
    }
}

fn summary(json: bool, status: &str, injected_ul: f64, elapsed_ms: u64) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "status": status,
                "injected_ul": injected_ul,
                "elapsed_ms": elapsed_ms,
            })
        );
    } else {
        println!("{status}: {injected_ul:.1} uL injected in {elapsed_ms} ms");
    }
}

/// Build a controller from the active config and drive a two-tick dose
/// to completion synchronously. Catches broken configs and wiring
/// before a real run is attempted.
pub fn self_check(cfg: &pump_config::Config, json: bool) -> Result<()> {
    let (mut ctl, rx) =
        InfusionControllerBuilder::from_config(cfg).build().map_err(eyre::Report::new)?;

    let dose_ul = cfg.tick.increment_ul * 2.0;
    ctl.start(dose_ul, 1000.0)
        .map_err(|r| eyre!("self-check start rejected: {r}"))?;
    for _ in 0..4 {
        match ctl.tick() {
            TickStatus::Running { .. } => continue,
            TickStatus::Finished => break,
            TickStatus::Idle => return Err(eyre!("controller went idle mid-check")),
        }
    }
    if !rx.try_iter().any(|ev| matches!(ev, PumpEvent::Finished)) {
        return Err(eyre!("self-check dose did not finish"));
    }

    if json {
        println!("{}", serde_json::json!({ "status": "ok" }));
    } else {
        println!("self-check ok");
    }
    Ok(())
}
