//! Actor-style execution of the controller on a dedicated thread.
//!
//! One worker thread owns the `InfusionController`; operator commands
//! and tick deadlines are multiplexed on a single channel wait
//! (`recv_deadline` against the next tick's deadline), so every
//! read-modify-write on session and reservoir state is serialized and
//! the sleep between ticks stays interruptible by Pause/Stop with
//! bounded latency.
//!
//! Safety: each `Pump` spawns exactly one thread that is shut down and
//! joined when the `Pump` is dropped, preventing thread leaks.

use crossbeam_channel as xch;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::builder::InfusionControllerBuilder;
use crate::controller::{InfusionController, TickStatus};
use crate::error::BuildError;
use crate::event::PumpEvent;
use crate::session::RunState;

/// Commands accepted by the pump worker. `Start` doubles as resume
/// when the session is paused, mirroring the controller contract.
#[derive(Debug, Clone)]
pub enum PumpCommand {
    Start { volume_ul: f64, speed_ul_s: f64 },
    Pause,
    Stop,
    SetSpeed(f64),
    /// Worker shutdown; sent by `Drop`.
    Shutdown,
}

/// Poll interval while no run is active; bounds shutdown latency.
const IDLE_POLL: Duration = Duration::from_millis(50);

pub struct Pump {
    tx: xch::Sender<PumpCommand>,
    events: xch::Receiver<PumpEvent>,
    /// Shutdown flag for immediate response (atomic for lock-free check)
    shutdown: Arc<AtomicBool>,
    /// Join handle for graceful thread cleanup
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl Pump {
    /// Build the controller from `builder` and spawn the worker thread
    /// that owns it.
    pub fn spawn(builder: InfusionControllerBuilder) -> Result<Self, BuildError> {
        let (controller, events) = builder.build()?;
        let (tx, rx) = xch::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_worker = shutdown.clone();

        let join_handle =
            std::thread::spawn(move || worker_loop(controller, &rx, &shutdown_worker));

        Ok(Self {
            tx,
            events,
            shutdown,
            join_handle: Some(join_handle),
        })
    }

    /// Queue a Start (or resume, if paused). Acceptance or rejection is
    /// reported on the event channel.
    pub fn start(&self, volume_ul: f64, speed_ul_s: f64) {
        self.send(PumpCommand::Start {
            volume_ul,
            speed_ul_s,
        });
    }

    pub fn pause(&self) {
        self.send(PumpCommand::Pause);
    }

    pub fn stop(&self) {
        self.send(PumpCommand::Stop);
    }

    pub fn set_speed(&self, speed_ul_s: f64) {
        self.send(PumpCommand::SetSpeed(speed_ul_s));
    }

    /// Observer channel; events arrive in generation order.
    pub fn events(&self) -> xch::Receiver<PumpEvent> {
        self.events.clone()
    }

    fn send(&self, cmd: PumpCommand) {
        if self.tx.send(cmd).is_err() {
            tracing::warn!("pump worker gone; command dropped");
        }
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Wake the worker even mid-delay; a slow infusion may otherwise
        // keep it in recv_timeout for the full inter-tick delay.
        let _ = self.tx.send(PumpCommand::Shutdown);
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(()) => tracing::trace!("pump worker joined"),
                Err(e) => tracing::warn!(?e, "pump worker panicked during shutdown"),
            }
        }
    }
}

fn worker_loop(
    mut ctl: InfusionController,
    rx: &xch::Receiver<PumpCommand>,
    shutdown: &AtomicBool,
) {
    // Absolute deadline of the next tick while a run is active; None
    // parks on the idle poll. An absolute Instant keeps the cadence
    // stable under command traffic: a command landing mid-wait resumes
    // the same deadline instead of restarting the interval.
    let mut next_tick: Option<Instant> = None;
    loop {
        if shutdown.load(Ordering::Relaxed) {
            break;
        }
        let deadline = next_tick.unwrap_or_else(|| Instant::now() + IDLE_POLL);
        match rx.recv_deadline(deadline) {
            Ok(PumpCommand::Shutdown) => break,
            Ok(cmd) => next_tick = apply(&mut ctl, cmd, next_tick),
            Err(xch::RecvTimeoutError::Timeout) => {
                next_tick = match ctl.tick() {
                    TickStatus::Running { next_delay } => Some(Instant::now() + next_delay),
                    TickStatus::Finished | TickStatus::Idle => None,
                };
            }
            Err(xch::RecvTimeoutError::Disconnected) => break,
        }
    }
    tracing::trace!("pump worker exiting");
}

/// Apply one command and decide the next tick deadline. A run entered
/// by this command ticks immediately; a run that was already ticking
/// keeps its in-flight deadline untouched (SetSpeed reshapes the delay
/// from the next tick on, never the one in progress).
fn apply(
    ctl: &mut InfusionController,
    cmd: PumpCommand,
    current: Option<Instant>,
) -> Option<Instant> {
    let was_running = ctl.state() == RunState::Running;
    match cmd {
        PumpCommand::Start {
            volume_ul,
            speed_ul_s,
        } => {
            let _ = ctl.start(volume_ul, speed_ul_s);
        }
        PumpCommand::Pause => {
            let _ = ctl.pause();
        }
        PumpCommand::Stop => {
            let _ = ctl.stop();
        }
        PumpCommand::SetSpeed(v) => {
            let _ = ctl.set_speed(v);
        }
        PumpCommand::Shutdown => unreachable!("handled by the worker loop"),
    }
    match ctl.state() {
        RunState::Running if !was_running => Some(Instant::now()),
        RunState::Running => current.or_else(|| Some(Instant::now())),
        _ => None,
    }
}
