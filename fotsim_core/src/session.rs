//! Session orchestration: state holder, timed completions, subscriber fan-out.
//!
//! The reducer is pure; this module supplies everything around it that touches
//! time or randomness. Timed instrument phases (boot, port cleaning, the
//! measurement countdown) are held in an arena of pending tasks, each stamped
//! with the generation of the screen or port state that scheduled it. Any
//! transition that changes that state bumps the generation, so completions for
//! phases the user already left are dropped instead of firing into the wrong
//! screen.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rand::Rng;
use tracing::{debug, warn};

use crate::catalog::PassiveComponent;
use crate::measure;
use crate::reducer::{initial_state, reduce};
use crate::state::{Action, Button, DeviceState, MeasurementKind, PortStatus, Screen};
use fotsim_config::{MeasurementCfg, TimingCfg};
use fotsim_traits::{Clock, Stopwatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskKind {
    FinishLoading,
    FinishCleaning,
    CompleteReference,
    CompleteFiber,
}

#[derive(Debug)]
struct PendingTask {
    due: Instant,
    generation: u64,
    kind: TaskKind,
}

/// One running simulator instance.
///
/// All mutation goes through [`dispatch`](Self::dispatch); [`poll`](Self::poll)
/// fires whatever timed completions have come due on the injected clock.
/// Subscribers receive a full state snapshot after every transition.
pub struct Session<R: Rng, C: Clock> {
    state: DeviceState,
    selected_component: Option<PassiveComponent>,
    measurement: MeasurementCfg,
    timing: TimingCfg,
    clock: C,
    timeline: Stopwatch,
    rng: R,
    pending: Vec<PendingTask>,
    /// Bumped on every screen change; guards loading and measuring tasks.
    screen_generation: u64,
    /// Bumped on every port-status change; guards the cleaning task. Kept
    /// separate so navigating away mid-clean does not cancel the cleaning.
    port_generation: u64,
    subscribers: Vec<Sender<DeviceState>>,
}

impl<R: Rng, C: Clock> Session<R, C> {
    pub fn new(measurement: MeasurementCfg, timing: TimingCfg, clock: C, rng: R) -> Self {
        let timeline = Stopwatch::start(&clock);
        Self {
            state: initial_state(),
            selected_component: None,
            measurement,
            timing,
            clock,
            timeline,
            rng,
            pending: Vec::new(),
            screen_generation: 0,
            port_generation: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn selected_component(&self) -> Option<&PassiveComponent> {
        self.selected_component.as_ref()
    }

    /// Choose which bench component the next fiber measurement targets.
    pub fn select_component(&mut self, component: PassiveComponent) {
        self.selected_component = Some(component);
    }

    /// Register a snapshot receiver. Disconnected receivers are pruned on the
    /// next publish.
    pub fn subscribe(&mut self) -> Receiver<DeviceState> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Number of scheduled completions not yet fired (stale ones included).
    pub fn pending_tasks(&self) -> usize {
        self.pending.len()
    }

    /// Convenience wrapper for panel input.
    pub fn press(&mut self, button: Button) {
        self.dispatch(Action::from(button));
    }

    /// Run one action through the reducer, reschedule timed phases for
    /// whatever the transition started, and publish the new snapshot.
    pub fn dispatch(&mut self, action: Action) {
        let next = reduce(&self.state, &action);

        let screen_changed = next.screen != self.state.screen;
        let port_changed = next.preparation.port_status != self.state.preparation.port_status;
        if screen_changed {
            self.screen_generation += 1;
        }
        if port_changed {
            self.port_generation += 1;
        }

        if screen_changed {
            match next.screen {
                Screen::Loading => self.schedule(
                    TaskKind::FinishLoading,
                    self.timing.loading_ms,
                    self.screen_generation,
                ),
                Screen::FastestMeasuring => {
                    // The reducer only enters this screen with a kind set.
                    if let Some(kind) = next.current_measurement {
                        let kind = match kind {
                            MeasurementKind::Reference => TaskKind::CompleteReference,
                            MeasurementKind::Fiber => TaskKind::CompleteFiber,
                        };
                        self.schedule(kind, self.timing.measuring_ms, self.screen_generation);
                    }
                }
                _ => {}
            }
        }
        if port_changed && next.preparation.port_status == PortStatus::Cleaning {
            self.schedule(
                TaskKind::FinishCleaning,
                self.timing.cleaning_ms,
                self.port_generation,
            );
        }

        self.state = next;
        self.publish();
    }

    /// Fire every task whose deadline has passed, oldest first. Tasks whose
    /// generation no longer matches are dropped silently (modulo a debug log).
    pub fn poll(&mut self) {
        loop {
            let now = self.clock.now();
            let next_due = self
                .pending
                .iter()
                .enumerate()
                .filter(|(_, t)| t.due <= now)
                .min_by_key(|(_, t)| t.due)
                .map(|(i, _)| i);
            let Some(index) = next_due else {
                return;
            };
            let task = self.pending.swap_remove(index);

            let live = match task.kind {
                TaskKind::FinishCleaning => task.generation == self.port_generation,
                _ => task.generation == self.screen_generation,
            };
            if !live {
                debug!(kind = ?task.kind, "dropping stale completion");
                continue;
            }
            self.fire(task.kind);
        }
    }

    fn schedule(&mut self, kind: TaskKind, delay_ms: u64, generation: u64) {
        self.pending.push(PendingTask {
            due: self.clock.now() + Duration::from_millis(delay_ms),
            generation,
            kind,
        });
    }

    fn fire(&mut self, kind: TaskKind) {
        match kind {
            TaskKind::FinishLoading => self.dispatch(Action::CompleteLoading),
            TaskKind::FinishCleaning => self.dispatch(Action::CompletePortCleaning),
            TaskKind::CompleteReference => {
                let timestamp = self.timeline.elapsed_ms(&self.clock);
                let results = measure::reference_measurement(
                    &self.measurement,
                    &self.state.preparation.fastest.loss_wavelengths,
                    self.state.preparation.port_status,
                    &self.state.preparation.reference_results,
                    timestamp,
                    &mut self.rng,
                );
                self.dispatch(Action::CompleteReferenceMeasurement(results));
            }
            TaskKind::CompleteFiber => {
                let Some(component) = self.selected_component.clone() else {
                    warn!("measurement finished with no component selected");
                    self.dispatch(Action::PressBack);
                    return;
                };
                let timestamp = self.timeline.elapsed_ms(&self.clock);
                let previous = self.state.fiber_history.get(&component.id).cloned();
                let result = measure::fiber_measurement(
                    &self.measurement,
                    &component,
                    &self.state.preparation.fastest.loss_wavelengths,
                    self.state.fiber_counter + 1,
                    previous.as_ref(),
                    timestamp,
                    &mut self.rng,
                );
                match result {
                    Ok(result) => self.dispatch(Action::CompleteFiberMeasurement(result)),
                    Err(err) => {
                        warn!(component = %component.id, error = %err, "measurement failed");
                        self.dispatch(Action::PressBack);
                    }
                }
            }
        }
    }

    fn publish(&mut self) {
        let state = &self.state;
        self.subscribers.retain(|tx| tx.send(state.clone()).is_ok());
    }
}
