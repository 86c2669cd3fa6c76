//! # Controller: the reboot-cycle state machine.
//!
//! The [`Controller`] owns the event bus, a [`SubscriberSet`], the
//! [`ProcessSupervisor`], and the runtime configuration. One logical
//! supervisory loop manages one process at a time; the loop is woken by
//! whichever comes first of an announcement timer, the reboot instant, a
//! child-exit notification, or operator cancellation.
//!
//! ## State machine
//! ```text
//!            ┌────────────────────────────────────────────────────┐
//!            ▼                                                    │
//!        Starting ──launch ok──► AwaitingAnnouncements            │
//!            │                        │        │                  │
//!     launch fails                    │        │ announcement due │
//!      (retry with                    │        └─► send command,  │
//!       backoff; fatal                │            stay           │
//!       on first launch)             target reached               │
//!                                     │                           │
//!                                     ▼                           │
//!                               ShuttingDown (`exit` sent)        │
//!                                     │                           │
//!                                     ▼                           │
//!                               WaitForExit (≤ exit_grace;        │
//!                                     │      force-terminate      │
//!                                     │      on overrun)          │
//!                                     ▼                           │
//!                               RestartDelay ─────────────────────┘
//!
//! Crash edge: while awaiting announcements (or with no schedule at all), an
//! exit the controller did not request jumps straight to RestartDelay →
//! Starting. The pending plan's target is reused if it is still in the
//! future; only the remaining announcements are kept.
//! ```
//!
//! ## Cancellation
//! Operator signals cancel the runtime token, which is checked at every
//! suspension point. The controller then attempts a bounded graceful shutdown
//! of the child (`stop_grace`, forced termination fallback) before returning,
//! so no orphan server survives the supervisor.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDateTime};
use tokio::sync::broadcast;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::shutdown;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::process::{ProcessStatus, ProcessSupervisor, SupervisedProcess, WaitOutcome};
use crate::schedule::{next_reboot, RebootPlan};
use crate::subscribers::{Subscribe, SubscriberSet};

/// How one supervised cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    /// The scheduled shutdown protocol ran to completion.
    Rebooted,
    /// The process exited without the controller requesting it.
    Crashed,
    /// The operator cancelled the runtime.
    Cancelled,
}

/// Coordinates the supervised process, schedule timers, and event delivery.
pub struct Controller {
    cfg: Config,
    bus: Bus,
    subs: Arc<SubscriberSet>,
    procs: ProcessSupervisor,
}

impl Controller {
    /// Creates a controller with the given config and subscribers.
    ///
    /// Must be called within a tokio runtime: subscriber workers are spawned
    /// eagerly.
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        let subs = Arc::new(SubscriberSet::new(subscribers));
        let procs = ProcessSupervisor::new(bus.clone());
        Self {
            cfg,
            bus,
            subs,
            procs,
        }
    }

    /// The event bus; subscribe here to observe the runtime directly.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Runs reboot cycles until an operator signal arrives or the first
    /// launch fails.
    ///
    /// On a signal the controller cancels the cycle, makes a bounded
    /// best-effort graceful shutdown of the child, and returns `Ok(())`.
    pub async fn run(&self) -> Result<(), RuntimeError> {
        self.subscriber_listener();
        let token = CancellationToken::new();

        let cycle = self.cycle_loop(token.clone());
        tokio::pin!(cycle);

        let res = tokio::select! {
            res = &mut cycle => res,
            _ = shutdown::wait_for_shutdown_signal() => {
                self.bus.publish(Event::now(EventKind::ShutdownRequested));
                token.cancel();
                let bound = self.cfg.stop_grace + self.cfg.kill_confirm + Duration::from_secs(1);
                match time::timeout(bound, &mut cycle).await {
                    Ok(res) => res,
                    Err(_elapsed) => Ok(()),
                }
            }
        };

        self.bus.publish(Event::now(EventKind::SupervisorStopped));
        // Let subscriber workers drain their queues before the process exits.
        time::sleep(Duration::from_millis(50)).await;
        res
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    fn subscriber_listener(&self) {
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subs);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit(&ev),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
    }

    /// The outer launch/supervise/restart loop.
    async fn cycle_loop(&self, token: CancellationToken) -> Result<(), RuntimeError> {
        let mut first_launch = true;
        let mut carried_plan: Option<RebootPlan> = None;

        loop {
            if token.is_cancelled() {
                return Ok(());
            }

            let Some(mut process) = self.launch_with_retry(&token, &mut first_launch).await? else {
                return Ok(());
            };

            let now = Local::now().naive_local();
            let plan = match carried_plan.take().filter(|p| p.target > now) {
                // A crash mid-window keeps the original target; only the
                // remaining announcements are replayed.
                Some(p) => Some(p.refreshed(now)),
                None => next_reboot(now, &self.cfg.schedule).map(|target| {
                    self.bus
                        .publish(Event::now(EventKind::RebootScheduled).with_when(target));
                    RebootPlan::build(now, target, &self.cfg.announcements)
                }),
            };

            let outcome = match &plan {
                Some(plan) => self.drive_cycle(&mut process, plan, &token).await,
                None => {
                    self.bus.publish(Event::now(EventKind::NoScheduleConfigured));
                    self.supervise_unscheduled(&mut process, &token).await
                }
            };

            match outcome {
                CycleOutcome::Rebooted => {}
                CycleOutcome::Crashed => carried_plan = plan,
                CycleOutcome::Cancelled => return Ok(()),
            }
        }
    }

    /// Launches the server, retrying with backoff after the initial success.
    ///
    /// Returns `Ok(None)` on cancellation. The very first launch failing is
    /// fatal: no process can ever be supervised.
    async fn launch_with_retry(
        &self,
        token: &CancellationToken,
        first_launch: &mut bool,
    ) -> Result<Option<SupervisedProcess>, RuntimeError> {
        let mut attempt: u32 = 0;

        loop {
            if token.is_cancelled() {
                return Ok(None);
            }
            match self
                .procs
                .launch(&self.cfg.server_path, &self.cfg.server_args)
                .await
            {
                Ok(process) => {
                    *first_launch = false;
                    return Ok(Some(process));
                }
                Err(source) => {
                    self.bus.publish(
                        Event::now(EventKind::LaunchFailed).with_message(source.to_string()),
                    );
                    if *first_launch {
                        return Err(RuntimeError::Launch { source });
                    }
                    let delay = self.cfg.launch_backoff.next(attempt);
                    attempt = attempt.saturating_add(1);
                    self.bus
                        .publish(Event::now(EventKind::LaunchRetryScheduled).with_delay(delay));
                    if !sleep_unless_cancelled(delay, token).await {
                        return Ok(None);
                    }
                }
            }
        }
    }

    /// Walks one plan: fires due announcements, executes the shutdown
    /// protocol at the target, and watches for unexpected exits throughout.
    async fn drive_cycle(
        &self,
        process: &mut SupervisedProcess,
        plan: &RebootPlan,
        token: &CancellationToken,
    ) -> CycleOutcome {
        let mut next_idx = 0;

        loop {
            let now = Local::now().naive_local();

            while next_idx < plan.announcements.len()
                && plan.announcements[next_idx].fire_at <= now
            {
                let announcement = &plan.announcements[next_idx];
                next_idx += 1;
                let command = format!("announcement \"{}\"", announcement.message);
                if self.procs.send_command(process, &command).await.is_ok() {
                    self.bus.publish(
                        Event::now(EventKind::AnnouncementSent)
                            .with_message(announcement.message.clone()),
                    );
                }
            }

            if now >= plan.target {
                self.graceful_stop(process, self.cfg.exit_grace).await;
                return self.restart_pause(token).await;
            }

            let next_at = plan
                .announcements
                .get(next_idx)
                .map(|a| a.fire_at.min(plan.target))
                .unwrap_or(plan.target);
            let pause = wall_clock_gap(now, next_at);

            tokio::select! {
                _ = token.cancelled() => {
                    self.graceful_stop(process, self.cfg.stop_grace).await;
                    return CycleOutcome::Cancelled;
                }
                _ = time::sleep(pause) => {}
                code = process.wait() => {
                    self.bus
                        .publish(Event::now(EventKind::UnexpectedExit).with_code(code));
                    return match self.restart_pause(token).await {
                        CycleOutcome::Cancelled => CycleOutcome::Cancelled,
                        _ => CycleOutcome::Crashed,
                    };
                }
            }
        }
    }

    /// Supervision without a schedule: restart-on-exit only.
    async fn supervise_unscheduled(
        &self,
        process: &mut SupervisedProcess,
        token: &CancellationToken,
    ) -> CycleOutcome {
        tokio::select! {
            _ = token.cancelled() => {
                self.graceful_stop(process, self.cfg.stop_grace).await;
                CycleOutcome::Cancelled
            }
            code = process.wait() => {
                self.bus
                    .publish(Event::now(EventKind::UnexpectedExit).with_code(code));
                match self.restart_pause(token).await {
                    CycleOutcome::Cancelled => CycleOutcome::Cancelled,
                    _ => CycleOutcome::Crashed,
                }
            }
        }
    }

    /// The bounded graceful-shutdown protocol: `exit` command, wait up to
    /// `grace`, force-terminate on overrun.
    async fn graceful_stop(&self, process: &mut SupervisedProcess, grace: Duration) {
        if let ProcessStatus::Exited(code) = self.procs.poll(process) {
            self.bus
                .publish(Event::now(EventKind::ProcessExited).with_code(code));
            return;
        }

        self.procs.request_graceful_exit(process).await;
        match self.procs.wait_for_exit(process, grace).await {
            WaitOutcome::Exited(code) => {
                self.bus
                    .publish(Event::now(EventKind::ProcessExited).with_code(code));
            }
            WaitOutcome::TimedOut => {
                self.bus
                    .publish(Event::now(EventKind::GraceExceeded).with_delay(grace));
                self.procs
                    .force_terminate(process, self.cfg.kill_confirm)
                    .await;
            }
        }
    }

    /// Sleeps out the configured restart delay (applied after scheduled
    /// reboots and crashes alike, to avoid restart storms).
    async fn restart_pause(&self, token: &CancellationToken) -> CycleOutcome {
        self.bus
            .publish(Event::now(EventKind::RestartScheduled).with_delay(self.cfg.restart_delay));
        if sleep_unless_cancelled(self.cfg.restart_delay, token).await {
            CycleOutcome::Rebooted
        } else {
            CycleOutcome::Cancelled
        }
    }
}

/// Gap between two local instants as a std `Duration` (zero if `until` passed).
fn wall_clock_gap(now: NaiveDateTime, until: NaiveDateTime) -> Duration {
    (until - now).to_std().unwrap_or(Duration::ZERO)
}

/// Sleeps for `d`, returning `false` if cancelled first.
async fn sleep_unless_cancelled(d: Duration, token: &CancellationToken) -> bool {
    if d.is_zero() {
        return !token.is_cancelled();
    }
    tokio::select! {
        _ = token.cancelled() => false,
        _ = time::sleep(d) => true,
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::policies::BackoffPolicy;
    use crate::schedule::Announcement;
    use chrono::Duration as TimeDelta;
    use std::path::PathBuf;

    /// Loops on stdin until it reads the literal `exit` command.
    const OBEDIENT: &str = r#"while read line; do [ "$line" = exit ] && exit 0; done"#;

    fn test_config(script: &str) -> Config {
        Config {
            server_path: PathBuf::from("/bin/sh"),
            server_args: vec!["-c".to_string(), script.to_string()],
            schedule: vec![],
            announcements: vec![],
            restart_delay: Duration::from_millis(20),
            exit_grace: Duration::from_secs(5),
            stop_grace: Duration::from_secs(1),
            kill_confirm: Duration::from_secs(5),
            bus_capacity: 256,
            launch_backoff: BackoffPolicy {
                first: Duration::from_millis(20),
                max: Duration::from_millis(20),
                factor: 1.0,
            },
        }
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    fn position(events: &[Event], kind: EventKind) -> Option<usize> {
        events.iter().position(|e| e.kind == kind)
    }

    #[tokio::test]
    async fn crash_relaunches_without_waiting_for_schedule() {
        let ctl = Arc::new(Controller::new(test_config("exit 3"), vec![]));
        let mut rx = ctl.bus().subscribe();
        let token = CancellationToken::new();

        let handle = {
            let ctl = Arc::clone(&ctl);
            let token = token.clone();
            tokio::spawn(async move { ctl.cycle_loop(token).await })
        };

        let mut starts = 0;
        let mut crashes = 0;
        let deadline = time::Instant::now() + Duration::from_secs(5);
        while starts < 2 || crashes < 1 {
            let ev = time::timeout_at(deadline, rx.recv())
                .await
                .expect("controller made no progress")
                .expect("bus closed");
            match ev.kind {
                EventKind::ProcessStarted => starts += 1,
                EventKind::UnexpectedExit => {
                    crashes += 1;
                    assert_eq!(ev.code, Some(3));
                }
                _ => {}
            }
        }

        token.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn scheduled_reboot_announces_then_exits_gracefully() {
        let ctl = Controller::new(test_config(OBEDIENT), vec![]);
        let mut rx = ctl.bus().subscribe();
        let token = CancellationToken::new();

        let mut process = ctl
            .procs
            .launch(&ctl.cfg.server_path, &ctl.cfg.server_args)
            .await
            .unwrap();

        let now = Local::now().naive_local();
        let plan = RebootPlan {
            target: now + TimeDelta::milliseconds(400),
            announcements: vec![Announcement {
                fire_at: now + TimeDelta::milliseconds(100),
                message: "reboot imminent".to_string(),
            }],
        };

        let outcome = ctl.drive_cycle(&mut process, &plan, &token).await;
        assert_eq!(outcome, CycleOutcome::Rebooted);

        let events = drain(&mut rx);
        let announced = position(&events, EventKind::AnnouncementSent).expect("announcement");
        let exit_req = position(&events, EventKind::ExitRequested).expect("exit request");
        let exited = position(&events, EventKind::ProcessExited).expect("clean exit");
        let restart = position(&events, EventKind::RestartScheduled).expect("restart delay");
        assert!(announced < exit_req);
        assert!(exit_req < exited);
        assert!(exited < restart);
        assert_eq!(events[exited].code, Some(0));
        assert!(position(&events, EventKind::ForcedTermination).is_none());
    }

    #[tokio::test]
    async fn stubborn_process_is_force_terminated_once() {
        let mut cfg = test_config("exec sleep 30");
        cfg.exit_grace = Duration::from_millis(150);
        let ctl = Controller::new(cfg, vec![]);
        let mut rx = ctl.bus().subscribe();
        let token = CancellationToken::new();

        let mut process = ctl
            .procs
            .launch(&ctl.cfg.server_path, &ctl.cfg.server_args)
            .await
            .unwrap();

        let now = Local::now().naive_local();
        let plan = RebootPlan {
            target: now + TimeDelta::milliseconds(100),
            announcements: vec![],
        };

        let outcome = ctl.drive_cycle(&mut process, &plan, &token).await;
        assert_eq!(outcome, CycleOutcome::Rebooted);

        let events = drain(&mut rx);
        assert!(position(&events, EventKind::GraceExceeded).is_some());
        let kills = events
            .iter()
            .filter(|e| e.kind == EventKind::ForcedTermination)
            .count();
        assert_eq!(kills, 1);
    }

    #[tokio::test]
    async fn crash_during_window_skips_the_shutdown_protocol() {
        let ctl = Controller::new(test_config("exit 7"), vec![]);
        let mut rx = ctl.bus().subscribe();
        let token = CancellationToken::new();

        let mut process = ctl
            .procs
            .launch(&ctl.cfg.server_path, &ctl.cfg.server_args)
            .await
            .unwrap();

        let now = Local::now().naive_local();
        let plan = RebootPlan {
            target: now + TimeDelta::hours(1),
            announcements: vec![],
        };

        let outcome = ctl.drive_cycle(&mut process, &plan, &token).await;
        assert_eq!(outcome, CycleOutcome::Crashed);

        let events = drain(&mut rx);
        let crash = position(&events, EventKind::UnexpectedExit).expect("crash observed");
        assert_eq!(events[crash].code, Some(7));
        assert!(position(&events, EventKind::ExitRequested).is_none());
        assert!(position(&events, EventKind::RestartScheduled).is_some());
    }

    #[tokio::test]
    async fn cancellation_stops_the_child_gracefully() {
        let ctl = Arc::new(Controller::new(test_config(OBEDIENT), vec![]));
        let mut rx = ctl.bus().subscribe();
        let token = CancellationToken::new();

        let handle = {
            let ctl = Arc::clone(&ctl);
            let token = token.clone();
            tokio::spawn(async move { ctl.cycle_loop(token).await })
        };

        // Wait for the child to come up, then stop the supervisor.
        let deadline = time::Instant::now() + Duration::from_secs(5);
        loop {
            let ev = time::timeout_at(deadline, rx.recv())
                .await
                .expect("no start observed")
                .expect("bus closed");
            if ev.kind == EventKind::ProcessStarted {
                break;
            }
        }
        token.cancel();
        handle.await.unwrap().unwrap();

        let events = drain(&mut rx);
        assert!(position(&events, EventKind::ExitRequested).is_some());
        assert!(position(&events, EventKind::ProcessExited).is_some());
        assert!(position(&events, EventKind::ForcedTermination).is_none());
    }
}
