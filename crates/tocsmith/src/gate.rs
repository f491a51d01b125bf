//! The readiness poll loop.
//!
//! Each tick probes the container and evaluates it with
//! [`tocsmith_core::readiness::evaluate`]; between ticks the gate sleeps until
//! `min(now + poll_interval, deadline)`. The deadline forces a final
//! best-effort probe. A probe still running at the ceiling is abandoned once
//! `max(deadline, tick start + poll_interval)` passes, so the wait never runs
//! past the ceiling by more than one poll interval. Cancellation is observed
//! while probing as well as while sleeping.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tocsmith_core::config::ReadinessConfig;
use tocsmith_core::readiness::{evaluate, ContainerSnapshot, ReadinessState};
use tocsmith_core::Diagnostic;

use crate::probe::ContentProbe;

/// Cancels a pending [`ReadinessGate::wait`].
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    Ready {
        snapshot: ContainerSnapshot,
        ticks: u32,
        elapsed: Duration,
    },
    /// The ceiling passed; `snapshot` is the best-effort content and
    /// `last_state` the furthest state its final tick reached.
    TimedOut {
        snapshot: ContainerSnapshot,
        last_state: ReadinessState,
        elapsed: Duration,
    },
    Cancelled {
        last_state: ReadinessState,
    },
}

impl GateOutcome {
    /// Content to analyze, with the diagnostic a timeout produces.
    ///
    /// `None` when the wait was cancelled.
    pub fn into_content(self) -> Option<(ContainerSnapshot, Option<Diagnostic>)> {
        match self {
            GateOutcome::Ready { snapshot, .. } => Some((snapshot, None)),
            GateOutcome::TimedOut {
                snapshot,
                last_state,
                elapsed,
            } => {
                let diagnostic = Diagnostic::ReadinessTimeout {
                    last_state,
                    elapsed_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                };
                Some((snapshot, Some(diagnostic)))
            }
            GateOutcome::Cancelled { .. } => None,
        }
    }
}

pub struct ReadinessGate {
    config: ReadinessConfig,
    cancel: watch::Receiver<bool>,
    // Keeps the channel open when every handle has been dropped.
    _sender: Arc<watch::Sender<bool>>,
}

impl ReadinessGate {
    pub fn new(config: ReadinessConfig) -> (Self, CancelHandle) {
        let (sender, cancel) = watch::channel(false);
        let sender = Arc::new(sender);
        let gate = Self {
            config,
            cancel,
            _sender: sender.clone(),
        };
        (gate, CancelHandle(sender))
    }

    /// Poll `probe` until the container is ready, the ceiling passes, or the
    /// wait is cancelled.
    pub async fn wait<P: ContentProbe>(&mut self, probe: &mut P) -> GateOutcome {
        let start = Instant::now();
        let deadline = start + self.config.timeout();
        let poll_interval = self.config.poll_interval();

        let mut previous: Option<[u8; 16]> = None;
        let mut last_state = ReadinessState::Unchecked;
        // Last snapshot a probe actually returned.
        let mut content = ContainerSnapshot::default();
        let mut ticks = 0u32;

        loop {
            if *self.cancel.borrow() {
                log::info!("readiness wait cancelled at {last_state}");
                return GateOutcome::Cancelled { last_state };
            }

            ticks += 1;
            let probe_deadline = deadline.max(Instant::now() + poll_interval);
            let probed = tokio::select! {
                result = tokio::time::timeout_at(probe_deadline, probe.probe()) => result,
                _ = self.cancel.changed() => continue,
            };

            let observed = match probed {
                Ok(Ok(snapshot)) => Some(snapshot),
                Ok(Err(err)) => {
                    log::warn!("tick {ticks}: {err}");
                    None
                }
                Err(_) => {
                    log::warn!("tick {ticks}: probe did not answer in time");
                    None
                }
            };

            let empty = ContainerSnapshot::default();
            let evaluation = evaluate(
                observed.as_ref().unwrap_or(&empty),
                previous.as_ref(),
                &self.config,
            );
            previous = observed.as_ref().and_then(ContainerSnapshot::fingerprint);
            last_state = evaluation.state;
            if let Some(snapshot) = observed {
                content = snapshot;
            }

            if evaluation.is_ready() {
                let elapsed = start.elapsed();
                log::debug!("ready after {ticks} tick(s), {elapsed:?}");
                return GateOutcome::Ready {
                    snapshot: content,
                    ticks,
                    elapsed,
                };
            }

            if let Some(reason) = &evaluation.waiting_on {
                log::debug!("tick {ticks}: {last_state}, waiting on {reason}");
            }

            let now = Instant::now();
            if now >= deadline {
                let elapsed = now - start;
                log::warn!("readiness ceiling reached at {last_state} after {elapsed:?}");
                return GateOutcome::TimedOut {
                    snapshot: content,
                    last_state,
                    elapsed,
                };
            }

            let wake = (now + poll_interval).min(deadline);
            tokio::select! {
                _ = tokio::time::sleep_until(wake) => {}
                _ = self.cancel.changed() => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;
    use crate::error::Error;
    use tocsmith_core::readiness::ImageLoad;

    /// Replays a script of snapshots, repeating the last one.
    struct ScriptedProbe {
        script: VecDeque<Result<ContainerSnapshot, Error>>,
        last: ContainerSnapshot,
        calls: u32,
    }

    impl ScriptedProbe {
        fn new(script: Vec<Result<ContainerSnapshot, Error>>) -> Self {
            Self {
                script: script.into(),
                last: ContainerSnapshot::default(),
                calls: 0,
            }
        }

        fn steady(snapshot: ContainerSnapshot) -> Self {
            Self::new(vec![Ok(snapshot)])
        }
    }

    impl ContentProbe for ScriptedProbe {
        async fn probe(&mut self) -> Result<ContainerSnapshot, Error> {
            self.calls += 1;
            match self.script.pop_front() {
                Some(Ok(snapshot)) => {
                    self.last = snapshot.clone();
                    Ok(snapshot)
                }
                Some(Err(err)) => Err(err),
                None => Ok(self.last.clone()),
            }
        }
    }

    /// Answers every call after `delay`.
    struct SlowProbe {
        delay: Duration,
        snapshot: ContainerSnapshot,
        calls: u32,
    }

    impl ContentProbe for SlowProbe {
        async fn probe(&mut self) -> Result<ContainerSnapshot, Error> {
            self.calls += 1;
            tokio::time::sleep(self.delay).await;
            Ok(self.snapshot.clone())
        }
    }

    fn snapshot(html: &str) -> ContainerSnapshot {
        ContainerSnapshot {
            html: Some(html.to_string()),
            attached: true,
            visible: true,
            text: html.to_string(),
            images: vec![],
        }
    }

    fn config(timeout_ms: u64, poll_interval_ms: u64) -> ReadinessConfig {
        ReadinessConfig {
            timeout_ms,
            poll_interval_ms,
            ..ReadinessConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_two_stable_ticks() {
        let (mut gate, _handle) = ReadinessGate::new(config(5_000, 100));
        let mut probe = ScriptedProbe::steady(snapshot("1. Intro"));

        let outcome = gate.wait(&mut probe).await;

        match outcome {
            GateOutcome::Ready {
                ticks, elapsed, ..
            } => {
                assert_eq!(ticks, 2);
                assert_eq!(elapsed, Duration::from_millis(100));
            }
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_while_content_changes() {
        let (mut gate, _handle) = ReadinessGate::new(config(5_000, 100));
        let mut probe = ScriptedProbe::new(vec![
            Ok(snapshot("Loading")),
            Ok(snapshot("1. Intro")),
            Ok(snapshot("1. Intro 1.1 Background")),
            Ok(snapshot("1. Intro 1.1 Background")),
        ]);

        let outcome = gate.wait(&mut probe).await;

        assert!(matches!(outcome, GateOutcome::Ready { ticks: 4, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_loading_image_times_out_at_ceiling() {
        let (mut gate, _handle) = ReadinessGate::new(config(5_000, 100));
        let mut pending = snapshot("1. Intro");
        pending.images = vec![ImageLoad::Loaded, ImageLoad::Pending];
        let mut probe = ScriptedProbe::steady(pending.clone());

        let outcome = gate.wait(&mut probe).await;

        match outcome {
            GateOutcome::TimedOut {
                snapshot,
                last_state,
                elapsed,
            } => {
                assert_eq!(snapshot, pending);
                assert_eq!(last_state, ReadinessState::TextMeaningful);
                assert!(elapsed >= Duration::from_millis(5_000));
                assert!(elapsed <= Duration::from_millis(5_100));
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_ceiling_not_a_multiple_of_poll_interval() {
        let (mut gate, _handle) = ReadinessGate::new(config(250, 100));
        let mut probe = ScriptedProbe::steady(ContainerSnapshot::default());

        let outcome = gate.wait(&mut probe).await;

        match outcome {
            GateOutcome::TimedOut { elapsed, .. } => {
                assert_eq!(elapsed, Duration::from_millis(250));
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
        // Ticks at 0, 100, 200 and the final one at the ceiling.
        assert_eq!(probe.calls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_yields_diagnostic() {
        let (mut gate, _handle) = ReadinessGate::new(config(300, 100));
        let mut probe = ScriptedProbe::steady(ContainerSnapshot {
            visible: false,
            ..snapshot("hidden")
        });

        let (content, diagnostic) = gate.wait(&mut probe).await.into_content().unwrap();

        assert_eq!(content.html.as_deref(), Some("hidden"));
        assert_eq!(
            diagnostic,
            Some(Diagnostic::ReadinessTimeout {
                last_state: ReadinessState::DomAttached,
                elapsed_ms: 300,
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_pending_wait() {
        let (mut gate, handle) = ReadinessGate::new(config(5_000, 100));
        let mut probe = ScriptedProbe::steady(ContainerSnapshot::default());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(250)).await;
            handle.cancel();
        });

        let started = Instant::now();
        let outcome = gate.wait(&mut probe).await;

        assert_eq!(
            outcome,
            GateOutcome::Cancelled {
                last_state: ReadinessState::Unchecked
            }
        );
        assert!(started.elapsed() < Duration::from_millis(300));
        assert!(outcome.into_content().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_wait() {
        let (mut gate, handle) = ReadinessGate::new(config(5_000, 100));
        handle.cancel();
        let mut probe = ScriptedProbe::steady(snapshot("1. Intro"));

        let outcome = gate.wait(&mut probe).await;

        assert!(matches!(outcome, GateOutcome::Cancelled { .. }));
        assert_eq!(probe.calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_handle_does_not_cancel() {
        let (mut gate, handle) = ReadinessGate::new(config(5_000, 100));
        drop(handle);
        let mut probe = ScriptedProbe::steady(snapshot("1. Intro"));

        let outcome = gate.wait(&mut probe).await;

        assert!(matches!(outcome, GateOutcome::Ready { ticks: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_regression_and_probe_errors_are_retried() {
        let (mut gate, _handle) = ReadinessGate::new(config(5_000, 100));
        let mut detached = snapshot("1. Intro");
        detached.attached = false;
        let mut probe = ScriptedProbe::new(vec![
            Ok(snapshot("1. Intro")),
            Ok(detached),
            Err(Error::Probe("tab crashed".to_string())),
            Ok(snapshot("1. Intro")),
            Ok(snapshot("1. Intro")),
        ]);

        let outcome = gate.wait(&mut probe).await;

        assert!(matches!(outcome, GateOutcome::Ready { ticks: 5, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_cannot_push_past_ceiling() {
        let (mut gate, _handle) = ReadinessGate::new(config(5_000, 100));
        let mut pending = snapshot("1. Intro");
        pending.images = vec![ImageLoad::Pending];
        let mut probe = SlowProbe {
            delay: Duration::from_secs(2),
            snapshot: pending.clone(),
            calls: 0,
        };

        let outcome = gate.wait(&mut probe).await;

        match outcome {
            GateOutcome::TimedOut {
                snapshot, elapsed, ..
            } => {
                assert!(elapsed >= Duration::from_millis(5_000));
                assert!(elapsed <= Duration::from_millis(5_100));
                // Ticks start at 0, 2100 and 4200; the last one is cut off.
                assert_eq!(snapshot, pending);
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
        assert_eq!(probe.calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_that_never_answers_is_abandoned_at_ceiling() {
        let (mut gate, _handle) = ReadinessGate::new(config(300, 100));
        let mut probe = SlowProbe {
            delay: Duration::from_secs(3_600),
            snapshot: snapshot("1. Intro"),
            calls: 0,
        };

        let outcome = gate.wait(&mut probe).await;

        assert_eq!(
            outcome,
            GateOutcome::TimedOut {
                snapshot: ContainerSnapshot::default(),
                last_state: ReadinessState::Unchecked,
                elapsed: Duration::from_millis(300),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_running_probe() {
        let (mut gate, handle) = ReadinessGate::new(config(5_000, 100));
        let mut probe = SlowProbe {
            delay: Duration::from_secs(2),
            snapshot: snapshot("1. Intro"),
            calls: 0,
        };

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.cancel();
        });

        let started = Instant::now();
        let outcome = gate.wait(&mut probe).await;

        assert!(matches!(outcome, GateOutcome::Cancelled { .. }));
        assert!(started.elapsed() <= Duration::from_millis(150));
        assert_eq!(probe.calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_keeps_content_when_last_probe_fails() {
        let (mut gate, _handle) = ReadinessGate::new(config(200, 100));
        let mut pending = snapshot("1. Intro");
        pending.images = vec![ImageLoad::Pending];
        let mut probe = ScriptedProbe::new(vec![
            Ok(pending.clone()),
            Ok(pending.clone()),
            Err(Error::Probe("tab crashed".to_string())),
        ]);

        let outcome = gate.wait(&mut probe).await;

        match outcome {
            GateOutcome::TimedOut {
                snapshot,
                last_state,
                ..
            } => {
                assert_eq!(snapshot, pending);
                assert_eq!(last_state, ReadinessState::Unchecked);
            }
            other => panic!("expected TimedOut, got {other:?}"),
        }
        assert_eq!(probe.calls, 3);
    }
}
