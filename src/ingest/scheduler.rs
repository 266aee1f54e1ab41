use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};

use super::cycle::CycleError;
use crate::shutdown::Shutdown;

/// Source of scheduling signals.
pub trait Trigger {
    /// Wait for the next signal. `false` means no more signals will come.
    fn tick(&mut self) -> impl Future<Output = bool> + Send;
}

/// Fires immediately, then once per period.
///
/// A tick that comes due while a cycle is still running fires as soon as
/// the cycle ends, and the schedule restarts from there
/// ([`MissedTickBehavior::Delay`]), so a slow fetch never causes a burst.
pub struct IntervalTrigger {
    interval: Interval,
}

impl IntervalTrigger {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

impl Trigger for IntervalTrigger {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Fires once per message on a channel; stops when every sender is gone.
pub struct ManualTrigger {
    rx: mpsc::Receiver<()>,
}

impl ManualTrigger {
    pub fn channel() -> (mpsc::Sender<()>, Self) {
        let (tx, rx) = mpsc::channel(16);
        (tx, Self { rx })
    }
}

impl Trigger for ManualTrigger {
    async fn tick(&mut self) -> bool {
        self.rx.recv().await.is_some()
    }
}

/// Totals for one [`Scheduler::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub failures: u64,
}

/// Drives one ingestion cycle per trigger signal until shutdown.
///
/// Cycles never overlap: the next signal is not awaited until the current
/// cycle has finished. A failing cycle is logged and the loop carries on.
pub struct Scheduler<T> {
    trigger: T,
    shutdown: Shutdown,
}

impl<T: Trigger> Scheduler<T> {
    pub fn new(trigger: T, shutdown: Shutdown) -> Self {
        Self { trigger, shutdown }
    }

    /// Run until shutdown is triggered or the trigger runs dry.
    ///
    /// `cycle` gets a shutdown handle to race its network work against. A
    /// cycle that ends in [`CycleError::is_cancelled`] stops the loop
    /// without counting as a failure.
    pub async fn run<F, Fut>(&mut self, cycle: F) -> RunSummary
    where
        F: FnMut(Shutdown) -> Fut,
        Fut: Future<Output = Result<(), CycleError>>,
    {
        self.run_reporting(cycle, |()| {}).await
    }

    /// Like [`Scheduler::run`], handing each successful cycle's value to
    /// `on_success` before the next tick is awaited.
    pub async fn run_reporting<F, Fut, R, H>(
        &mut self,
        mut cycle: F,
        mut on_success: H,
    ) -> RunSummary
    where
        F: FnMut(Shutdown) -> Fut,
        Fut: Future<Output = Result<R, CycleError>>,
        H: FnMut(R),
    {
        let mut summary = RunSummary::default();

        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            let fired = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => false,
                fired = self.trigger.tick() => fired,
            };
            if !fired {
                break;
            }

            summary.cycles += 1;
            match cycle(self.shutdown.clone()).await {
                Ok(value) => on_success(value),
                Err(e) if e.is_cancelled() => {
                    tracing::debug!(feed = ?e.url(), "Cycle cancelled by shutdown");
                    break;
                }
                Err(e) => {
                    summary.failures += 1;
                    let feed = e.url().unwrap_or("-");
                    tracing::warn!(feed = %feed, error = %e, "Ingestion cycle failed");
                    eprintln!("error fetching {}: {}", feed, e);
                }
            }
        }

        tracing::info!(cycles = summary.cycles, failures = summary.failures, "Scheduler stopped");
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::FetchError;
    use crate::shutdown;
    use std::sync::{Arc, Mutex};
    use tokio::time::Instant;

    #[tokio::test]
    async fn test_manual_trigger_runs_one_cycle_per_signal() {
        let (tx, trigger) = ManualTrigger::channel();
        let (_stop, shutdown) = shutdown::channel();
        let mut scheduler = Scheduler::new(trigger, shutdown);

        for _ in 0..3 {
            tx.send(()).await.unwrap();
        }
        drop(tx);

        let mut calls = 0;
        let summary = scheduler
            .run(|_| {
                calls += 1;
                async { Ok(()) }
            })
            .await;

        assert_eq!(calls, 3);
        assert_eq!(summary, RunSummary { cycles: 3, failures: 0 });
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_loop() {
        let (tx, trigger) = ManualTrigger::channel();
        let (_stop, shutdown) = shutdown::channel();
        let mut scheduler = Scheduler::new(trigger, shutdown);

        for _ in 0..3 {
            tx.send(()).await.unwrap();
        }
        drop(tx);

        let mut n = 0;
        let summary = scheduler
            .run(|_| {
                n += 1;
                let fail = n % 2 == 1;
                async move {
                    if fail {
                        Err(CycleError::Fetch(FetchError::HttpStatus {
                            url: "https://example.com/rss".to_string(),
                            status: 500,
                        }))
                    } else {
                        Ok(())
                    }
                }
            })
            .await;

        assert_eq!(summary, RunSummary { cycles: 3, failures: 2 });
    }

    #[tokio::test]
    async fn test_triggered_shutdown_runs_nothing() {
        let (tx, trigger) = ManualTrigger::channel();
        let (stop, shutdown) = shutdown::channel();
        tx.send(()).await.unwrap();
        stop.trigger();

        let summary = Scheduler::new(trigger, shutdown)
            .run(|_| async { Ok(()) })
            .await;
        assert_eq!(summary.cycles, 0);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_in_flight_cycle() {
        let (tx, trigger) = ManualTrigger::channel();
        let (stop, shutdown) = shutdown::channel();
        tx.send(()).await.unwrap();
        tx.send(()).await.unwrap();

        let stop = Arc::new(stop);
        let summary = Scheduler::new(trigger, shutdown)
            .run(|shutdown| {
                let stop = Arc::clone(&stop);
                async move {
                    stop.trigger();
                    shutdown.cancelled().await;
                    Err(CycleError::Fetch(FetchError::Cancelled {
                        url: "https://example.com/rss".to_string(),
                    }))
                }
            })
            .await;

        assert_eq!(summary, RunSummary { cycles: 1, failures: 0 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_fires_immediately_then_each_period() {
        let (stop, shutdown) = shutdown::channel();
        let start = Instant::now();
        let ticks = Arc::new(Mutex::new(Vec::new()));

        let summary = Scheduler::new(IntervalTrigger::new(Duration::from_secs(60)), shutdown)
            .run(|_| {
                let mut seen = ticks.lock().unwrap();
                seen.push(start.elapsed());
                if seen.len() == 3 {
                    stop.trigger();
                }
                async { Ok(()) }
            })
            .await;

        assert_eq!(summary.cycles, 3);
        assert_eq!(
            *ticks.lock().unwrap(),
            vec![
                Duration::ZERO,
                Duration::from_secs(60),
                Duration::from_secs(120)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_cycle_delays_instead_of_bursting() {
        let (stop, shutdown) = shutdown::channel();
        let start = Instant::now();
        let ticks = Arc::new(Mutex::new(Vec::new()));

        Scheduler::new(IntervalTrigger::new(Duration::from_secs(60)), shutdown)
            .run(|_| {
                let count = {
                    let mut seen = ticks.lock().unwrap();
                    seen.push(start.elapsed());
                    seen.len()
                };
                if count == 3 {
                    stop.trigger();
                }
                async move {
                    // First cycle overruns the period by 30s
                    if count == 1 {
                        tokio::time::sleep(Duration::from_secs(90)).await;
                    }
                    Ok(())
                }
            })
            .await;

        assert_eq!(
            *ticks.lock().unwrap(),
            vec![
                Duration::ZERO,
                Duration::from_secs(90),
                Duration::from_secs(150)
            ]
        );
    }

    #[tokio::test]
    async fn test_successful_values_reach_the_handler_in_order() {
        let (tx, trigger) = ManualTrigger::channel();
        let (_stop, shutdown) = shutdown::channel();
        for _ in 0..3 {
            tx.send(()).await.unwrap();
        }
        drop(tx);

        let mut n = 0;
        let mut seen = Vec::new();
        let summary = Scheduler::new(trigger, shutdown)
            .run_reporting(
                |_| {
                    n += 1;
                    let cycle = n;
                    async move {
                        if cycle == 2 {
                            Err(CycleError::Fetch(FetchError::HttpStatus {
                                url: "https://example.com/rss".to_string(),
                                status: 502,
                            }))
                        } else {
                            Ok(cycle)
                        }
                    }
                },
                |cycle| seen.push(cycle),
            )
            .await;

        assert_eq!(seen, vec![1, 3]);
        assert_eq!(summary, RunSummary { cycles: 3, failures: 1 });
    }
}
