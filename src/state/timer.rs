//! Per-session countdown driver.
//!
//! One task per play session ticks once per period for whichever [`TimerKey`] is armed.
//! Re-arming with a new key restarts the period; disarming parks the task. The task is
//! aborted when the [`RoundTimer`] is dropped, so a countdown never outlives its session.

use std::{future::Future, time::Duration};

use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};

use crate::state::round::TimerKey;

/// Tick period of the countdown.
pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Owner of the single countdown task of a play session.
pub struct RoundTimer {
    key: watch::Sender<Option<TimerKey>>,
    handle: JoinHandle<()>,
}

impl RoundTimer {
    /// Spawn the driver task. `on_tick` runs once per `period` with the armed key.
    ///
    /// The next tick is not scheduled before `on_tick` returns, so ticks never overlap.
    pub fn spawn<F, Fut>(period: Duration, on_tick: F) -> Self
    where
        F: Fn(TimerKey) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (sender, mut armed) = watch::channel(None::<TimerKey>);

        let handle = tokio::spawn(async move {
            loop {
                let current = *armed.borrow_and_update();
                let Some(key) = current else {
                    if armed.changed().await.is_err() {
                        return;
                    }
                    continue;
                };

                let mut ticker = interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        changed = armed.changed() => {
                            if changed.is_err() {
                                return;
                            }
                            break;
                        }
                        _ = ticker.tick() => on_tick(key).await,
                    }
                }
            }
        });

        Self {
            key: sender,
            handle,
        }
    }

    /// Run the countdown for `key`, replacing any other. Re-arming the same key is a no-op.
    pub fn arm(&self, key: TimerKey) {
        self.key.send_if_modified(|current| {
            if *current == Some(key) {
                false
            } else {
                *current = Some(key);
                true
            }
        });
    }

    /// Stop the countdown.
    pub fn disarm(&self) {
        self.key.send_if_modified(|current| current.take().is_some());
    }

    /// Key currently armed.
    pub fn armed(&self) -> Option<TimerKey> {
        *self.key.borrow()
    }

    /// Arm for `key` when present, disarm otherwise.
    pub fn sync(&self, key: Option<TimerKey>) {
        match key {
            Some(key) => self.arm(key),
            None => self.disarm(),
        }
    }
}

impl Drop for RoundTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
