//! Periodic fatigue evaluation.
//!
//! `start_monitoring` evaluates once immediately and then every
//! `evaluation_interval_ms`. Each tick reads the session through the supplied
//! accessor at call time, so hosts always evaluate current state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_stream::wrappers::BroadcastStream;

use super::engine::{FatigueAlert, FatigueAlertEngine};
use crate::session::SessionData;

const ALERT_CHANNEL_CAPACITY: usize = 16;

struct RunningLoop {
    shutdown_tx: broadcast::Sender<()>,
    stopped: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct FatigueMonitor {
    engine: Arc<Mutex<FatigueAlertEngine>>,
    alerts_tx: broadcast::Sender<FatigueAlert>,
    running: Option<RunningLoop>,
}

impl FatigueMonitor {
    pub fn new(engine: Arc<Mutex<FatigueAlertEngine>>) -> Self {
        let (alerts_tx, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        Self {
            engine,
            alerts_tx,
            running: None,
        }
    }

    pub fn engine(&self) -> &Arc<Mutex<FatigueAlertEngine>> {
        &self.engine
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Stream of fired alerts. Lagging subscribers skip missed alerts.
    pub fn subscribe(&self) -> BroadcastStream<FatigueAlert> {
        BroadcastStream::new(self.alerts_tx.subscribe())
    }

    /// Must be called from within a tokio runtime. Restarting replaces the
    /// previous loop.
    pub async fn start_monitoring<F, A>(&mut self, get_active_session: F, on_alert: A)
    where
        F: Fn() -> Option<SessionData> + Send + Sync + 'static,
        A: Fn(&FatigueAlert) + Send + Sync + 'static,
    {
        self.stop_monitoring();

        let period_ms = self.engine.lock().await.config().evaluation_interval_ms;
        let period = Duration::from_millis(period_ms.max(1) as u64);

        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let stopped = Arc::new(AtomicBool::new(false));

        let engine = self.engine.clone();
        let alerts_tx = self.alerts_tx.clone();
        let loop_stopped = stopped.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => {
                        // 计时器可能在 stop 之前已经触发
                        if loop_stopped.load(Ordering::SeqCst) {
                            break;
                        }

                        let session = get_active_session();
                        let decision = {
                            let mut engine = engine.lock().await;
                            // 等锁期间可能已被停止，评估前再检查一次
                            if loop_stopped.load(Ordering::SeqCst) {
                                break;
                            }
                            engine.evaluate(session.as_ref())
                        };

                        if let Some(alert) = decision.alert() {
                            if loop_stopped.load(Ordering::SeqCst) {
                                break;
                            }
                            on_alert(alert);
                            let _ = alerts_tx.send(*alert);
                        }
                    }
                }
            }
            tracing::debug!("Fatigue monitor loop exited");
        });

        tracing::info!(interval_ms = period_ms, "Fatigue monitoring started");
        self.running = Some(RunningLoop {
            shutdown_tx,
            stopped,
            handle,
        });
    }

    /// Idempotent. No evaluation starts after this returns.
    pub fn stop_monitoring(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        running.stopped.store(true, Ordering::SeqCst);
        let _ = running.shutdown_tx.send(());
        running.handle.abort();
        tracing::info!("Fatigue monitoring stopped");
    }
}

impl Drop for FatigueMonitor {
    fn drop(&mut self) {
        self.stop_monitoring();
    }
}
