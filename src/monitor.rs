use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::client::Backend;
use crate::dashboard::Dashboard;
use crate::snapshot::Snapshot;

/// Lifecycle of the polling loop. `Stopped` and `Idle` are behaviorally
/// identical; the variant only records which path the session took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Stopped,
}

/// Everything the watch screen draws, updated once per tick by the
/// polling task and read by the UI loop.
#[derive(Debug, Clone)]
pub struct ViewState {
    pub phase: Phase,
    pub sim_time: u64,
    pub live_nodes: usize,
    pub dashboard: Dashboard,
    pub snapshot: Option<Snapshot>,
    pub status: String,
}

pub type SharedView = Arc<Mutex<ViewState>>;

impl ViewState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            sim_time: 0,
            live_nodes: 0,
            dashboard: Dashboard::default(),
            snapshot: None,
            status: "press 's' to start".to_string(),
        }
    }

    pub fn shared() -> SharedView {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Entry action for Idle → Running: a fresh session must not show
    /// stale counters or failure rows from the previous run.
    pub fn begin_session(&mut self) {
        self.phase = Phase::Running;
        self.sim_time = 0;
        self.live_nodes = 0;
        self.dashboard = Dashboard::default();
        self.snapshot = None;
        self.status = "running".to_string();
    }

    /// Applies one snapshot: counters, dashboard, and the frame the
    /// renderer will paint. A snapshot without `dead_stats` keeps the
    /// previous dashboard.
    pub fn apply(&mut self, snap: Snapshot) {
        self.sim_time = snap.sim_time;
        self.live_nodes = snap.live_count();
        if let Some(stats) = &snap.dead_stats {
            self.dashboard = Dashboard::from_stats(stats);
        }
        self.snapshot = Some(snap);
    }
}

/// A live polling session: the spawned task plus the cancel handle for
/// its pending tick. Dropping the handle without `stop` also cancels.
pub struct Session {
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Session {
    /// Cancels the pending tick, if any. Safe to call on a session that
    /// already terminated on its own; the signal just goes nowhere.
    pub fn stop(self) {
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// The polling loop: one `/step` per tick, strictly sequential. The next
/// tick is not armed until the current response is fully applied, so at
/// most one snapshot request is ever in flight.
pub struct Monitor {
    client: Backend,
    view: SharedView,
    tick: Duration,
}

impl Monitor {
    pub fn spawn(client: Backend, view: SharedView, tick: Duration) -> Session {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let monitor = Monitor { client, view, tick };
        let task = tokio::spawn(monitor.run(cancel_rx));
        Session {
            cancel: cancel_tx,
            task,
        }
    }

    async fn run(self, mut cancel: watch::Receiver<bool>) {
        loop {
            let snap = match self.client.step().await {
                Ok(snap) => snap,
                Err(err) => {
                    // No retry: a failed tick ends the session.
                    warn!("snapshot fetch failed: {err}");
                    let mut view = self.view.lock().await;
                    view.phase = Phase::Stopped;
                    view.status = format!("tick failed: {err}");
                    return;
                }
            };

            // A stop cannot cancel a fetch already in flight; discard the
            // stale response instead of applying it.
            if *cancel.borrow() {
                self.view.lock().await.phase = Phase::Stopped;
                return;
            }

            {
                let mut view = self.view.lock().await;
                view.apply(snap);
                if view.live_nodes == 0 {
                    view.phase = Phase::Stopped;
                    view.status = "all nodes exhausted".to_string();
                    return;
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.tick) => {}
                _ = cancel.changed() => {
                    let mut view = self.view.lock().await;
                    view.phase = Phase::Stopped;
                    view.status = "stopped".to_string();
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{FailureStat, Node};

    fn snap(sim_time: u64, live: usize, dead_stats: Option<Vec<FailureStat>>) -> Snapshot {
        let nodes = (0..live as u32)
            .map(|id| Node {
                id,
                x: 0.0,
                y: 0.0,
                color: "#00ff00".to_string(),
                is_head: false,
                dead: false,
            })
            .collect();
        Snapshot {
            sim_time,
            nodes,
            links: vec![],
            gateway: [500.0, 500.0],
            dead_stats,
        }
    }

    #[test]
    fn test_begin_session_resets_stale_state() {
        let mut view = ViewState::new();
        view.apply(snap(
            9,
            3,
            Some(vec![FailureStat {
                id: 1,
                dead_since: 4,
                downtime: 5,
            }]),
        ));
        assert_eq!(view.dashboard.dead_count, 1);

        view.begin_session();
        assert_eq!(view.phase, Phase::Running);
        assert_eq!(view.sim_time, 0);
        assert_eq!(view.dashboard, Dashboard::default());
        assert!(view.snapshot.is_none());
    }

    #[test]
    fn test_missing_dead_stats_keeps_dashboard() {
        let mut view = ViewState::new();
        view.apply(snap(
            1,
            2,
            Some(vec![FailureStat {
                id: 7,
                dead_since: 1,
                downtime: 2,
            }]),
        ));
        let before = view.dashboard.clone();

        view.apply(snap(2, 2, None));
        assert_eq!(view.dashboard, before);
        assert_eq!(view.sim_time, 2);

        // An explicitly empty list does clear it.
        view.apply(snap(3, 2, Some(vec![])));
        assert_eq!(view.dashboard.dead_count, 0);
    }

    mod with_backend {
        use super::super::*;
        use crate::testutil;
        use axum::routing::get;
        use axum::{http::StatusCode, Json, Router};
        use serde_json::json;
        use std::sync::atomic::{AtomicUsize, Ordering};

        fn step_router(steps: Arc<AtomicUsize>, live: bool) -> Router {
            Router::new().route(
                "/step",
                get(move || {
                    let steps = steps.clone();
                    async move {
                        let tick = steps.fetch_add(1, Ordering::SeqCst) as u64 + 1;
                        Json(json!({
                            "sim_time": tick,
                            "gateway": [500.0, 500.0],
                            "nodes": [{
                                "id": 0, "x": 10.0, "y": 20.0, "color": "#00ff00",
                                "is_head": false, "dead": !live
                            }],
                            "dead_stats": []
                        }))
                    }
                }),
            )
        }

        async fn wait_for_steps(steps: &AtomicUsize, at_least: usize) {
            for _ in 0..200 {
                if steps.load(Ordering::SeqCst) >= at_least {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("backend never reached {at_least} step requests");
        }

        #[tokio::test]
        async fn test_exhaustion_stops_polling() {
            let steps = Arc::new(AtomicUsize::new(0));
            let base = testutil::serve(step_router(steps.clone(), false)).await;

            let view = ViewState::shared();
            let session = Monitor::spawn(
                Backend::new(&base),
                view.clone(),
                Duration::from_millis(5),
            );
            session.join().await;

            // Exactly one request, and none after the terminal snapshot.
            assert_eq!(steps.load(Ordering::SeqCst), 1);
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(steps.load(Ordering::SeqCst), 1);

            let view = view.lock().await;
            assert_eq!(view.phase, Phase::Stopped);
            assert_eq!(view.sim_time, 1);
            assert_eq!(view.live_nodes, 0);
        }

        #[tokio::test]
        async fn test_stop_cancels_pending_tick() {
            let steps = Arc::new(AtomicUsize::new(0));
            let base = testutil::serve(step_router(steps.clone(), true)).await;

            let view = ViewState::shared();
            // A tick far longer than the test: the stop must land inside
            // the armed delay, not between organic ticks.
            let session = Monitor::spawn(
                Backend::new(&base),
                view.clone(),
                Duration::from_secs(60),
            );
            wait_for_steps(&steps, 1).await;
            session.stop();

            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(steps.load(Ordering::SeqCst), 1);
            assert_eq!(view.lock().await.phase, Phase::Stopped);
        }

        #[tokio::test]
        async fn test_failed_tick_stops_session() {
            let steps = Arc::new(AtomicUsize::new(0));
            let c = steps.clone();
            let app = Router::new().route(
                "/step",
                get(move || {
                    let c = c.clone();
                    async move {
                        c.fetch_add(1, Ordering::SeqCst);
                        (StatusCode::INTERNAL_SERVER_ERROR, "boom")
                    }
                }),
            );
            let base = testutil::serve(app).await;

            let view = ViewState::shared();
            let session = Monitor::spawn(
                Backend::new(&base),
                view.clone(),
                Duration::from_millis(5),
            );
            session.join().await;

            // No retry after a failed tick.
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(steps.load(Ordering::SeqCst), 1);

            let view = view.lock().await;
            assert_eq!(view.phase, Phase::Stopped);
            assert!(view.status.contains("tick failed"));
        }

        #[tokio::test]
        async fn test_stop_after_termination_is_noop() {
            let steps = Arc::new(AtomicUsize::new(0));
            let base = testutil::serve(step_router(steps.clone(), false)).await;

            let view = ViewState::shared();
            let session = Monitor::spawn(
                Backend::new(&base),
                view.clone(),
                Duration::from_millis(5),
            );
            while !session.is_finished() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }

            session.stop();
            assert_eq!(view.lock().await.phase, Phase::Stopped);
            assert_eq!(steps.load(Ordering::SeqCst), 1);
        }
    }
}
