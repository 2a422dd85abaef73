//! Independently polled data views.
//!
//! Each view owns one task that re-fetches on its own interval or when its
//! [`RefreshHandle`] is signalled, and publishes a [`ViewState`] snapshot over
//! a `watch` channel. Dropping the view aborts the task.

pub mod holdings;
pub mod portfolio;
pub mod status;
pub mod system;
pub mod trades;

pub use holdings::*;
pub use portfolio::*;
pub use status::*;
pub use system::*;
pub use trades::*;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::engine::{RefreshCoordinator, Refreshable, Registration};
use crate::error::DashboardResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    Portfolio,
    Holdings,
    Trades,
    Status,
    System,
}

impl ViewKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewKind::Portfolio => "portfolio",
            ViewKind::Holdings => "holdings",
            ViewKind::Trades => "trades",
            ViewKind::Status => "status",
            ViewKind::System => "system",
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "portfolio" => Ok(ViewKind::Portfolio),
            "holdings" => Ok(ViewKind::Holdings),
            "trades" => Ok(ViewKind::Trades),
            "status" => Ok(ViewKind::Status),
            "system" => Ok(ViewKind::System),
            other => Err(format!("unknown view: {}", other)),
        }
    }
}

/// Where a view gets its data from.
#[async_trait]
pub trait ViewSource: Send + Sync + 'static {
    type Data: Clone + Send + Sync + 'static;

    fn kind(&self) -> ViewKind;
    async fn load(&self) -> DashboardResult<Self::Data>;
}

/// Snapshot published after every fetch attempt.
///
/// A failed fetch keeps the previous `data` and sets `error`.
#[derive(Debug, Clone, Serialize)]
pub struct ViewState<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub loading: bool,
    pub last_updated: Option<DateTime<Utc>>,
    pub fetches: u64,
}

impl<T> Default for ViewState<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            loading: false,
            last_updated: None,
            fetches: 0,
        }
    }
}

impl<T> ViewState<T> {
    fn apply(&mut self, result: DashboardResult<T>) {
        self.loading = false;
        self.fetches += 1;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
                self.last_updated = Some(Utc::now());
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }
}

/// The refresh entry point the coordinator holds a weak reference to.
pub struct RefreshHandle {
    kind: ViewKind,
    trigger: Notify,
}

impl Refreshable for RefreshHandle {
    fn view_name(&self) -> &str {
        self.kind.as_str()
    }

    fn request_refresh(&self) {
        self.trigger.notify_one();
    }
}

pub struct PolledView<T> {
    kind: ViewKind,
    handle: Arc<RefreshHandle>,
    state_rx: watch::Receiver<ViewState<T>>,
    alive: Arc<AtomicBool>,
    task: JoinHandle<()>,
    registration: Option<Registration>,
}

impl<T: Clone + Send + Sync + 'static> PolledView<T> {
    /// Starts polling immediately; the first fetch runs without waiting a full period.
    pub fn spawn<S>(source: S, period: Duration) -> Self
    where
        S: ViewSource<Data = T>,
    {
        let kind = source.kind();
        let handle = Arc::new(RefreshHandle {
            kind,
            trigger: Notify::new(),
        });
        let (state_tx, state_rx) = watch::channel(ViewState::default());
        let alive = Arc::new(AtomicBool::new(true));

        let task = tokio::spawn(poll_loop(
            source,
            period,
            handle.clone(),
            state_tx,
            alive.clone(),
        ));

        Self {
            kind,
            handle,
            state_rx,
            alive,
            task,
            registration: None,
        }
    }

    /// Registers with the coordinator until this view is dropped.
    pub fn register_with(mut self, coordinator: &RefreshCoordinator) -> Self {
        let handle: Arc<dyn Refreshable> = self.handle.clone();
        self.registration = Some(coordinator.register(Arc::downgrade(&handle)));
        self
    }

    pub fn state(&self) -> ViewState<T> {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState<T>> {
        self.state_rx.clone()
    }

    /// Manual retry; also what the coordinator triggers.
    pub fn refresh(&self) {
        self.handle.request_refresh();
    }
}

impl<T> Drop for PolledView<T> {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
        self.task.abort();
        debug!("{} view torn down", self.kind);
    }
}

async fn poll_loop<S: ViewSource>(
    source: S,
    period: Duration,
    handle: Arc<RefreshHandle>,
    state_tx: watch::Sender<ViewState<S::Data>>,
    alive: Arc<AtomicBool>,
) {
    let kind = source.kind();
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => debug!("{} poll tick", kind),
            _ = handle.trigger.notified() => {
                debug!("{} refresh requested", kind);
                ticker.reset();
            }
        }

        if !alive.load(Ordering::Acquire) {
            break;
        }
        state_tx.send_modify(|state| state.loading = true);

        let result = source.load().await;

        // Interest may have been withdrawn while the request was in flight.
        if !alive.load(Ordering::Acquire) {
            debug!("{} discarding response after teardown", kind);
            break;
        }
        match &result {
            Err(e) if e.is_auth() => warn!("{} refresh failed, sign in again: {}", kind, e),
            Err(e) => warn!("{} refresh failed: {}", kind, e),
            Ok(_) => {}
        }
        state_tx.send_modify(|state| state.apply(result));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DashboardError;
    use std::sync::atomic::AtomicU64;

    struct CountingSource {
        loads: Arc<AtomicU64>,
        fail: Arc<AtomicBool>,
        latency: Duration,
    }

    impl CountingSource {
        fn new(latency: Duration) -> (Self, Arc<AtomicU64>, Arc<AtomicBool>) {
            let loads = Arc::new(AtomicU64::new(0));
            let fail = Arc::new(AtomicBool::new(false));
            let source = Self {
                loads: loads.clone(),
                fail: fail.clone(),
                latency,
            };
            (source, loads, fail)
        }
    }

    #[async_trait]
    impl ViewSource for CountingSource {
        type Data = u64;

        fn kind(&self) -> ViewKind {
            ViewKind::Trades
        }

        async fn load(&self) -> DashboardResult<u64> {
            tokio::time::sleep(self.latency).await;
            let n = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail.load(Ordering::SeqCst) {
                Err(DashboardError::Transport("gateway down".to_string()))
            } else {
                Ok(n)
            }
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_fetch_and_periodic_polling() {
        let (source, loads, _) = CountingSource::new(Duration::ZERO);
        let view = PolledView::spawn(source, Duration::from_secs(10));

        settle().await;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(view.state().data, Some(1));

        tokio::time::sleep(Duration::from_secs(10)).await;
        settle().await;
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_runs_before_next_tick() {
        let (source, loads, _) = CountingSource::new(Duration::ZERO);
        let view = PolledView::spawn(source, Duration::from_secs(60));
        settle().await;

        view.refresh();
        settle().await;
        assert_eq!(loads.load(Ordering::SeqCst), 2);
        assert_eq!(view.state().fetches, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_data_and_recovers() {
        let (source, _, fail) = CountingSource::new(Duration::ZERO);
        let view = PolledView::spawn(source, Duration::from_secs(60));
        settle().await;

        fail.store(true, Ordering::SeqCst);
        view.refresh();
        settle().await;
        let state = view.state();
        assert_eq!(state.data, Some(1));
        assert!(state.error.unwrap().contains("gateway down"));

        fail.store(false, Ordering::SeqCst);
        view.refresh();
        settle().await;
        let state = view.state();
        assert_eq!(state.data, Some(3));
        assert!(state.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_polling() {
        let (source, loads, _) = CountingSource::new(Duration::ZERO);
        let view = PolledView::spawn(source, Duration::from_secs(5));
        settle().await;
        drop(view);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_after_teardown_is_discarded() {
        let (source, _, _) = CountingSource::new(Duration::from_secs(2));
        let view = PolledView::spawn(source, Duration::from_secs(60));
        let observer = view.subscribe();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(observer.borrow().loading);
        drop(view);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(observer.borrow().data.is_none());
        assert_eq!(observer.borrow().fetches, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_coordinator_reaches_view_until_dropped() {
        let coordinator = RefreshCoordinator::new();
        let (source, loads, _) = CountingSource::new(Duration::ZERO);
        let view = PolledView::spawn(source, Duration::from_secs(60)).register_with(&coordinator);
        settle().await;

        assert_eq!(coordinator.refresh_all(), 1);
        settle().await;
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        drop(view);
        assert_eq!(coordinator.refresh_all(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_view_does_not_hold_back_siblings() {
        let coordinator = RefreshCoordinator::new();
        let (healthy_source, healthy_loads, _) = CountingSource::new(Duration::ZERO);
        let (failing_source, failing_loads, fail) = CountingSource::new(Duration::from_secs(3));
        fail.store(true, Ordering::SeqCst);

        let healthy = PolledView::spawn(healthy_source, Duration::from_secs(60)).register_with(&coordinator);
        let failing = PolledView::spawn(failing_source, Duration::from_secs(60)).register_with(&coordinator);
        settle().await;

        assert_eq!(coordinator.refresh_all(), 2);
        settle().await;

        // The sibling is still waiting on its gateway call.
        assert_eq!(healthy_loads.load(Ordering::SeqCst), 2);
        assert_eq!(failing_loads.load(Ordering::SeqCst), 0);
        let state = healthy.state();
        assert_eq!(state.fetches, 2);
        assert!(state.error.is_none());

        tokio::time::sleep(Duration::from_secs(10)).await;
        let failed = failing.state();
        assert!(failed.error.unwrap().contains("gateway down"));
        assert!(failed.data.is_none());
        assert_eq!(failed.fetches, 2);

        let state = healthy.state();
        assert_eq!(state.data, Some(2));
        assert!(state.error.is_none());
    }

    #[test]
    fn test_view_kind_parsing() {
        assert_eq!("holdings".parse::<ViewKind>().unwrap(), ViewKind::Holdings);
        assert_eq!("system".parse::<ViewKind>().unwrap(), ViewKind::System);
        assert!("charts".parse::<ViewKind>().is_err());
    }
}
