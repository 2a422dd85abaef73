use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

/// Anything that can be told to re-fetch its data right away.
///
/// Implementations only signal; the actual fetch happens on the view's own
/// task, so a slow or failing view never holds up the others.
pub trait Refreshable: Send + Sync {
    fn view_name(&self) -> &str;
    fn request_refresh(&self);
}

struct Entry {
    id: Uuid,
    view: Weak<dyn Refreshable>,
}

#[derive(Default)]
struct Registry {
    entries: Mutex<Vec<Entry>>,
}

impl Registry {
    fn remove(&self, id: Uuid) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|e| e.id != id);
    }
}

/// Fans a "data changed" signal out to every registered view.
///
/// Holds only weak references: views own their own lifecycle and drop out of
/// the registry when their [`Registration`] goes away.
#[derive(Clone, Default)]
pub struct RefreshCoordinator {
    registry: Arc<Registry>,
}

/// Keeps a view registered for as long as it is alive.
pub struct Registration {
    id: Uuid,
    registry: Weak<Registry>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
            debug!("View {} deregistered", self.id);
        }
    }
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, view: Weak<dyn Refreshable>) -> Registration {
        let id = Uuid::new_v4();
        let mut entries = self.registry.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.push(Entry { id, view });
        Registration {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Number of registered views that are still alive.
    pub fn view_count(&self) -> usize {
        let entries = self.registry.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.iter().filter(|e| e.view.strong_count() > 0).count()
    }

    /// Signals every live view and returns how many were reached.
    pub fn refresh_all(&self) -> usize {
        let live: Vec<Arc<dyn Refreshable>> = {
            let mut entries = self.registry.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries.retain(|e| e.view.strong_count() > 0);
            entries.iter().filter_map(|e| e.view.upgrade()).collect()
        };

        for view in &live {
            debug!("Requesting refresh of {}", view.view_name());
            view.request_refresh();
        }
        info!("Refresh fan-out reached {} view(s)", live.len());
        live.len()
    }

    /// Fans out once `delay` has elapsed, without blocking the caller.
    pub fn refresh_after(&self, delay: Duration) -> JoinHandle<usize> {
        let coordinator = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            coordinator.refresh_all()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingView {
        hits: AtomicUsize,
    }

    impl Refreshable for CountingView {
        fn view_name(&self) -> &str {
            "counting"
        }

        fn request_refresh(&self) {
            self.hits.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn register(coordinator: &RefreshCoordinator, view: &Arc<CountingView>) -> Registration {
        let view: Arc<dyn Refreshable> = view.clone();
        coordinator.register(Arc::downgrade(&view))
    }

    #[test]
    fn test_fan_out_reaches_every_view() {
        let coordinator = RefreshCoordinator::new();
        let a = Arc::new(CountingView::default());
        let b = Arc::new(CountingView::default());
        let _ra = register(&coordinator, &a);
        let _rb = register(&coordinator, &b);

        assert_eq!(coordinator.refresh_all(), 2);
        assert_eq!(a.hits.load(Ordering::SeqCst), 1);
        assert_eq!(b.hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropped_registration_stops_signals() {
        let coordinator = RefreshCoordinator::new();
        let view = Arc::new(CountingView::default());
        let registration = register(&coordinator, &view);
        drop(registration);

        assert_eq!(coordinator.refresh_all(), 0);
        assert_eq!(view.hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_dropped_view_is_pruned() {
        let coordinator = RefreshCoordinator::new();
        let view = Arc::new(CountingView::default());
        let _registration = register(&coordinator, &view);
        assert_eq!(coordinator.view_count(), 1);

        drop(view);
        assert_eq!(coordinator.view_count(), 0);
        assert_eq!(coordinator.refresh_all(), 0);
    }

    #[test]
    fn test_registration_outliving_coordinator() {
        let coordinator = RefreshCoordinator::new();
        let view = Arc::new(CountingView::default());
        let registration = register(&coordinator, &view);
        drop(coordinator);
        drop(registration);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_fan_out() {
        let coordinator = RefreshCoordinator::new();
        let view = Arc::new(CountingView::default());
        let _registration = register(&coordinator, &view);

        let handle = coordinator.refresh_after(Duration::from_millis(1000));
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(view.hits.load(Ordering::SeqCst), 0);

        assert_eq!(handle.await.unwrap(), 1);
        assert_eq!(view.hits.load(Ordering::SeqCst), 1);
    }
}
