use std::sync::Mutex;

use storegate_core::RoutePath;

/// "Stop rendering, load this path instead."
pub trait Navigator: Send + Sync {
    fn redirect(&self, to: &RoutePath);
}

/// Navigator that only remembers where it was asked to go.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<RoutePath>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<RoutePath> {
        self.redirects
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn last(&self) -> Option<RoutePath> {
        self.redirects.lock().ok()?.last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, to: &RoutePath) {
        tracing::debug!(%to, "redirect");
        if let Ok(mut redirects) = self.redirects.lock() {
            redirects.push(to.clone());
        }
    }
}
