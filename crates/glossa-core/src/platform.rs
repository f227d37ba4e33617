//! Host abstraction traits.
//!
//! These traits define the interface between the engine and whatever is
//! showing the document (browser DOM, terminal, test harness). The engine
//! never reads ambient selection state; the host hands it a snapshot.

use crate::types::SelectionSnapshot;

/// Host-side selection access.
pub trait SelectionSource {
    /// Capture the current selection, if any.
    fn snapshot(&self) -> Option<SelectionSnapshot>;
}

impl SelectionSource for Option<SelectionSnapshot> {
    fn snapshot(&self) -> Option<SelectionSnapshot> {
        self.clone()
    }
}

impl SelectionSource for SelectionSnapshot {
    fn snapshot(&self) -> Option<SelectionSnapshot> {
        Some(self.clone())
    }
}

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// User-visible, transient notifications (toasts, status lines).
pub trait Notifier {
    fn notify(&self, level: NoticeLevel, message: &str);

    fn info(&self, message: &str) {
        self.notify(NoticeLevel::Info, message);
    }

    fn warning(&self, message: &str) {
        self.notify(NoticeLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(NoticeLevel::Error, message);
    }
}

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Info => tracing::info!(target: "glossa::notice", "{message}"),
            NoticeLevel::Warning => tracing::warn!(target: "glossa::notice", "{message}"),
            NoticeLevel::Error => tracing::error!(target: "glossa::notice", "{message}"),
        }
    }
}

impl<N: Notifier + ?Sized> Notifier for &N {
    fn notify(&self, level: NoticeLevel, message: &str) {
        (**self).notify(level, message);
    }
}
