//! Transient notifications for the human (toasts in a UI, log lines in the CLI).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Error,
    Info,
}

/// Fire-and-forget notification sink.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NotificationKind, text: &str);
}

/// Sends notifications to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, kind: NotificationKind, text: &str) {
        match kind {
            NotificationKind::Error => tracing::error!(notification = true, "{text}"),
            NotificationKind::Info => tracing::info!(notification = true, "{text}"),
        }
    }
}
