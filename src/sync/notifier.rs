//! "Your turn" notifications. Failures here never reach the caller.

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, info};

/// Whether the user allowed notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Notifications may be shown.
    Granted,
    /// The user refused notifications.
    Denied,
    /// Not decided yet; asking is allowed.
    Default,
}

/// Why a notification was not shown.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The platform has no notification facility.
    #[error("notifications are not supported on this platform")]
    Unsupported,
    /// Asking for permission failed.
    #[error("permission request failed: {0}")]
    PermissionRequest(String),
    /// The platform refused to show it.
    #[error("failed to display notification: {0}")]
    Display(String),
}

/// Content of a turn notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnNotification {
    /// Session the turn belongs to.
    pub session_id: String,
    /// Short headline.
    pub title: String,
    /// Message text.
    pub body: String,
}

impl TurnNotification {
    /// Notification telling the local player it is their move.
    pub fn your_turn(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_owned(),
            title: "Your turn".into(),
            body: "The other players are done. It's your move.".into(),
        }
    }
}

/// Platform notification facility.
pub trait Notifier: Send + Sync {
    /// Current permission, or `Unsupported` when the platform has none.
    fn permission(&self) -> Result<Permission, NotifyError>;
    /// Prompt the user for permission.
    fn request_permission(&self) -> BoxFuture<'static, Result<Permission, NotifyError>>;
    /// Display `notification`.
    fn notify(&self, notification: &TurnNotification) -> Result<(), NotifyError>;
}

/// Show `notification` if the platform and the user allow it.
///
/// Asks for permission when it is still undecided. Returns whether the
/// notification was displayed.
pub async fn notify_best_effort(notifier: &dyn Notifier, notification: &TurnNotification) -> bool {
    let permission = match notifier.permission() {
        Ok(Permission::Default) => notifier.request_permission().await,
        other => other,
    };

    let outcome = match permission {
        Ok(Permission::Granted) => notifier.notify(notification),
        Ok(Permission::Denied | Permission::Default) => {
            debug!(session_id = %notification.session_id, "notification permission not granted");
            return false;
        }
        Err(err) => Err(err),
    };

    match outcome {
        Ok(()) => true,
        Err(err) => {
            debug!(session_id = %notification.session_id, error = %err, "turn notification skipped");
            false
        }
    }
}

/// Writes notifications to the log. Always permitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn permission(&self) -> Result<Permission, NotifyError> {
        Ok(Permission::Granted)
    }

    /// Prompt the user for permission.
    fn request_permission(&self) -> BoxFuture<'static, Result<Permission, NotifyError>> {
        Box::pin(async { Ok(Permission::Granted) })
    }

    /// Display `notification`.
    fn notify(&self, notification: &TurnNotification) -> Result<(), NotifyError> {
        info!(
            session_id = %notification.session_id,
            title = %notification.title,
            "{}",
            notification.body
        );
        Ok(())
    }
}

/// Platform without any notification support.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedNotifier;

impl Notifier for UnsupportedNotifier {
    fn permission(&self) -> Result<Permission, NotifyError> {
        Err(NotifyError::Unsupported)
    }

    /// Prompt the user for permission.
    fn request_permission(&self) -> BoxFuture<'static, Result<Permission, NotifyError>> {
        Box::pin(async { Err(NotifyError::Unsupported) })
    }

    /// Display `notification`.
    fn notify(&self, _notification: &TurnNotification) -> Result<(), NotifyError> {
        Err(NotifyError::Unsupported)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;

    /// Scriptable notifier recording what it displayed.
    pub(crate) struct FakeNotifier {
        pub(crate) permission: Mutex<Result<Permission, ()>>,
        pub(crate) grant_on_request: Option<Permission>,
        pub(crate) fail_show: bool,
        pub(crate) requests: AtomicUsize,
        pub(crate) shown: Mutex<Vec<TurnNotification>>,
    }

    impl FakeNotifier {
        pub(crate) fn granted() -> Self {
            Self::with(Ok(Permission::Granted), None, false)
        }

        pub(crate) fn with(
            permission: Result<Permission, ()>,
            grant_on_request: Option<Permission>,
            fail_show: bool,
        ) -> Self {
            Self {
                permission: Mutex::new(permission),
                grant_on_request,
                fail_show,
                requests: AtomicUsize::new(0),
                shown: Mutex::default(),
            }
        }

        pub(crate) fn shown(&self) -> usize {
            self.shown.lock().unwrap().len()
        }
    }

    impl Notifier for FakeNotifier {
        fn permission(&self) -> Result<Permission, NotifyError> {
            (*self.permission.lock().unwrap()).map_err(|()| NotifyError::Unsupported)
        }

        fn request_permission(&self) -> BoxFuture<'static, Result<Permission, NotifyError>> {
            self.requests.fetch_add(1, Ordering::SeqCst);
            let answer = self.grant_on_request;
            if let Some(granted) = answer {
                *self.permission.lock().unwrap() = Ok(granted);
            }
            Box::pin(async move {
                answer.ok_or_else(|| NotifyError::PermissionRequest("prompt dismissed".into()))
            })
        }

        fn notify(&self, notification: &TurnNotification) -> Result<(), NotifyError> {
            if self.fail_show {
                return Err(NotifyError::Display("compositor gone".into()));
            }
            self.shown.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn turn() -> TurnNotification {
        TurnNotification::your_turn("v2:abc")
    }

    #[tokio::test]
    async fn test_granted_permission_shows() {
        let notifier = FakeNotifier::granted();
        assert!(notify_best_effort(&notifier, &turn()).await);
        assert_eq!(notifier.shown(), 1);
        assert_eq!(notifier.requests.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undecided_permission_is_requested_first() {
        let notifier = FakeNotifier::with(Ok(Permission::Default), Some(Permission::Granted), false);
        assert!(notify_best_effort(&notifier, &turn()).await);
        assert_eq!(notifier.requests.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.shown(), 1);
    }

    #[tokio::test]
    async fn test_denied_or_refused_permission_shows_nothing() {
        let denied = FakeNotifier::with(Ok(Permission::Denied), None, false);
        assert!(!notify_best_effort(&denied, &turn()).await);
        assert_eq!(denied.requests.load(Ordering::SeqCst), 0);

        let refused = FakeNotifier::with(Ok(Permission::Default), Some(Permission::Denied), false);
        assert!(!notify_best_effort(&refused, &turn()).await);
        assert_eq!(refused.shown(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_swallowed() {
        let request_fails = FakeNotifier::with(Ok(Permission::Default), None, false);
        assert!(!notify_best_effort(&request_fails, &turn()).await);

        let show_fails = FakeNotifier::with(Ok(Permission::Granted), None, true);
        assert!(!notify_best_effort(&show_fails, &turn()).await);

        assert!(!notify_best_effort(&UnsupportedNotifier, &turn()).await);
        assert!(notify_best_effort(&LogNotifier, &turn()).await);
    }
}
