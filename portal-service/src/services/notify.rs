use crate::services::email::{EmailProvider, Notification};

/// Sends a notification without letting delivery failures escape.
///
/// The state change that triggered the mail is already committed; a failed
/// send is logged and counted, never rolled back.
pub async fn notify(email: &dyn EmailProvider, notification: Notification) {
    let kind = notification.kind();
    match email.send(&notification).await {
        Ok(()) => {
            metrics::counter!("notifications_total", "kind" => kind, "outcome" => "sent")
                .increment(1);
        }
        Err(e) => {
            metrics::counter!("notifications_total", "kind" => kind, "outcome" => "failed")
                .increment(1);
            tracing::warn!(
                error = %e,
                kind = kind,
                to = %notification.recipient(),
                "Notification delivery failed; state change kept"
            );
        }
    }
}
