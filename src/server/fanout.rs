//! Message fan-out
//!
//! Connected conversants get the message on every device; everyone else goes
//! through the external [`Notifier`].

use std::collections::HashSet;

use crate::chat::{Conversant, Message, Notifier};
use crate::protocol::Response;
use crate::registry::ConnectionRegistry;

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutReport {
    /// Conversants with at least one live connection
    pub local_recipients: usize,
    /// Responses actually queued on connections
    pub deliveries: usize,
    /// Notifier calls made for offline conversants
    pub notified: usize,
}

/// Deliver `message` to every conversant in the list
///
/// Duplicate conversant ids are collapsed. Notifier failures are logged and
/// otherwise ignored.
pub async fn fan_out(
    registry: &ConnectionRegistry,
    notifier: &dyn Notifier,
    conversants: &[Conversant],
    message: &Message,
) -> FanoutReport {
    let mut report = FanoutReport::default();
    let mut seen = HashSet::with_capacity(conversants.len());

    for conversant in conversants {
        if !seen.insert(conversant.id) {
            continue;
        }

        let handles = registry.lookup(conversant.id).await;
        if handles.is_empty() {
            report.notified += 1;
            if let Err(e) = notifier.notify(conversant.id, message).await {
                tracing::warn!(
                    conversant = %conversant.id,
                    message_id = %message.id,
                    error = %e,
                    "Notification failed"
                );
            }
            continue;
        }

        report.local_recipients += 1;
        for handle in handles {
            if handle.deliver(Response::NewMessage(message.clone())) {
                report.deliveries += 1;
            } else {
                tracing::debug!(
                    connection_id = handle.id(),
                    conversant = %conversant.id,
                    "Delivery skipped"
                );
            }
        }
    }

    tracing::debug!(
        message_id = %message.id,
        conversation = %message.conversation_id,
        local = report.local_recipients,
        deliveries = report.deliveries,
        notified = report.notified,
        "Message fanned out"
    );

    report
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::connection::Leave;
    use crate::error::NotifyError;
    use crate::registry::ConnectionHandle;

    #[derive(Default)]
    struct RecordingNotifier {
        calls: Mutex<Vec<Uuid>>,
        fail: bool,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, conversant_id: Uuid, _message: &Message) -> Result<(), NotifyError> {
            self.calls.lock().unwrap().push(conversant_id);
            if self.fail {
                return Err(NotifyError("push gateway down".into()));
            }
            Ok(())
        }
    }

    fn message() -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            message: "hi".into(),
            conversation_id: Uuid::new_v4(),
        }
    }

    async fn connect(
        registry: &ConnectionRegistry,
        id: u64,
        conversant: Uuid,
    ) -> mpsc::Receiver<Response> {
        let (tx, rx) = mpsc::channel(8);
        registry
            .add(conversant, ConnectionHandle::new(id, conversant, tx, Leave::new()))
            .await;
        rx
    }

    #[tokio::test]
    async fn test_connected_and_offline_split() {
        let registry = ConnectionRegistry::new();
        let notifier = RecordingNotifier::default();
        let conversants: Vec<_> = (0..5)
            .map(|_| Conversant::new(Uuid::new_v4(), "x"))
            .collect();

        // first two are online
        let mut rx0 = connect(&registry, 1, conversants[0].id).await;
        let mut rx1 = connect(&registry, 2, conversants[1].id).await;

        let msg = message();
        let report = fan_out(&registry, &notifier, &conversants, &msg).await;

        assert_eq!(report.local_recipients, 2);
        assert_eq!(report.deliveries, 2);
        assert_eq!(report.notified, 3);
        assert_eq!(rx0.recv().await.unwrap(), Response::NewMessage(msg.clone()));
        assert_eq!(rx1.recv().await.unwrap(), Response::NewMessage(msg));

        let calls = notifier.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        for c in &conversants[2..] {
            assert!(calls.contains(&c.id));
        }
    }

    #[tokio::test]
    async fn test_every_device_gets_one_copy() {
        let registry = ConnectionRegistry::new();
        let notifier = RecordingNotifier::default();
        let who = Conversant::new(Uuid::new_v4(), "phone+laptop");
        let mut phone = connect(&registry, 1, who.id).await;
        let mut laptop = connect(&registry, 2, who.id).await;

        // listed twice, still one copy per device
        let list = vec![who.clone(), who.clone()];
        let report = fan_out(&registry, &notifier, &list, &message()).await;

        assert_eq!(report.local_recipients, 1);
        assert_eq!(report.deliveries, 2);
        assert!(phone.recv().await.is_some());
        assert!(laptop.recv().await.is_some());
        assert!(phone.try_recv().is_err());
        assert!(laptop.try_recv().is_err());
        assert!(notifier.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_notifier_failure_is_swallowed() {
        let registry = ConnectionRegistry::new();
        let notifier = RecordingNotifier {
            fail: true,
            ..Default::default()
        };
        let list = vec![Conversant::new(Uuid::new_v4(), "away")];

        let report = fan_out(&registry, &notifier, &list, &message()).await;
        assert_eq!(report.notified, 1);
        assert_eq!(notifier.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_connection_is_not_counted() {
        let registry = ConnectionRegistry::new();
        let notifier = RecordingNotifier::default();
        let who = Conversant::new(Uuid::new_v4(), "gone");
        let rx = connect(&registry, 1, who.id).await;
        drop(rx);

        let report = fan_out(&registry, &notifier, &[who], &message()).await;
        assert_eq!(report.local_recipients, 1);
        assert_eq!(report.deliveries, 0);
        assert_eq!(report.notified, 0);
    }
}
