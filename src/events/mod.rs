use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Events emitted by the services after a successful mutation. Delivery
/// is best-effort; no operation's outcome depends on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Enrollment events
    EnrollmentCreated {
        transaction_id: Uuid,
        user_id: Uuid,
        course_id: Uuid,
    },
    EnrollmentApproved {
        transaction_id: Uuid,
        user_id: Uuid,
        course_id: Uuid,
    },
    EnrollmentRejected {
        transaction_id: Uuid,
        reason: Option<String>,
    },

    // Review events
    ReviewWritten {
        review_id: Uuid,
        course_id: Uuid,
    },
    ReviewDeleted {
        review_id: Uuid,
        course_id: Uuid,
    },

    // Progress events
    ProgressRecorded {
        user_id: Uuid,
        course_id: Uuid,
        module_id: Uuid,
        progress: i16,
    },

    // Certificate events
    CertificateIssued {
        certificate_id: Uuid,
        user_id: Uuid,
        course_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Consumes events from the channel until all senders are dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::EnrollmentApproved {
                transaction_id,
                user_id,
                course_id,
            } => {
                info!(
                    transaction_id = %transaction_id,
                    user_id = %user_id,
                    course_id = %course_id,
                    "Enrollment approved"
                );
            }
            Event::CertificateIssued {
                certificate_id,
                user_id,
                ..
            } => {
                info!(certificate_id = %certificate_id, user_id = %user_id, "Certificate issued");
            }
            other => debug!(event = ?other, "Event processed"),
        }
    }
    info!("Event processor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_events_to_the_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);
        let course_id = Uuid::new_v4();

        sender
            .send(Event::ReviewWritten {
                review_id: Uuid::new_v4(),
                course_id,
            })
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::ReviewWritten { course_id: got, .. }) => assert_eq!(got, course_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_when_receiver_is_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        let result = sender
            .send(Event::EnrollmentRejected {
                transaction_id: Uuid::new_v4(),
                reason: None,
            })
            .await;
        assert!(result.is_err());
    }
}
