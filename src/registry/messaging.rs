// ABOUTME: Best-effort per-worker mailbox for side-channel messages
// ABOUTME: Bounded tokio channel with non-blocking send and timed receive

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{timeout_at, Instant};
use tracing::debug;

use crate::contract::Message;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MessagingError {
    #[error("Mailbox for '{receiver_id}' is full")]
    MailboxFull { receiver_id: String },

    #[error("Mailbox for '{receiver_id}' is closed")]
    MailboxClosed { receiver_id: String },

    #[error("No mailbox registered for '{receiver_id}'")]
    UnknownReceiver { receiver_id: String },
}

pub type Result<T> = std::result::Result<T, MessagingError>;

/// A worker's inbox. Cloning shares the same queue, so the handle can be
/// given to the worker at construction and to the orchestrator at registration.
#[derive(Debug, Clone)]
pub struct Mailbox {
    sender: mpsc::Sender<Message>,
    receiver: Arc<Mutex<mpsc::Receiver<Message>>>,
    capacity: usize,
}

impl Mailbox {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Enqueue without waiting. Fails if the mailbox is full.
    pub fn send(&self, message: Message) -> Result<()> {
        debug!(
            "Sending message {} from {} to {}",
            message.id, message.sender_id, message.receiver_id
        );

        self.sender.try_send(message).map_err(|e| match e {
            mpsc::error::TrySendError::Full(message) => MessagingError::MailboxFull {
                receiver_id: message.receiver_id,
            },
            mpsc::error::TrySendError::Closed(message) => MessagingError::MailboxClosed {
                receiver_id: message.receiver_id,
            },
        })
    }

    /// Wait for the next message. `None` waits indefinitely; returns `None` on expiry.
    /// The limit covers queueing behind other receivers as well as the wait for a message.
    pub async fn receive(&self, timeout: Option<Duration>) -> Option<Message> {
        let message = match timeout {
            Some(limit) => {
                let deadline = Instant::now() + limit;
                let mut receiver = timeout_at(deadline, self.receiver.lock()).await.ok()?;
                timeout_at(deadline, receiver.recv()).await.ok()??
            }
            None => self.receiver.lock().await.recv().await?,
        };

        debug!("Received message {}", message.id);
        Some(message)
    }

    /// Take a message if one is already queued.
    pub fn try_receive(&self) -> Option<Message> {
        let mut receiver = self.receiver.try_lock().ok()?;
        receiver.try_recv().ok()
    }

    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::JsonMap;

    fn message(receiver: &str) -> Message {
        Message::new("forecast_agent", receiver, "forecast_ready", JsonMap::new())
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let mailbox = Mailbox::new(4);
        mailbox.send(message("risk_agent")).unwrap();

        assert_eq!(mailbox.len(), 1);
        let received = mailbox.receive(Some(Duration::from_millis(50))).await.unwrap();
        assert_eq!(received.receiver_id, "risk_agent");
        assert!(mailbox.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_receive_times_out() {
        let mailbox = Mailbox::new(4);
        let received = mailbox.receive(Some(Duration::from_secs(1))).await;
        assert!(received.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_contended_receivers_share_one_limit() {
        let mailbox = Mailbox::new(4);
        let start = Instant::now();

        let (first, second) = tokio::join!(
            mailbox.receive(Some(Duration::from_secs(1))),
            mailbox.receive(Some(Duration::from_secs(1))),
        );

        assert!(first.is_none());
        assert!(second.is_none());
        assert!(start.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_receiver_gets_late_message() {
        let mailbox = Mailbox::new(4);
        let sender = mailbox.clone();

        let (received, _) = tokio::join!(mailbox.receive(Some(Duration::from_secs(5))), async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            sender.send(message("risk_agent")).unwrap();
        });

        assert_eq!(received.unwrap().receiver_id, "risk_agent");
    }

    #[tokio::test]
    async fn test_full_mailbox_rejects() {
        let mailbox = Mailbox::new(1);
        mailbox.send(message("risk_agent")).unwrap();

        let error = mailbox.send(message("risk_agent")).unwrap_err();
        assert_eq!(
            error,
            MessagingError::MailboxFull {
                receiver_id: "risk_agent".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_clones_share_queue() {
        let mailbox = Mailbox::new(4);
        let handle = mailbox.clone();

        mailbox.send(message("xai_agent")).unwrap();
        assert!(handle.try_receive().is_some());
        assert!(mailbox.try_receive().is_none());
    }
}
