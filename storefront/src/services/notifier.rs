// storefront/src/services/notifier.rs

//! Outbound order notifications. Delivery may fail independently of the
//! order; callers log the failure and move on.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
  pub to: String,
  pub subject: String,
  pub html_body: String,
}

#[derive(Debug, Clone)]
pub struct SentNotification {
  pub message_id: String,
  pub to: String,
  pub from: String,
  pub subject: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
  async fn send(&self, notification: Notification) -> Result<SentNotification>;
}

/// Messages a `LogNotifier` remembers before dropping the oldest.
pub const HISTORY_CAPACITY: usize = 64;

/// Logs each message and keeps the most recent ones. Subjects containing
/// `fail_test` simulate a provider failure.
pub struct LogNotifier {
  sender: String,
  capacity: usize,
  sent: Mutex<VecDeque<SentNotification>>,
}

impl LogNotifier {
  pub fn new(sender: impl Into<String>) -> Self {
    Self::with_history(sender, HISTORY_CAPACITY)
  }

  pub fn with_history(sender: impl Into<String>, capacity: usize) -> Self {
    Self {
      sender: sender.into(),
      capacity,
      sent: Mutex::new(VecDeque::with_capacity(capacity)),
    }
  }

  /// Recent messages, oldest first.
  pub fn sent(&self) -> Vec<SentNotification> {
    self.sent.lock().iter().cloned().collect()
  }

  fn remember(&self, sent: SentNotification) {
    if self.capacity == 0 {
      return;
    }
    let mut history = self.sent.lock();
    while history.len() >= self.capacity {
      history.pop_front();
    }
    history.push_back(sent);
  }
}

#[async_trait]
impl Notifier for LogNotifier {
  async fn send(&self, notification: Notification) -> Result<SentNotification> {
    info!(to = %notification.to, from = %self.sender, subject = %notification.subject, "Sending notification.");
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;

    if notification.subject.to_lowercase().contains("fail_test") {
      warn!(subject = %notification.subject, "Simulated notification failure.");
      return Err(AppError::Internal("Simulated notification send failure".to_string()));
    }

    let sent = SentNotification {
      message_id: format!("msg_{}", uuid::Uuid::new_v4().simple()),
      to: notification.to,
      from: self.sender.clone(),
      subject: notification.subject,
    };
    info!(message_id = %sent.message_id, "Notification sent.");
    self.remember(sent.clone());
    Ok(sent)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn note(subject: &str) -> Notification {
    Notification {
      to: "kamala@example.com".to_string(),
      subject: subject.to_string(),
      html_body: "<p>thanks</p>".to_string(),
    }
  }

  #[tokio::test]
  async fn history_keeps_only_the_latest_messages() {
    let notifier = LogNotifier::with_history("orders@example.com", 2);
    for subject in ["first", "second", "third"] {
      notifier.send(note(subject)).await.expect("send succeeds");
    }

    let subjects: Vec<String> = notifier.sent().into_iter().map(|s| s.subject).collect();
    assert_eq!(subjects, vec!["second".to_string(), "third".to_string()]);
  }

  #[tokio::test]
  async fn failed_sends_are_not_remembered() {
    let notifier = LogNotifier::new("orders@example.com");
    assert!(notifier.send(note("fail_test receipt")).await.is_err());
    assert!(notifier.sent().is_empty());
  }
}
