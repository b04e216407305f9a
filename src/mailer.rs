//! Outgoing mail. Sending is fire-and-forget: failures are logged and never
//! reach the request that triggered them.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Mail {
    /// Recipient and subject only. Bodies may carry reset tokens and stay out of the log.
    pub fn summary(&self) -> String {
        format!("'{}' to {}", self.subject, self.to)
    }
}

pub trait Mailer: Send + Sync {
    fn send(&self, mail: &Mail) -> Result<(), String>;
}

pub type SharedMailer = Arc<dyn Mailer>;

/// Writes every message to the log instead of delivering it.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, mail: &Mail) -> Result<(), String> {
        log::info!("Mail {}", mail.summary());
        Ok(())
    }
}

/// Keeps sent messages in memory so they can be inspected.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Mail>>,
}

impl MemoryMailer {
    pub fn sent(&self) -> Vec<Mail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, mail: &Mail) -> Result<(), String> {
        self.sent
            .lock()
            .map_err(|e| format!("mailbox poisoned: {e}"))?
            .push(mail.clone());
        Ok(())
    }
}

/// Send in a background task.
pub fn spawn_send(mailer: &SharedMailer, mail: Mail) {
    let mailer = mailer.clone();
    tokio::spawn(async move {
        if let Err(e) = mailer.send(&mail) {
            log::warn!("Failed to send {}: {e}", mail.summary());
        }
    });
}

pub fn account_created(to: &str, name: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Your capstone account".to_string(),
        body: format!(
            "Hi {name}, an account has been created for you. \
             Request a password reset with this email address to choose your password."
        ),
    }
}

pub fn password_reset(to: &str, token: &str, frontend_url: &str) -> Mail {
    Mail {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        body: format!("Use this link to reset your password: {frontend_url}/reset-password?token={token}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawned_mail_reaches_the_mailer() {
        let memory = Arc::new(MemoryMailer::default());
        let shared: SharedMailer = memory.clone();
        spawn_send(&shared, account_created("a@u.nus.edu", "Ann"));
        for _ in 0..50 {
            if !memory.sent().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        let sent = memory.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@u.nus.edu");
        assert!(sent[0].body.contains("Ann"));
    }

    #[test]
    fn reset_mail_carries_token_link() {
        let mail = password_reset("b@u.nus.edu", "12.abcd", "http://localhost:3000");
        assert!(mail.body.contains("http://localhost:3000/reset-password?token=12.abcd"));
    }

    #[test]
    fn logged_summary_leaves_out_the_body() {
        let mail = password_reset("b@u.nus.edu", "12.abcd", "http://localhost:3000");
        let summary = mail.summary();
        assert_eq!(summary, "'Reset your password' to b@u.nus.edu");
        assert!(!summary.contains("12.abcd"));
        assert!(LogMailer.send(&mail).is_ok());
    }
}
