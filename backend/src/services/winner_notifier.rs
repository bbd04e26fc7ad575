use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use shared::week::WeekId;
use std::{env, fmt};

use crate::auth::CurrentUser;

#[derive(Debug)]
pub enum NotifyError {
    Address(lettre::address::AddressError),
    Email(lettre::error::Error),
    Transport(lettre::transport::smtp::Error),
    MissingConfig(&'static str),
}

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Address(e) => write!(f, "Invalid email address: {}", e),
            Self::Email(e) => write!(f, "Failed to build email: {}", e),
            Self::Transport(e) => write!(f, "SMTP error: {}", e),
            Self::MissingConfig(var) => write!(f, "{} is not set", var),
        }
    }
}

impl std::error::Error for NotifyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Address(e) => Some(e),
            Self::Email(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::MissingConfig(_) => None,
        }
    }
}

/// Tells the operators that somebody won the weekly prize. Best-effort: a
/// failure here never undoes the recorded win.
#[async_trait]
pub trait WinnerNotifier: Send + Sync {
    async fn notify(&self, winner: &CurrentUser, week_id: &WeekId) -> Result<(), NotifyError>;
}

pub struct SmtpWinnerNotifier {
    from_address: String,
    operator_inbox: String,
}

impl SmtpWinnerNotifier {
    pub fn new(from_address: String, operator_inbox: String) -> Self {
        Self {
            from_address,
            operator_inbox,
        }
    }
}

#[async_trait]
impl WinnerNotifier for SmtpWinnerNotifier {
    async fn notify(&self, winner: &CurrentUser, week_id: &WeekId) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(self.from_address.parse().map_err(NotifyError::Address)?)
            .to(self.operator_inbox.parse().map_err(NotifyError::Address)?)
            .subject(format!("Wonder wheel winner for {}", week_id))
            .header(ContentType::TEXT_PLAIN)
            .body(format!(
                "{} ({}) just won the wonder wheel prize for week {}.",
                winner.username, winner.id, week_id
            ))
            .map_err(NotifyError::Email)?;

        let smtp_username =
            env::var("SMTP_USERNAME").map_err(|_| NotifyError::MissingConfig("SMTP_USERNAME"))?;
        let smtp_password =
            env::var("SMTP_PASSWORD").map_err(|_| NotifyError::MissingConfig("SMTP_PASSWORD"))?;
        let smtp_host =
            env::var("SMTP_HOST").map_err(|_| NotifyError::MissingConfig("SMTP_HOST"))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&smtp_host)
            .map_err(NotifyError::Transport)?
            .credentials(Credentials::new(smtp_username, smtp_password))
            .port(465)
            .build();

        mailer.send(email).await.map_err(NotifyError::Transport)?;

        Ok(())
    }
}
