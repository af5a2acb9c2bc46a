//! Chat notification port.

/// Error type for notification delivery.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification transport error: {0}")]
    Transport(String),

    #[error("Notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// One labelled value in a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationField {
    pub label: String,
    pub value: String,
}

/// A human-readable message with a header and a list of fields.
///
/// `text` is the plain fallback shown by clients that cannot render blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub text: String,
    pub header: String,
    pub fields: Vec<NotificationField>,
}

impl Notification {
    pub fn new(header: impl Into<String>) -> Self {
        let header = header.into();
        Self {
            text: header.clone(),
            header,
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(NotificationField {
            label: label.into(),
            value: value.into(),
        });
        self
    }

    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }
}

/// Port trait for a single outbound chat channel.
///
/// One call, no retry; the caller decides what a failure means.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}
