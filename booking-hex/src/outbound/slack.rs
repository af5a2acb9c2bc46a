//! Chat notifier posting Block Kit messages to a Slack incoming webhook.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use booking_types::{Notification, Notifier, NotifyError};

/// Sends each notification as one JSON POST to a single incoming-webhook URL.
pub struct SlackNotifier {
    webhook_url: String,
    http: reqwest::Client,
}

impl SlackNotifier {
    pub fn new(webhook_url: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            webhook_url: webhook_url.into(),
            http,
        })
    }
}

/// Renders a header block followed by a section of `mrkdwn` fields.
pub fn render_blocks(notification: &Notification) -> Value {
    let fields: Vec<Value> = notification
        .fields
        .iter()
        .map(|f| {
            json!({
                "type": "mrkdwn",
                "text": format!("*{}:*\n{}", f.label, f.value),
            })
        })
        .collect();

    json!({
        "text": notification.text,
        "blocks": [
            {
                "type": "header",
                "text": {
                    "type": "plain_text",
                    "text": notification.header,
                    "emoji": true,
                },
            },
            {
                "type": "section",
                "fields": fields,
            },
        ],
    })
}

#[async_trait]
impl Notifier for SlackNotifier {
    #[tracing::instrument(skip(self, notification), fields(header = %notification.header))]
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let resp = self
            .http
            .post(&self.webhook_url)
            .json(&render_blocks(notification))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("notification delivered");
        Ok(())
    }
}
