//! # Reporting Sink
//!
//! Posts replay counters to a Planfix JSON webhook.
//!
//! The body comes from a text template; the webhook acknowledges with
//! exactly `{"task":<task id>}`, and anything else counts as a rejection.

use async_trait::async_trait;
use corrector_core::Counters;
use reqwest::header::CONTENT_TYPE;
use tracing::{info, warn};
use url::Url;

use crate::config::ReportSettings;
use crate::error::{SyncError, SyncResult};

/// Destination for replay outcomes.
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn send(&self, counters: Counters) -> SyncResult<()>;
}

/// Substitutes `%task%`, `%success%`, `%total%` and `%name%`.
pub fn render_body(template: &str, task_id: &str, fiscal_name: &str, counters: Counters) -> String {
    template
        .replace("%task%", task_id)
        .replace("%success%", &counters.success.to_string())
        .replace("%total%", &counters.total.to_string())
        .replace("%name%", fiscal_name)
}

/// Returns true if the webhook acknowledged the report.
pub fn is_accepted(status_success: bool, body: &str, task_id: &str) -> bool {
    status_success && body == format!(r#"{{"task":{task_id}}}"#)
}

/// `https://{account}.planfix.ru/webhook/json/{method}`
pub fn webhook_url(account: &str, method: &str) -> SyncResult<Url> {
    Ok(Url::parse(&format!(
        "https://{account}.planfix.ru/webhook/json/{method}"
    ))?)
}

/// Planfix webhook client.
pub struct PlanfixReport {
    client: reqwest::Client,
    settings: ReportSettings,
    fiscal_name: String,
}

impl PlanfixReport {
    pub fn new(settings: ReportSettings, fiscal_name: impl Into<String>) -> Self {
        PlanfixReport {
            client: reqwest::Client::new(),
            settings,
            fiscal_name: fiscal_name.into(),
        }
    }
}

#[async_trait]
impl ReportSink for PlanfixReport {
    async fn send(&self, counters: Counters) -> SyncResult<()> {
        let url = webhook_url(&self.settings.account, &self.settings.method)?;
        let body = render_body(
            &self.settings.template,
            &self.settings.task_id,
            &self.fiscal_name,
            counters,
        );

        let resp = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        let answer = resp.text().await?;

        if !is_accepted(status.is_success(), &answer, &self.settings.task_id) {
            warn!(status = status.as_u16(), body = %answer, "Planfix rejected the report");
            return Err(if status.is_success() {
                SyncError::ReportRejected { body: answer }
            } else {
                SyncError::HttpStatus {
                    status: status.as_u16(),
                    body: answer,
                }
            });
        }

        info!(
            task = %self.settings.task_id,
            success = counters.success,
            total = counters.total,
            "Report delivered"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_default_template() {
        let body = render_body(
            &ReportSettings::default().template,
            "1024",
            "Касса",
            Counters {
                success: 7,
                total: 9,
            },
        );
        assert_eq!(
            body,
            r#"{"task": 1024, "success": 7, "total": 9, "fiscal": "Касса"}"#
        );
        let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(parsed["total"], 9);
    }

    #[test]
    fn test_acknowledgement() {
        assert!(is_accepted(true, r#"{"task":1024}"#, "1024"));
        assert!(!is_accepted(true, r#"{"task": 1024}"#, "1024"));
        assert!(!is_accepted(true, r#"{"task":1}"#, "1024"));
        assert!(!is_accepted(false, r#"{"task":1024}"#, "1024"));
    }

    #[test]
    fn test_webhook_url() {
        let url = webhook_url("ats", "correction-receipt").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ats.planfix.ru/webhook/json/correction-receipt"
        );
    }
}
