//! Email notification of a finished run

use async_trait::async_trait;
use lettre::message::{header::ContentType, Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use regwatch_common::{RegwatchError, Result, RunReport};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::config::MailConfig;

/// Connection and greeting timeout for the SMTP relay
pub const SMTP_TIMEOUT_SECS: u64 = 15;

/// Port on which the relay expects TLS from the first byte
pub const IMPLICIT_TLS_PORT: u16 = 465;

/// Delivers a run report somewhere
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, report: &RunReport) -> Result<()>;
}

/// Mails the report with the exported files attached
pub struct SmtpNotifier {
    config: MailConfig,
}

impl SmtpNotifier {
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    fn transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>> {
        let host = self.config.host.as_str();
        let builder = if self.config.port == IMPLICIT_TLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host).map_err(mail_err)?
        } else {
            let tls = TlsParameters::new(host.to_string()).map_err(mail_err)?;
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                .tls(Tls::Opportunistic(tls))
        };

        Ok(builder
            .port(self.config.port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
            .build())
    }

    async fn message(&self, report: &RunReport) -> Result<Message> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&self.config.from)?)
            .subject(self.config.subject.clone());
        for recipient in &self.config.recipients {
            builder = builder.to(parse_mailbox(recipient)?);
        }

        let mut body = MultiPart::mixed().singlepart(SinglePart::html(summary_html(report)));
        for path in report.files.paths() {
            body = body.singlepart(attachment(path).await?);
        }

        builder.multipart(body).map_err(mail_err)
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn notify(&self, report: &RunReport) -> Result<()> {
        let transport = self.transport()?;
        if !transport.test_connection().await.map_err(mail_err)? {
            return Err(RegwatchError::Mail(format!(
                "SMTP relay {}:{} did not accept the connection",
                self.config.host, self.config.port
            )));
        }

        let message = self.message(report).await?;
        transport.send(message).await.map_err(mail_err)?;

        info!(
            recipients = self.config.recipients.len(),
            count = report.count,
            "Sent run summary email"
        );
        Ok(())
    }
}

/// Short HTML body: window bounds and record count
pub fn summary_html(report: &RunReport) -> String {
    format!(
        r#"<div style="font-family:system-ui,Segoe UI,Roboto">
  <h2>Newly Registered Companies</h2>
  <p>Window: <b>{from}</b> &rarr; <b>{to}</b><br/>
  Count: <b>{count}</b></p>
  <p>Files attached (JSON, CSV, XLSX).</p>
</div>"#,
        from = report.from.format("%Y-%m-%d"),
        to = report.to.format("%Y-%m-%d"),
        count = report.count,
    )
}

async fn attachment(path: &Path) -> Result<SinglePart> {
    let bytes = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    let content_type = ContentType::parse(mime_for(path)).map_err(mail_err)?;
    Ok(Attachment::new(filename).body(bytes, content_type))
}

fn mime_for(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("xlsx") => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        Some("csv") => "text/csv",
        Some("json") => "application/json",
        _ => "application/octet-stream",
    }
}

fn parse_mailbox(raw: &str) -> Result<Mailbox> {
    raw.parse()
        .map_err(|e| RegwatchError::Mail(format!("invalid address {raw:?}: {e}")))
}

fn mail_err(e: impl std::fmt::Display) -> RegwatchError {
    RegwatchError::Mail(e.to_string())
}
