//! HTML digest assembly and SMTP delivery.
//!
//! Builds the daily email body from the selected records and sends it over
//! implicit-TLS SMTP. A plain failure notice reuses the same delivery path
//! when a run aborts.

use crate::error::{DigestError, Result};
use crate::select::SelectedRecord;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;
use tracing::info;

/// SMTP connection timeout in seconds
const SMTP_TIMEOUT_SECS: u64 = 10;

/// Longest link text shown in a card before truncation
const LINK_DISPLAY_LIMIT: usize = 50;

/// SMTP account and recipient settings
#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender: String,
    pub password: String,
    pub receiver: String,
}

/// Escape a value for HTML text content, substituting a fallback when empty.
fn escaped_or(value: &str, fallback: &str) -> String {
    let value = if value.is_empty() { fallback } else { value };
    html_escape::encode_text(value).into_owned()
}

/// Link text for a card: escaped, truncated past the display limit.
fn link_display(url: &str) -> String {
    if url.chars().count() > LINK_DISPLAY_LIMIT {
        let prefix: String = url.chars().take(LINK_DISPLAY_LIMIT).collect();
        html_escape::encode_text(&format!("{}...", prefix)).into_owned()
    } else {
        html_escape::encode_text(url).into_owned()
    }
}

/// Build the digest body from the selected records.
///
/// Every interpolated value is HTML-escaped; the href keeps the full URL
/// while the link text is truncated for readability. An empty selection
/// produces a short friendly body instead of an empty list.
pub fn build_digest_html(papers: &[SelectedRecord]) -> String {
    if papers.is_empty() {
        return r#"<div style="font-family: Arial, 'Microsoft YaHei', sans-serif; line-height: 1.6; color: #333;">
  <h3 style="color: #2c3e50; border-bottom: 2px solid #3498db; padding-bottom: 8px;">论文筛选结果</h3>
  <p style="font-size: 16px; color: #666;">本次未筛选到与研究方向相关的论文。</p>
</div>
"#
        .to_string();
    }

    let mut body = String::from(
        r#"<div style="font-family: Arial, 'Microsoft YaHei', sans-serif; line-height: 1.8; color: #333; max-width: 1000px; margin: 0 auto;">
  <hr style="border: none; border-top: 1px solid #ecf0f1; margin: 20px 0;">
"#,
    );

    for (idx, paper) in papers.iter().enumerate() {
        let abstract_wire: String = paper.record.abstract_text.clone().into();
        let url = if paper.record.url.is_empty() {
            "No URL"
        } else {
            &paper.record.url
        };

        let card = format!(
            r#"  <div style="background: #f8f9fa; border-radius: 8px; padding: 25px; margin-bottom: 25px;">
    <h3 style="color: #3498db; margin-top: 0; margin-bottom: 20px; font-size: 20px;">
      论文 {number}
      <span style="font-size: 14px; color: #7f8c8d; font-weight: normal; margin-left: 10px;">({source})</span>
    </h3>
    <table style="width: 100%; border-collapse: collapse; margin-bottom: 15px;">
      <tr style="background: #e9ecef;">
        <th style="padding: 10px; text-align: left; width: 120px; border: 1px solid #dee2e6;">标题（英文）</th>
        <td style="padding: 10px; border: 1px solid #dee2e6;">{title}</td>
      </tr>
      <tr>
        <th style="padding: 10px; text-align: left; border: 1px solid #dee2e6;">标题（中文）</th>
        <td style="padding: 10px; border: 1px solid #dee2e6;">{title_zh}</td>
      </tr>
      <tr style="background: #e9ecef;">
        <th style="padding: 10px; text-align: left; border: 1px solid #dee2e6;">作者</th>
        <td style="padding: 10px; border: 1px solid #dee2e6;">{authors}</td>
      </tr>
      <tr>
        <th style="padding: 10px; text-align: left; border: 1px solid #dee2e6;">发表信息</th>
        <td style="padding: 10px; border: 1px solid #dee2e6;">{publish}</td>
      </tr>
      <tr style="background: #e9ecef;">
        <th style="padding: 10px; text-align: left; border: 1px solid #dee2e6;">原文链接</th>
        <td style="padding: 10px; border: 1px solid #dee2e6;">
          <a href="{href}" style="color: #3498db; text-decoration: none;" target="_blank">{link_text}</a>
        </td>
      </tr>
    </table>
    <div style="margin-top: 20px;">
      <h4 style="color: #2c3e50; margin-bottom: 8px;">摘要（英文）</h4>
      <div style="background: #ffffff; padding: 12px; border-left: 3px solid #3498db; line-height: 1.7;">{abstract_en}</div>
    </div>
    <div style="margin-top: 15px;">
      <h4 style="color: #2c3e50; margin-bottom: 8px;">摘要（中文）</h4>
      <div style="background: #ffffff; padding: 12px; border-left: 3px solid #2ecc71; line-height: 1.7;">{abstract_zh}</div>
    </div>
  </div>
"#,
            number = idx + 1,
            source = escaped_or(&paper.record.source.to_string(), "No Source"),
            title = escaped_or(&paper.record.title, "No Title"),
            title_zh = escaped_or(&paper.title_zh, "None"),
            authors = escaped_or(&paper.record.authors, "No Authors"),
            publish = escaped_or(&paper.record.publish, "No Publish"),
            href = html_escape::encode_double_quoted_attribute(url),
            link_text = link_display(url),
            abstract_en = escaped_or(&abstract_wire, "No Abstract"),
            abstract_zh = escaped_or(&paper.abstract_zh, "None"),
        );
        body.push_str(&card);
    }

    body.push_str(
        r#"  <hr style="border: none; border-top: 1px solid #ecf0f1; margin: 30px 0;">
  <div style="text-align: center; font-size: 13px; color: #7f8c8d;">
    <p>本邮件由系统自动生成，如有疑问请联系相关负责人</p>
  </div>
</div>
"#,
    );

    body
}

/// Build the failure-notice body from a rendered error chain.
pub fn build_failure_html(error: &str) -> String {
    format!(
        "<p>本次论文筛选出现错误，请检查相关代码或日志。</p>\n<pre>{}</pre>\n",
        html_escape::encode_text(error)
    )
}

/// Send the daily digest for the given date.
pub async fn send_digest(
    config: &MailConfig,
    date: &str,
    papers: &[SelectedRecord],
) -> Result<()> {
    let subject = format!("{} 论文推送", date);
    send_html(config, &subject, build_digest_html(papers)).await
}

/// Send a failure notice for the given date.
pub async fn send_failure_notice(config: &MailConfig, date: &str, error: &str) -> Result<()> {
    let subject = format!("{} 论文推送", date);
    send_html(config, &subject, build_failure_html(error)).await
}

/// Deliver an HTML body over implicit-TLS SMTP.
async fn send_html(config: &MailConfig, subject: &str, body: String) -> Result<()> {
    let from = config
        .sender
        .parse::<Mailbox>()
        .map_err(|e| DigestError::Mail(format!("Invalid sender address: {}", e)))?;
    let to = config
        .receiver
        .parse::<Mailbox>()
        .map_err(|e| DigestError::Mail(format!("Invalid receiver address: {}", e)))?;

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject(subject)
        .header(ContentType::TEXT_HTML)
        .body(body)
        .map_err(|e| DigestError::Mail(format!("Failed to build message: {}", e)))?;

    let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_server)
        .map_err(|e| DigestError::Mail(format!("SMTP setup failed: {}", e)))?
        .port(config.smtp_port)
        .credentials(Credentials::new(
            config.sender.clone(),
            config.password.clone(),
        ))
        .timeout(Some(Duration::from_secs(SMTP_TIMEOUT_SECS)))
        .build();

    mailer
        .send(message)
        .await
        .map_err(|e| DigestError::Mail(format!("Failed to send mail: {}", e)))?;

    info!(to = %config.receiver, subject = %subject, "Mail sent");
    Ok(())
}
