//! Account email templates
//!
//! Templates are compiled in with askama so a missing variable is a build
//! error rather than a blank email.

use crate::{Email, MailerError};
use askama::Template;

#[derive(Template)]
#[template(
    source = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Reset your password - {{ app_name }}</title>
    <style>
        body { font-family: Arial, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 20px; background-color: #f4f4f4; }
        .container { max-width: 600px; margin: 0 auto; background: white; padding: 30px; border-radius: 8px; }
        .button { display: inline-block; padding: 12px 24px; background-color: #1f6feb; color: white; text-decoration: none; border-radius: 4px; margin: 20px 0; }
        .footer { margin-top: 30px; padding-top: 20px; border-top: 1px solid #eee; font-size: 12px; color: #666; }
    </style>
</head>
<body>
    <div class="container">
        <h1>{{ app_name }}</h1>
        <p>Hello {{ recipient }},</p>
        <p>We received a request to reset the password for your account. Use the button below to choose a new one.</p>
        <div style="text-align: center;">
            <a href="{{ finish_url|safe }}" class="button">Reset password</a>
        </div>
        <p>Or copy and paste this URL into your browser:</p>
        <p style="word-break: break-all; font-family: monospace;">{{ finish_url|safe }}</p>
        <p>If you didn't ask for a password reset, you can ignore this email. Your password will not change.</p>
        <div class="footer">{{ app_name }}</div>
    </div>
</body>
</html>"#,
    ext = "html"
)]
struct PasswordResetTemplate<'a> {
    app_name: &'a str,
    recipient: &'a str,
    finish_url: &'a str,
}

pub struct PasswordResetEmail;

impl PasswordResetEmail {
    /// Render the HTML body for a password reset email.
    pub fn render(app_name: &str, recipient: &str, finish_url: &str) -> Result<String, MailerError> {
        let template = PasswordResetTemplate {
            app_name,
            recipient,
            finish_url,
        };
        Ok(template.render()?)
    }

    pub fn subject(app_name: &str) -> String {
        format!("Reset your {app_name} password")
    }

    /// Wrap previously rendered content into a sendable message.
    pub fn build(
        from: &str,
        recipient: &str,
        app_name: &str,
        content: &str,
    ) -> Result<Email, MailerError> {
        Email::builder()
            .from(from)
            .to(recipient)
            .subject(Self::subject(app_name))
            .html_body(content)
            .build()
    }
}
