//! Message rendering for outbound pushes
//!
//! Templates use `{{name}}` placeholders: `namespace`, `to`, `channel`,
//! `otp`, `otp_url` and `ttl` (whole seconds).

use std::time::Duration;

/// Body used when a provider is configured without a template
pub const DEFAULT_BODY: &str = "Your {{channel}} verification code is {{otp}}";

/// Values available to templates
#[derive(Debug, Clone)]
pub struct PushContext<'a> {
    pub namespace: &'a str,
    pub to: &'a str,
    pub channel: &'a str,
    pub otp: &'a str,
    pub otp_url: &'a str,
    pub ttl: Duration,
}

/// Subject and body produced by a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: Vec<u8>,
}

/// Subject and body templates of a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    subject: String,
    body: String,
}

impl Default for MessageTemplate {
    fn default() -> Self {
        Self::new("", DEFAULT_BODY)
    }
}

impl MessageTemplate {
    /// Create a template; an empty body falls back to [`DEFAULT_BODY`]
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        Self {
            subject: subject.into(),
            body: if body.is_empty() {
                DEFAULT_BODY.to_string()
            } else {
                body
            },
        }
    }

    /// Render both templates, truncating the body to `max_body_len` bytes
    pub fn render(&self, ctx: &PushContext<'_>, max_body_len: usize) -> RenderedMessage {
        let subject = substitute(&self.subject, ctx);
        let body = truncate(substitute(&self.body, ctx), max_body_len);

        RenderedMessage {
            subject,
            body: body.into_bytes(),
        }
    }
}

fn substitute(template: &str, ctx: &PushContext<'_>) -> String {
    let ttl = ctx.ttl.as_secs_f64().round().to_string();
    let values = [
        ("namespace", ctx.namespace),
        ("to", ctx.to),
        ("channel", ctx.channel),
        ("otp_url", ctx.otp_url),
        ("otp", ctx.otp),
        ("ttl", ttl.as_str()),
    ];

    let mut out = template.to_string();
    for (key, value) in values {
        let placeholder = format!("{{{{{}}}}}", key);
        out = out.replace(&placeholder, value);
    }
    out
}

/// Cut `s` to at most `max` bytes without splitting a character
fn truncate(mut s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s.truncate(end);
    s
}
