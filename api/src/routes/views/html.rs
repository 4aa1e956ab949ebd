//! Minimal server-rendered pages for the browser flow
//!
//! Every interpolated value goes through [`escape`].

use og_core::domain::Otp;

/// Escape text for HTML element and attribute content
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<style>
body {{ font-family: sans-serif; max-width: 420px; margin: 60px auto; padding: 0 15px; color: #333; }}
input {{ font-size: 1.2em; padding: 8px; width: 100%; box-sizing: border-box; margin: 10px 0; }}
button {{ font-size: 1em; padding: 8px 16px; }}
.message {{ color: #c0392b; }}
</style>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>"#,
        title = escape(title),
        body = body
    )
}

/// Title and description only
pub fn message_page(title: &str, description: &str) -> String {
    layout(title, &format!("<p>{}</p>", escape(description)))
}

/// Fields shared by the OTP and address forms
pub struct FormView<'a> {
    pub otp: &'a Otp,
    pub channel_name: &'a str,
    pub channel_desc: &'a str,
    pub address_name: &'a str,
    pub address_desc: &'a str,
    pub max_len: usize,
    pub message: &'a str,
}

impl FormView<'_> {
    fn message_html(&self) -> String {
        if self.message.is_empty() {
            String::new()
        } else {
            format!(r#"<p class="message">{}</p>"#, escape(self.message))
        }
    }

    fn description<'b>(&'b self, record_value: &'b str, provider_value: &'b str) -> &'b str {
        if record_value.is_empty() {
            provider_value
        } else {
            record_value
        }
    }
}

/// OTP entry form; polls the closed status so another tab can finish the flow
pub fn otp_page(view: &FormView<'_>) -> String {
    let otp = view.otp;
    let base = format!("/otp/{}/{}", escape(&otp.namespace), escape(&otp.id));
    let body = format!(
        r#"<p>{desc}</p>
{message}
<form method="post" action="{base}">
<input type="hidden" name="action" value="check">
<input type="text" name="otp" maxlength="{max_len}" autocomplete="one-time-code" autofocus required>
<button type="submit">Verify</button>
</form>
<form method="post" action="{base}">
<input type="hidden" name="action" value="resend">
<button type="submit">Resend</button>
</form>
<script>
setInterval(function () {{
  fetch("{base}/status").then(function (r) {{ return r.json(); }}).then(function (d) {{
    if (d.data && d.data.closed) {{ window.location.reload(); }}
  }});
}}, 3000);
</script>"#,
        desc = escape(view.description(&otp.channel_description, view.channel_desc)),
        message = view.message_html(),
        base = base,
        max_len = view.max_len,
    );
    layout(&format!("Verify {}", view.channel_name), &body)
}

/// Address collection form
pub fn address_page(view: &FormView<'_>) -> String {
    let otp = view.otp;
    let body = format!(
        r#"<p>{desc}</p>
{message}
<form method="post" action="/otp/{ns}/{id}/address">
<label>{address_name}</label>
<input type="text" name="to" maxlength="{max_len}" autofocus required>
<button type="submit">Continue</button>
</form>"#,
        desc = escape(view.description(&otp.address_description, view.address_desc)),
        message = view.message_html(),
        ns = escape(&otp.namespace),
        id = escape(&otp.id),
        address_name = escape(view.address_name),
        max_len = view.max_len,
    );
    layout(&format!("Verify {}", view.channel_name), &body)
}
