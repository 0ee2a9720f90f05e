//! The HTML document written for a fault.

use super::{Fault, RequestContext};
use crate::escape;
use std::fmt::Write as _;

/// Longest frame preview shown on the page, in characters.
pub(crate) const PREVIEW_CHARS: usize = 50;

const PRODUCTION_TITLE: &str = "Oops! Something went wrong.";

const STYLE: &str = r#"
    :root { --primary: #dc3545; --background: #f8f9fa; --text: #212529; --card: #ffffff; }
    @media (prefers-color-scheme: dark) {
        :root { --background: #1a1a1a; --text: #f8f9fa; --card: #2d2d2d; }
    }
    body { font-family: system-ui, sans-serif; line-height: 1.5; margin: 0; padding: 2rem; background: var(--background); color: var(--text); }
    .container { max-width: 1200px; margin: 0 auto; }
    .error-header { text-align: center; margin-bottom: 2rem; }
    .error-code { font-size: 5rem; font-weight: 700; color: var(--primary); margin: 0; }
    .error-card { background: var(--card); border-radius: 8px; padding: 1.5rem; margin-bottom: 1.5rem; }
    .stack-trace { font-family: monospace; font-size: 0.9em; white-space: pre-wrap; max-height: 400px; overflow: auto; }
    .stack-frame { padding: 0.5rem 0; border-bottom: 1px solid rgba(0,0,0,0.1); }
    .copy-button { background: var(--primary); color: white; border: none; padding: 0.5rem 1rem; border-radius: 4px; cursor: pointer; float: right; }
    .debug-info { display: grid; grid-template-columns: repeat(auto-fit, minmax(300px, 1fr)); gap: 1rem; }
"#;

/// Truncates `text` to [`PREVIEW_CHARS`] characters, marking the cut with `...`.
pub(crate) fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(PREVIEW_CHARS).collect();
    cut.push_str("...");
    cut
}

fn reason(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Error",
    }
}

/// Everything besides the fault that ends up on the page.
pub(crate) struct Page<'a> {
    pub(crate) status: u16,
    pub(crate) code: &'a str,
    pub(crate) debug: bool,
    pub(crate) app_name: &'a str,
    pub(crate) request: Option<&'a RequestContext>,
    pub(crate) timestamp: &'a str,
}

impl Page<'_> {
    pub(crate) fn render(&self, fault: &Fault) -> String {
        let title = if self.debug {
            fault.message()
        } else {
            PRODUCTION_TITLE
        };

        let mut html = String::new();
        let _ = write!(
            html,
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
             <title>Error {status} - {app}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
             <div class=\"container\">\n<div class=\"error-header\">\n\
             <h1 class=\"error-code\">{status}</h1>\n<h2 class=\"error-title\">{title}</h2>\n</div>\n",
            status = self.status,
            app = escape::html(self.app_name),
            title = escape::html(title),
        );

        if self.debug {
            self.debug_sections(&mut html, fault);
        } else {
            let _ = write!(
                html,
                "<div class=\"error-card\">\n<p>Please contact support if the problem persists. \
                 Include the following error code when reporting: <strong>{}</strong></p>\n</div>\n",
                escape::html(self.code)
            );
        }

        let _ = write!(
            html,
            "</div>\n<script>\nfunction copyErrorDetails() {{\n    const content = `{}`;\n\
             navigator.clipboard.writeText(content)\n\
             .then(() => alert('Error details copied to clipboard'))\n\
             .catch(err => console.error('Failed to copy:', err));\n}}\n</script>\n</body>\n</html>\n",
            escape::js(&self.clipboard_text(fault))
        );
        html
    }

    fn debug_sections(&self, html: &mut String, fault: &Fault) {
        let _ = write!(
            html,
            "<button class=\"copy-button\" onclick=\"copyErrorDetails()\">Copy Details</button>\n\
             <div class=\"error-card\">\n<h3>{kind} Details</h3>\n\
             <p><strong>Type:</strong> {type_name}</p>\n\
             <p><strong>File:</strong> {file} (Line: {line})</p>\n\
             <p><strong>Thread:</strong> {thread}</p>\n</div>\n",
            kind = fault.kind(),
            type_name = escape::html(fault.type_name()),
            file = escape::html(fault.file()),
            line = fault.line(),
            thread = escape::html(fault.thread()),
        );

        html.push_str("<div class=\"error-card\">\n<h3>Stack Trace</h3>\n<div class=\"stack-trace\">\n");
        if fault.frames().is_empty() {
            html.push_str("<div class=\"stack-frame\">no frames captured</div>\n");
        }
        for (index, frame) in fault.frames().iter().enumerate() {
            let _ = write!(
                html,
                "<div class=\"stack-frame\"><strong>#{index} {}</strong><br>{}</div>\n",
                escape::html(frame.location().unwrap_or("internal")),
                escape::html(&preview(frame.label())),
            );
        }
        html.push_str("</div>\n</div>\n");

        let empty = RequestContext::default();
        let request = self.request.unwrap_or(&empty);
        let _ = write!(
            html,
            "<div class=\"debug-info\">\n<div class=\"error-card\">\n<h3>Request Details</h3>\n\
             <p><strong>Method:</strong> {}</p>\n<p><strong>URI:</strong> {}</p>\n\
             <p><strong>IP:</strong> {}</p>\n<p><strong>Protocol:</strong> {}</p>\n</div>\n",
            escape::html(&request.method),
            escape::html(&request.uri),
            escape::html(&request.remote_addr),
            escape::html(&request.protocol),
        );
        let _ = write!(
            html,
            "<div class=\"error-card\">\n<h3>Server Details</h3>\n\
             <p><strong>Application:</strong> {} {}</p>\n<p><strong>Platform:</strong> {}/{}</p>\n\
             <p><strong>Process:</strong> {}</p>\n<p><strong>Time:</strong> {}</p>\n</div>\n</div>\n",
            escape::html(self.app_name),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS,
            std::env::consts::ARCH,
            std::process::id(),
            escape::html(self.timestamp),
        );
    }

    /// Plain text put on the clipboard by the copy button.
    fn clipboard_text(&self, fault: &Fault) -> String {
        if !self.debug {
            return format!(
                "Error {} {}\nCode: {}",
                self.status,
                reason(self.status),
                self.code
            );
        }

        let mut text = format!(
            "Error {}: {}\nType: {}\nMessage: {}\nFile: {}:{}\nStack Trace:\n",
            self.status,
            fault.message(),
            fault.type_name(),
            fault.message(),
            fault.file(),
            fault.line(),
        );
        for (index, frame) in fault.frames().iter().enumerate() {
            let _ = writeln!(
                text,
                "#{index} {} ({})",
                frame.label(),
                frame.location().unwrap_or("internal")
            );
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::{FaultKind, Frame};

    fn fault(message: &str) -> Fault {
        Fault::new(FaultKind::Error, "app::Failure", message, "src/app.rs", 42)
            .with_frames(vec![Frame::new("x".repeat(80), Some("src/app.rs:42".into()))])
    }

    fn page(debug: bool) -> Page<'static> {
        Page {
            status: 500,
            code: "ERR_500_0badc0de",
            debug,
            app_name: "qrpress",
            request: None,
            timestamp: "2024-01-01T00:00:00Z",
        }
    }

    #[test]
    fn production_page_hides_the_message() {
        let html = page(false).render(&fault("secret <token>"));
        assert!(html.contains("ERR_500_0badc0de"));
        assert!(html.contains(PRODUCTION_TITLE));
        assert!(!html.contains("secret"));
        assert!(!html.contains("src/app.rs"));
    }

    #[test]
    fn debug_page_escapes_everything() {
        let html = page(true).render(&fault("bad <b>input</b> `${x}`"));
        assert!(html.contains("bad &lt;b&gt;input&lt;/b&gt;"));
        assert!(!html.contains("<b>input"));
        // the script copy is escaped for a template literal
        assert!(html.contains("bad \\x3Cb\\x3Einput\\x3C/b\\x3E \\`\\${x}\\`"));
        assert!(html.contains("src/app.rs (Line: 42)"));
    }

    #[test]
    fn frame_previews_are_truncated() {
        let html = page(true).render(&fault("boom"));
        let expected = format!("<br>{}...</div>", "x".repeat(PREVIEW_CHARS));
        assert!(html.contains(&expected));
        assert_eq!(preview("short"), "short");
    }
}
