/// Element id of the "last updated" timestamp
pub const TIMESTAMP_TARGET: &str = "update-timestamp";

/// Rendered output of one collector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub target: &'static str,
    pub html: String,
}

impl Section {
    pub fn new(target: &'static str, html: impl Into<String>) -> Self {
        Self {
            target,
            html: html.into(),
        }
    }
}

/// Render one payload: the timestamp followed by every section as an htmx
/// out-of-band swap.
pub fn render_payload(timestamp: &str, sections: &[Section]) -> String {
    let mut html = String::from("\n");
    push_swap(&mut html, TIMESTAMP_TARGET, timestamp);
    for section in sections {
        push_swap(&mut html, section.target, &section.html);
    }
    html
}

fn push_swap(html: &mut String, target: &str, content: &str) {
    html.push_str(r#"<div hx-swap-oob="innerHTML:#"#);
    html.push_str(target);
    html.push_str(r#"">"#);
    html.push_str(content);
    html.push_str("</div>\n");
}
