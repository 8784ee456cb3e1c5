//! Markdown rendering for assistant replies.
//!
//! Replies are written in markdown; the chat page shows them as HTML. Raw
//! HTML in a reply is never passed through: it is rendered as text.

use pulldown_cmark::{Event, Options, Parser, html};

pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bold_and_lists() {
        let html = render_markdown("Confirmed for **3:00 PM**.\n\n- Room A\n- Room B\n");
        assert!(html.contains("<strong>3:00 PM</strong>"));
        assert!(html.contains("<ul>"));
        assert!(html.contains("<li>Room A</li>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = render_markdown("<script>alert(1)</script>\n\nhi <img src=x onerror=alert(1)>");
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<img"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_tables() {
        let html = render_markdown("| Time | Event |\n|---|---|\n| 10:00 | Sync |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>Sync</td>"));
    }
}
