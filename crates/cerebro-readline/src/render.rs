//! Terminal display of rendered reply HTML.
//!
//! Replies are stored as HTML produced by the markdown renderer. The terminal
//! gets a plain-text approximation: block tags become line breaks, list items
//! get a bullet, every other tag is dropped and entities are decoded.

/// Converts renderer HTML into plain terminal text.
pub fn html_to_terminal(html: &str) -> String {
    let mut output = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(start) = rest.find('<') {
        output.push_str(&decode_entities(&rest[..start]));
        let Some(end) = rest[start..].find('>') else {
            output.push_str(&decode_entities(&rest[start..]));
            rest = "";
            break;
        };
        apply_tag(&rest[start + 1..start + end], &mut output);
        rest = &rest[start + end + 1..];
    }
    output.push_str(&decode_entities(rest));

    collapse_blank_lines(&output)
}

fn apply_tag(tag: &str, output: &mut String) {
    let name = tag
        .trim_start_matches('/')
        .split(|c: char| c.is_whitespace() || c == '/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase();
    let closing = tag.starts_with('/');

    match (name.as_str(), closing) {
        ("br", _) | ("hr", _) => output.push('\n'),
        ("li", false) => {
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output.push_str("  - ");
        }
        ("p" | "pre" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "blockquote" | "table", true) => {
            output.push_str("\n\n")
        }
        ("tr" | "ul" | "ol", true) => output.push('\n'),
        ("td" | "th", true) => output.push_str("  "),
        _ => {}
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn collapse_blank_lines(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() && lines.last().is_none_or(|last| last.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    while lines.last().is_some_and(|last| last.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
