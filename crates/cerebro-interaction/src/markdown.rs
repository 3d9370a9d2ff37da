//! CommonMark to HTML rendering for completion replies.
//!
//! Raw HTML embedded in the markdown is emitted as escaped text and
//! script-capable link targets are neutralized, so the output can be
//! displayed without further sanitizing.

use cerebro_core::MarkdownRenderer;
use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html};

/// [`MarkdownRenderer`] backed by `pulldown-cmark`.
#[derive(Debug, Clone, Copy)]
pub struct CommonMarkRenderer {
    options: Options,
}

impl CommonMarkRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

impl Default for CommonMarkRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer for CommonMarkRenderer {
    fn render(&self, markdown: &str) -> String {
        let events = Parser::new_ext(markdown, self.options).map(sanitize_event);

        let mut output = String::with_capacity(markdown.len() * 3 / 2);
        html::push_html(&mut output, events);
        output
    }
}

fn sanitize_event(event: Event<'_>) -> Event<'_> {
    match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    }
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let scheme = url.trim_start().to_ascii_lowercase();
    if ["javascript:", "vbscript:", "data:"]
        .iter()
        .any(|blocked| scheme.starts_with(blocked))
    {
        CowStr::Borrowed("#")
    } else {
        url
    }
}
