//! Strict (`feed-rs`) and lenient (`quick-xml` event scan) feed parsers.

use briefing_core::text::strip_html;
use briefing_core::RawItem;
use chrono::{DateTime, NaiveDateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::FeedError;

/// Channel metadata plus items, before field defaults are applied.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    pub title: Option<String>,
    pub description: Option<String>,
    pub items: Vec<RawItem>,
}

/// Parse a well-formed RSS/Atom/JSON feed with `feed-rs`.
///
/// Keeps at most `max_items` entries, in document order.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] if `feed-rs` rejects the document.
pub fn parse_strict(body: &[u8], max_items: usize) -> Result<ParsedDocument, FeedError> {
    let feed = feed_rs::parser::parse(body).map_err(|e| FeedError::Parse(e.to_string()))?;

    let items = feed
        .entries
        .into_iter()
        .take(max_items)
        .map(|entry| {
            let summary_html = entry.summary.map(|s| s.content);
            let snippet = summary_html
                .as_deref()
                .map(strip_html)
                .filter(|s| !s.is_empty());
            let media_description = entry
                .media
                .into_iter()
                .find_map(|m| m.description.map(|d| d.content));
            RawItem {
                title: entry.title.map(|t| t.content.trim().to_string()),
                link: entry
                    .links
                    .into_iter()
                    .map(|l| l.href)
                    .find(|href| !href.trim().is_empty()),
                published_at: entry.published.or(entry.updated),
                full_content: entry.content.and_then(|c| c.body),
                content: summary_html,
                snippet,
                description: media_description,
            }
        })
        .collect();

    Ok(ParsedDocument {
        title: feed.title.map(|t| t.content),
        description: feed.description.map(|d| d.content),
        items,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Published,
    Updated,
    FullContent,
    Content,
    Description,
}

fn field_for(name: &str) -> Option<Field> {
    match name {
        "title" => Some(Field::Title),
        "link" => Some(Field::Link),
        "pubDate" | "published" | "dc:date" => Some(Field::Published),
        "updated" => Some(Field::Updated),
        "content:encoded" => Some(Field::FullContent),
        "content" => Some(Field::Content),
        "description" | "summary" => Some(Field::Description),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct ItemBuilder {
    title: String,
    link: String,
    published: String,
    updated: String,
    full_content: String,
    content: String,
    description: String,
}

impl ItemBuilder {
    fn push(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::FullContent => &mut self.full_content,
            Field::Content => &mut self.content,
            Field::Description => &mut self.description,
        };
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(text);
    }

    fn build(self) -> RawItem {
        let non_empty = |s: String| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        let snippet_source = if self.description.trim().is_empty() {
            &self.content
        } else {
            &self.description
        };
        let snippet = non_empty(strip_html(snippet_source));
        let published_at =
            parse_feed_date(&self.published).or_else(|| parse_feed_date(&self.updated));

        RawItem {
            title: non_empty(strip_html(&self.title)),
            link: non_empty(self.link),
            published_at,
            full_content: non_empty(self.full_content),
            content: non_empty(self.content),
            snippet,
            description: non_empty(self.description),
        }
    }
}

/// Scan a (sanitized) feed body for `<item>`/`<entry>` elements.
///
/// Tolerates mismatched end tags, raw HTML nested inside fields, and
/// truncated documents: on a mid-document XML error the items completed so
/// far are returned.
///
/// # Errors
///
/// Returns [`FeedError::Xml`] if the document is unreadable before any item
/// was completed, or [`FeedError::Parse`] if it contains no feed markup at all.
pub fn parse_lenient(xml: &str, max_items: usize) -> Result<ParsedDocument, FeedError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut doc = ParsedDocument::default();
    let mut saw_feed_markup = false;
    let mut item: Option<ItemBuilder> = None;
    // The field being captured and the tag name that opened it.
    let mut field: Option<(Field, String)> = None;
    let mut channel_title = String::new();
    let mut channel_description = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = tag_name(&e);
                if matches!(name.as_str(), "rss" | "feed" | "channel" | "rdf:RDF") {
                    saw_feed_markup = true;
                } else if name == "item" || name == "entry" {
                    saw_feed_markup = true;
                    item = Some(ItemBuilder::default());
                    field = None;
                } else if field.is_none() {
                    if let Some(f) = field_for(&name) {
                        if f == Field::Link {
                            if let (Some(builder), Some(href)) = (item.as_mut(), link_href(&e)) {
                                if builder.link.is_empty() {
                                    builder.link = href;
                                }
                            }
                        }
                        field = Some((f, name));
                    }
                }
            }
            Ok(Event::Empty(e)) => {
                let name = tag_name(&e);
                if name == "link" {
                    if let (Some(builder), Some(href)) = (item.as_mut(), link_href(&e)) {
                        if builder.link.is_empty() {
                            builder.link = href;
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if field.as_ref().is_some_and(|(_, open)| *open == name) {
                    field = None;
                }
                if (name == "item" || name == "entry") && item.is_some() {
                    if let Some(builder) = item.take() {
                        doc.items.push(builder.build());
                    }
                    field = None;
                    if doc.items.len() >= max_items {
                        break;
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().map_or_else(
                    |_| String::from_utf8_lossy(&e).into_owned(),
                    std::borrow::Cow::into_owned,
                );
                capture(&mut item, field.as_ref(), &text, &mut channel_title, &mut channel_description);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                capture(&mut item, field.as_ref(), &text, &mut channel_title, &mut channel_description);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                if doc.items.is_empty() {
                    return Err(FeedError::Xml(e));
                }
                tracing::debug!(error = %e, kept = doc.items.len(), "lenient parse stopped early");
                break;
            }
            _ => {}
        }
    }

    if !saw_feed_markup {
        return Err(FeedError::Parse(
            "document contains no rss, atom or rdf markup".to_string(),
        ));
    }

    doc.title = (!channel_title.is_empty()).then_some(channel_title);
    doc.description = (!channel_description.is_empty()).then(|| strip_html(&channel_description));
    Ok(doc)
}

fn capture(
    item: &mut Option<ItemBuilder>,
    field: Option<&(Field, String)>,
    text: &str,
    channel_title: &mut String,
    channel_description: &mut String,
) {
    let Some((field, _)) = field else {
        return;
    };
    match item {
        Some(builder) => builder.push(*field, text),
        None => match field {
            Field::Title if channel_title.is_empty() => *channel_title = text.trim().to_string(),
            Field::Description if channel_description.is_empty() => {
                *channel_description = text.trim().to_string();
            }
            _ => {}
        },
    }
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

/// `href` of an Atom link, ignoring non-alternate relations.
fn link_href(e: &BytesStart<'_>) -> Option<String> {
    let mut href = None;
    let mut rel = None;
    for attr in e.attributes().flatten() {
        let value = attr
            .unescape_value()
            .map(|v| v.into_owned())
            .unwrap_or_default();
        match attr.key.as_ref() {
            b"href" => href = Some(value),
            b"rel" => rel = Some(value),
            _ => {}
        }
    }
    match rel.as_deref() {
        None | Some("alternate") => href.filter(|h| !h.trim().is_empty()),
        Some(_) => None,
    }
}

/// Parse the date formats seen in RSS and Atom feeds.
#[must_use]
pub fn parse_feed_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(raw)
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
