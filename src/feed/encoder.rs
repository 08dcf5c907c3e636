//! Atom rendering of the aggregate.

use std::io::Cursor;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::aggregate::{Aggregate, OutputItem};
use crate::error::{FeedmergeError, Result};

const ATOM_NS: &str = "http://www.w3.org/2005/Atom";

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// Render the aggregate as an Atom 1.0 document.
pub fn render_atom(aggregate: &Aggregate) -> Result<String> {
    let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    write(
        &mut w,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write(
        &mut w,
        Event::Start(BytesStart::new("feed").with_attributes([("xmlns", ATOM_NS)])),
    )?;

    let identity = &aggregate.identity;
    text_element(&mut w, "title", &identity.title, None)?;
    text_element(&mut w, "id", &identity.id, None)?;
    text_element(&mut w, "updated", &timestamp(aggregate.updated_at), None)?;
    if !identity.self_link.is_empty() {
        write(
            &mut w,
            Event::Empty(
                BytesStart::new("link")
                    .with_attributes([("href", identity.self_link.as_str()), ("rel", "self")]),
            ),
        )?;
    }

    for item in aggregate.items() {
        write_entry(&mut w, item)?;
    }

    write(&mut w, Event::End(BytesEnd::new("feed")))?;

    let bytes = w.into_inner().into_inner();
    let rendered = String::from_utf8(bytes).map_err(|e| FeedmergeError::Render(e.to_string()))?;
    if rendered.is_empty() {
        return Err(FeedmergeError::Render("empty document".to_string()));
    }
    Ok(rendered)
}

fn write_entry(w: &mut XmlWriter, item: &OutputItem) -> Result<()> {
    write(w, Event::Start(BytesStart::new("entry")))?;

    text_element(w, "title", &item.title, None)?;
    if !item.link.is_empty() {
        write(
            w,
            Event::Empty(
                BytesStart::new("link")
                    .with_attributes([("href", item.link.as_str()), ("rel", "alternate")]),
            ),
        )?;
    }
    text_element(w, "id", &item.id, None)?;
    let created = timestamp(item.created_at);
    text_element(w, "updated", &created, None)?;
    text_element(w, "published", &created, None)?;

    if !item.description.is_empty() {
        text_element(w, "summary", &item.description, Some("html"))?;
    }
    if !item.content.is_empty() {
        text_element(w, "content", &item.content, Some("html"))?;
    }

    if let Some(author) = &item.author {
        write(w, Event::Start(BytesStart::new("author")))?;
        text_element(w, "name", author.name.as_deref().unwrap_or_default(), None)?;
        if let Some(email) = &author.email {
            text_element(w, "email", email, None)?;
        }
        write(w, Event::End(BytesEnd::new("author")))?;
    }

    write(w, Event::End(BytesEnd::new("entry")))
}

fn text_element(w: &mut XmlWriter, name: &str, text: &str, kind: Option<&str>) -> Result<()> {
    let mut start = BytesStart::new(name);
    if let Some(kind) = kind {
        start.push_attribute(("type", kind));
    }
    write(w, Event::Start(start))?;
    write(w, Event::Text(BytesText::new(text)))?;
    write(w, Event::End(BytesEnd::new(name)))
}

fn write(w: &mut XmlWriter, event: Event<'_>) -> Result<()> {
    w.write_event(event)
        .map_err(|e| FeedmergeError::Render(e.to_string()))
}

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}
