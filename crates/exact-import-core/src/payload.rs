//! Two-stage decoding of the XML event payload behind an attachment link.
//!
//! The detail endpoint answers with an XML envelope whose `<body>` carries the
//! submitted document as *escaped* markup:
//!
//! ```text
//! <html><body>&lt;eExact&gt;&lt;GLTransactions&gt;
//!   &lt;GLTransaction entry="1001"&gt;&lt;Journal code="70"/&gt;...
//! </body></html>
//! ```
//!
//! 1. Envelope: parse the response, take the raw inner content of `<body>` and
//!    reverse one level of entity escaping, recovering the embedded markup.
//! 2. Markup: parse that markup and read `GLTransaction/@entry` and
//!    `Journal/@code`, producing the key `"<journal>-<entry>"`.
//!
//! A structurally valid document that lacks `<body>`, a transaction entry or a
//! journal code resolves to [`UNKNOWN_KEY`]. Malformed XML at either stage is a
//! [`PayloadError`]: it means the endpoint answered with something else
//! entirely and must not be hidden behind the sentinel.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;
use tracing::debug;

/// Key used when the payload lacks the expected fields.
pub const UNKNOWN_KEY: &str = "unknown";

/// Decoding failures that are not a simple missing field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    /// The response itself is not well-formed XML.
    #[error("Malformed event envelope: {0}")]
    Envelope(String),

    /// The unescaped body is not well-formed XML.
    #[error("Malformed embedded document: {0}")]
    Markup(String),
}

/// Fields recovered from the embedded document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PayloadFields {
    pub journal_code: Option<String>,
    pub entry: Option<String>,
}

impl PayloadFields {
    /// `"<journal>-<entry>"`, or [`UNKNOWN_KEY`] when either is missing.
    pub fn key(&self) -> String {
        match (&self.journal_code, &self.entry) {
            (Some(journal), Some(entry)) => format!("{}-{}", journal, entry),
            _ => UNKNOWN_KEY.to_string(),
        }
    }
}

/// Run both stages over an endpoint response.
pub fn decode_event_payload(response: &str) -> Result<String, PayloadError> {
    let Some(markup) = extract_body_markup(response)? else {
        debug!("Event payload has no <body>, using sentinel key");
        return Ok(UNKNOWN_KEY.to_string());
    };
    let fields = parse_embedded_fields(&markup)?;
    if fields.journal_code.is_none() || fields.entry.is_none() {
        debug!("Event payload is missing fields: {:?}", fields);
    }
    Ok(fields.key())
}

/// Stage 1: unescaped inner content of the first `<body>` element.
pub fn extract_body_markup(response: &str) -> Result<Option<String>, PayloadError> {
    let mut reader = Reader::from_str(response);
    let envelope_err = |e: quick_xml::Error| PayloadError::Envelope(e.to_string());

    loop {
        match reader.read_event().map_err(envelope_err)? {
            Event::Start(e) if e.local_name().as_ref() == b"body" => {
                let raw = reader.read_text(e.name()).map_err(envelope_err)?;
                let markup = quick_xml::escape::unescape_with(&raw, resolve_html_entity)
                    .map_err(|e| PayloadError::Envelope(e.to_string()))?;
                return Ok(Some(markup.into_owned()));
            }
            Event::Empty(e) if e.local_name().as_ref() == b"body" => {
                return Ok(Some(String::new()));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Stage 2: first `GLTransaction/@entry` and first `Journal/@code`.
pub fn parse_embedded_fields(markup: &str) -> Result<PayloadFields, PayloadError> {
    let mut reader = Reader::from_str(markup);
    let markup_err = |e: quick_xml::Error| PayloadError::Markup(e.to_string());

    let mut fields = PayloadFields::default();
    let mut seen_transaction = false;
    let mut seen_journal = false;

    loop {
        match reader.read_event().map_err(markup_err)? {
            Event::Start(e) | Event::Empty(e) => match e.local_name().as_ref() {
                b"GLTransaction" if !seen_transaction => {
                    seen_transaction = true;
                    fields.entry = attribute(&e, "entry")?;
                }
                b"Journal" if !seen_journal => {
                    seen_journal = true;
                    fields.journal_code = attribute(&e, "code")?;
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(fields)
}

fn attribute(element: &BytesStart<'_>, name: &str) -> Result<Option<String>, PayloadError> {
    let attr = element
        .try_get_attribute(name)
        .map_err(|e| PayloadError::Markup(e.to_string()))?;
    let Some(attr) = attr else {
        return Ok(None);
    };
    let value: Cow<'_, str> = attr
        .unescape_value()
        .map_err(|e| PayloadError::Markup(e.to_string()))?;
    let value = value.trim();
    Ok((!value.is_empty()).then(|| value.to_string()))
}

/// The few HTML entities a server-rendered envelope uses beyond XML's five.
fn resolve_html_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "nbsp" => Some("\u{a0}"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "amp" => Some("&"),
        "quot" => Some("\""),
        "apos" => Some("'"),
        _ => None,
    }
}
