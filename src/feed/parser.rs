use quick_xml::events::Event;
use serde::Deserialize;
use thiserror::Error;

/// The body could not be decoded as an RSS 2.0 document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid RSS document: {0}")]
    Xml(#[from] quick_xml::DeError),

    /// Only UTF-8 bodies are decoded; other charsets are refused rather than
    /// guessed at.
    #[error("unsupported document encoding {0:?}")]
    UnsupportedEncoding(String),

    #[error("document is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Channel and items exactly as they appear in the feed.
///
/// Text fields are XML-unescaped by the decoder but HTML entities inside
/// them (`&amp;amp;`, `&#8217;` written as text) are left for the ingestion
/// step. `pub_date` is the raw string; see [`super::normalize_timestamp`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeedDocument {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RawItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

#[derive(Deserialize)]
struct RssEnvelope {
    channel: RssChannel,
}

// The decoder drops namespace prefixes, so `itunes:title` or
// `media:description` arrive under the same name as the plain element.
// Every text field is a list; the first non-empty value wins.
#[derive(Deserialize)]
struct RssChannel {
    #[serde(default, rename = "title")]
    titles: Vec<String>,
    #[serde(default, rename = "link")]
    links: Vec<String>,
    #[serde(default, rename = "description")]
    descriptions: Vec<String>,
    #[serde(default, rename = "item")]
    items: Vec<RssItem>,
}

#[derive(Deserialize)]
struct RssItem {
    #[serde(default, rename = "title")]
    titles: Vec<String>,
    #[serde(default, rename = "link")]
    links: Vec<String>,
    #[serde(default, rename = "description")]
    descriptions: Vec<String>,
    #[serde(default, rename = "pubDate")]
    pub_dates: Vec<String>,
}

impl From<RssItem> for RawItem {
    fn from(item: RssItem) -> Self {
        RawItem {
            title: first_text(item.titles),
            link: first_text(item.links),
            description: first_text(item.descriptions),
            pub_date: first_text(item.pub_dates),
        }
    }
}

fn first_text(values: Vec<String>) -> String {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
        .unwrap_or_default()
}

/// Encoding named in the `<?xml ... ?>` declaration, if any.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let mut reader = quick_xml::Reader::from_reader(bytes);
    loop {
        match reader.read_event() {
            Ok(Event::Decl(decl)) => {
                return match decl.encoding() {
                    Some(Ok(enc)) => Some(String::from_utf8_lossy(&enc).into_owned()),
                    _ => None,
                };
            }
            Ok(Event::Text(_)) => continue,
            _ => return None,
        }
    }
}

/// Decodes an RSS 2.0 body. Unknown elements and attributes are ignored.
pub fn parse_feed(bytes: &[u8]) -> Result<RawFeedDocument, ParseError> {
    if let Some(encoding) = declared_encoding(bytes) {
        let utf8_compatible = ["utf-8", "utf8", "us-ascii"]
            .iter()
            .any(|name| encoding.eq_ignore_ascii_case(name));
        if !utf8_compatible {
            return Err(ParseError::UnsupportedEncoding(encoding));
        }
    }

    let text = std::str::from_utf8(bytes)?;
    let envelope: RssEnvelope = quick_xml::de::from_str(text)?;
    let channel = envelope.channel;

    Ok(RawFeedDocument {
        title: first_text(channel.titles),
        link: first_text(channel.links),
        description: first_text(channel.descriptions),
        items: channel.items.into_iter().map(RawItem::from).collect(),
    })
}
