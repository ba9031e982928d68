//! ComicInfo metadata document
//!
//! The `ComicInfo.xml` entry carried by most comic archives. Only the
//! fields the library tracks are mapped; unknown elements are ignored.

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical entry name of the metadata document
pub const COMIC_INFO_ENTRY: &str = "ComicInfo.xml";

/// Root element name of the metadata document
const COMIC_INFO_ROOT: &str = "ComicInfo";

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Error)]
pub enum ComicInfoError {
    #[error("Document is not UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Root element is {0:?}, expected ComicInfo")]
    WrongRoot(Option<String>),

    #[error("Malformed ComicInfo: {0}")]
    Parse(#[from] quick_xml::DeError),

    #[error("Cannot serialize ComicInfo: {0}")]
    Serialize(String),
}

/// Parsed ComicInfo fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComicInfo {
    #[serde(rename = "Title", default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "Series", default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(rename = "Number", default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(rename = "Volume", default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(rename = "Summary", default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(rename = "Notes", default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "Publisher", default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(rename = "Year", default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(rename = "Month", default, skip_serializing_if = "Option::is_none")]
    pub month: Option<i32>,
    #[serde(rename = "Writer", default, skip_serializing_if = "Option::is_none")]
    pub writer: Option<String>,
    #[serde(rename = "Penciller", default, skip_serializing_if = "Option::is_none")]
    pub penciller: Option<String>,
    #[serde(rename = "Web", default, skip_serializing_if = "Option::is_none")]
    pub web: Option<String>,
    #[serde(rename = "PageCount", default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
}

impl ComicInfo {
    /// Parse a ComicInfo document
    pub fn parse(bytes: &[u8]) -> Result<Self, ComicInfoError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let root = root_element(bytes);
        if root.as_deref() != Some(COMIC_INFO_ROOT) {
            return Err(ComicInfoError::WrongRoot(root));
        }

        let text = std::str::from_utf8(bytes)?;
        Ok(quick_xml::de::from_str(text)?)
    }

    /// Read the known fields of a ComicInfo document one at a time
    ///
    /// Values that do not fit their field's type are dropped instead of
    /// failing the whole document.
    pub fn parse_fields(bytes: &[u8]) -> Self {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut info = ComicInfo::default();
        let mut depth = 0usize;
        let mut field: Option<String> = None;
        let mut text = String::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    depth += 1;
                    if depth == 2 {
                        field = Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                        text.clear();
                    }
                }
                Ok(Event::Text(e)) if depth == 2 => {
                    if let Ok(value) = e.unescape() {
                        text.push_str(&value);
                    }
                }
                Ok(Event::CData(e)) if depth == 2 => {
                    text.push_str(&String::from_utf8_lossy(&e));
                }
                Ok(Event::End(_)) => {
                    if depth == 2 {
                        if let Some(name) = field.take() {
                            info.set_field(&name, text.trim());
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
            buf.clear();
        }
        info
    }

    fn set_field(&mut self, name: &str, value: &str) {
        let text = || Some(value.to_string());
        match name {
            "Title" => self.title = text(),
            "Series" => self.series = text(),
            "Number" => self.number = text(),
            "Volume" => self.volume = text(),
            "Summary" => self.summary = text(),
            "Notes" => self.notes = text(),
            "Publisher" => self.publisher = text(),
            "Year" => self.year = value.parse().ok(),
            "Month" => self.month = value.parse().ok(),
            "Writer" => self.writer = text(),
            "Penciller" => self.penciller = text(),
            "Web" => self.web = text(),
            "PageCount" => self.page_count = value.parse().ok(),
            _ => {}
        }
    }

    /// Serialize as a standalone ComicInfo document
    pub fn to_xml(&self) -> Result<Vec<u8>, ComicInfoError> {
        let body = quick_xml::se::to_string_with_root(COMIC_INFO_ROOT, self)
            .map_err(|e| ComicInfoError::Serialize(e.to_string()))?;
        Ok(format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n{}", body).into_bytes())
    }
}

/// Metadata document as read from an archive
///
/// The raw bytes are kept so an unmodified comic writes the document back
/// exactly as it was read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataDocument {
    /// Entry name in the source archive
    pub entry_name: String,
    #[serde(skip)]
    pub raw: Vec<u8>,
    pub info: ComicInfo,
}

impl MetadataDocument {
    /// Bytes to write back into an archive
    ///
    /// The original bytes when they are still held, otherwise a fresh
    /// serialization of the parsed fields.
    pub fn content(&self) -> Result<Vec<u8>, ComicInfoError> {
        if self.raw.is_empty() {
            self.info.to_xml()
        } else {
            Ok(self.raw.clone())
        }
    }
}

/// Local name of the first element in an XML document
fn root_element(bytes: &[u8]) -> Option<String> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Some(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<ComicInfo xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <Title>The Beginning</Title>
  <Series>Example Comics</Series>
  <Number>1</Number>
  <Volume>2020</Volume>
  <Year>2020</Year>
  <Month>7</Month>
  <Publisher>Example Press</Publisher>
  <PageCount>2</PageCount>
  <AgeRating>Teen</AgeRating>
</ComicInfo>"#;

    #[test]
    fn test_parse_sample() {
        let info = ComicInfo::parse(SAMPLE.as_bytes()).unwrap();
        assert_eq!(info.title.as_deref(), Some("The Beginning"));
        assert_eq!(info.series.as_deref(), Some("Example Comics"));
        assert_eq!(info.number.as_deref(), Some("1"));
        assert_eq!(info.year, Some(2020));
        assert_eq!(info.month, Some(7));
        assert_eq!(info.page_count, Some(2));
        assert!(info.writer.is_none());
    }

    #[test]
    fn test_parse_with_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"<ComicInfo><Series>X</Series></ComicInfo>");
        let info = ComicInfo::parse(&bytes).unwrap();
        assert_eq!(info.series.as_deref(), Some("X"));
    }

    #[test]
    fn test_other_xml_is_rejected() {
        let result = ComicInfo::parse(b"<?xml version=\"1.0\"?><rss><channel/></rss>");
        match result {
            Err(ComicInfoError::WrongRoot(Some(root))) => assert_eq!(root, "rss"),
            other => panic!("Expected WrongRoot, got {:?}", other),
        }
    }

    #[test]
    fn test_serialized_document_parses_back() {
        let info = ComicInfo {
            series: Some("Example Comics".to_string()),
            number: Some("3".to_string()),
            year: Some(2021),
            ..Default::default()
        };

        let bytes = info.to_xml().unwrap();
        assert!(bytes.starts_with(b"<?xml"));
        assert_eq!(ComicInfo::parse(&bytes).unwrap(), info);
    }

    #[test]
    fn test_document_content_prefers_raw_bytes() {
        let document = MetadataDocument {
            entry_name: COMIC_INFO_ENTRY.to_string(),
            raw: SAMPLE.as_bytes().to_vec(),
            info: ComicInfo::default(),
        };
        assert_eq!(document.content().unwrap(), SAMPLE.as_bytes());
    }

    #[test]
    fn test_fields_read_past_bad_value() {
        let bytes = b"<ComicInfo><Series>Delta</Series><Year>unknown</Year><Month> 7 </Month>\
            <Pages><Page Image=\"0\"/></Pages><Notes><![CDATA[a & b]]></Notes></ComicInfo>";

        assert!(matches!(ComicInfo::parse(bytes), Err(ComicInfoError::Parse(_))));

        let info = ComicInfo::parse_fields(bytes);
        assert_eq!(info.series.as_deref(), Some("Delta"));
        assert_eq!(info.year, None);
        assert_eq!(info.month, Some(7));
        assert_eq!(info.notes.as_deref(), Some("a & b"));
        assert!(info.title.is_none());
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(ComicInfo::parse(b"\x00\x01\x02").is_err());
    }
}
