//! XML response deserialization for the storage REST APIs.

use quick_xml::events::Event;
use quick_xml::Reader;

/// Contents of a storage `<Error>` response body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    /// Parses an error body. Malformed or empty documents yield whatever was
    /// read before the failure.
    pub fn parse(xml: &str) -> Self {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut result = Self::default();
        let mut buf = Vec::new();
        let mut current_element: Option<String> = None;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    current_element = Some(String::from_utf8_lossy(e.name().as_ref()).to_string());
                }
                Ok(Event::End(_)) => {
                    current_element = None;
                }
                Ok(Event::Text(e)) => {
                    if let Some(ref elem) = current_element {
                        let text = match e.unescape() {
                            Ok(text) => text.trim().to_string(),
                            Err(_) => break,
                        };
                        match elem.as_str() {
                            "Code" if !text.is_empty() => result.code = Some(text),
                            "Message" if !text.is_empty() => result.message = Some(text),
                            _ => {}
                        }
                    }
                }
                Ok(Event::Eof) | Err(_) => break,
                _ => {}
            }
            buf.clear();
        }

        result
    }

    /// First line of the message; the service appends RequestId and Time lines.
    pub fn summary(&self) -> Option<&str> {
        self.message.as_deref().and_then(|m| m.lines().next())
    }
}
