use std::io::{Cursor, Read, Seek};

use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;

use crate::extraction::ExtractionError;

/// Reads `word/document.xml` out of a DOCX archive and flattens it to text,
/// one line per paragraph. Table cells and tabs become spaces.
pub fn extract_text(content: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(content))
        .map_err(|e| ExtractionError::Docx(format!("not a valid DOCX archive: {e}")))?;

    let xml = read_document_xml(&mut archive)?;
    parse_document_xml(&xml)
}

fn read_document_xml<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<String, ExtractionError> {
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractionError::Docx(format!("missing word/document.xml: {e}")))?;

    let mut xml = String::new();
    entry
        .read_to_string(&mut xml)
        .map_err(|e| ExtractionError::Docx(format!("failed to read word/document.xml: {e}")))?;
    Ok(xml)
}

fn parse_document_xml(xml: &str) -> Result<String, ExtractionError> {
    let mut reader = Reader::from_str(xml);

    let mut text = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if e.local_name().as_ref() == b"t" {
                    in_text_element = true;
                }
            }
            Ok(Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"tab" => text.push(' '),
                b"br" | b"cr" => text.push('\n'),
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => text.push('\n'),
                b"tc" => text.push(' '),
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if in_text_element {
                    let decoded = e
                        .decode()
                        .map_err(|e| ExtractionError::Docx(format!("invalid text encoding: {e}")))?;
                    text.push_str(&decoded);
                }
            }
            // Entities arrive as their own events, between the text around them.
            Ok(Event::GeneralRef(r)) => {
                if in_text_element {
                    text.push_str(&resolve_reference(&r)?);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractionError::Docx(format!("XML parsing error: {e}")));
            }
            _ => {}
        }
    }

    Ok(text.trim().to_string())
}

/// `&#8226;` / `&#x2022;` and the five predefined XML entities. Anything else
/// is kept verbatim.
fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, ExtractionError> {
    if let Some(ch) = reference.resolve_char_ref().map_err(invalid_reference)? {
        return Ok(ch.to_string());
    }

    let name = reference.decode().map_err(invalid_reference)?;
    Ok(match resolve_predefined_entity(&name) {
        Some(resolved) => resolved.to_string(),
        None => format!("&{name};"),
    })
}

fn invalid_reference(e: impl std::fmt::Display) -> ExtractionError {
    ExtractionError::Docx(format!("invalid entity reference: {e}"))
}
