use crate::extraction::ExtractionError;

/// Extracts the text layer of a PDF. Scanned PDFs without a text layer come
/// back empty, which the worker records as a failure.
pub fn extract_text(content: &[u8]) -> Result<String, ExtractionError> {
    let raw = pdf_extract::extract_text_from_mem(content)
        .map_err(|e| ExtractionError::Pdf(format!("{e:?}")))?;
    Ok(tidy(&raw))
}

/// pdf-extract pads lines with spaces and emits long runs of blank lines.
/// Collapse them so the AI prompt is not mostly whitespace.
fn tidy(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0;

    for line in raw.lines() {
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim().to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object, Stream};

    /// Builds a one-page PDF with a Helvetica text layer, one `Tj` per line.
    pub(crate) fn build_pdf(lines: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");

        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut content = String::from("BT /F1 12 Tf 72 720 Td 14 TL\n");
        for line in lines {
            content.push_str(&format!("({line}) Tj T*\n"));
        }
        content.push_str("ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_text_layer_is_extracted() {
        let content = build_pdf(&["Jane Doe", "Senior Rust Engineer", "jane@example.com"]);
        let text = extract_text(&content).unwrap();

        assert!(text.contains("Jane Doe"), "{text:?}");
        assert!(text.contains("Senior Rust Engineer"), "{text:?}");
        assert!(text.contains("jane@example.com"), "{text:?}");
        assert!(text.find("Jane").unwrap() < text.find("Senior").unwrap());
        assert!(!text.starts_with(char::is_whitespace));
    }

    #[test]
    fn test_pdf_without_text_layer_is_empty() {
        let content = build_pdf(&[]);
        assert_eq!(extract_text(&content).unwrap(), "");
    }

    #[test]
    fn test_tidy_collapses_blank_runs() {
        let raw = "\n\nJane Doe   \n\n\n\nSenior Engineer\n   \n";
        assert_eq!(tidy(raw), "Jane Doe\n\nSenior Engineer");
    }

    #[test]
    fn test_tidy_of_whitespace_is_empty() {
        assert_eq!(tidy(" \n\t\n  "), "");
    }

    #[test]
    fn test_garbage_bytes_fail() {
        let result = extract_text(b"%PDF-1.4 truncated");
        assert!(matches!(result, Err(ExtractionError::Pdf(_))));
    }
}
