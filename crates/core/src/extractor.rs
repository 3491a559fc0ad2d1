use crate::error::ExtractError;
use crate::models::FileHandle;
use lopdf::Document as PdfDocument;
use tracing::warn;

pub const EXTRACTION_FAILED_PLACEHOLDER: &str = "Text extraction failed for this document.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub contents: Vec<String>,
    pub pages: u32,
}

impl Extraction {
    pub fn failed() -> Self {
        Self {
            contents: vec![EXTRACTION_FAILED_PLACEHOLDER.to_string()],
            pages: 0,
        }
    }
}

pub trait TextExtractor {
    fn extract_pdf(&self, bytes: &[u8]) -> Result<Extraction, ExtractError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl TextExtractor for LopdfExtractor {
    fn extract_pdf(&self, bytes: &[u8]) -> Result<Extraction, ExtractError> {
        let document =
            PdfDocument::load_mem(bytes).map_err(|error| ExtractError::PdfParse(error.to_string()))?;

        let mut contents = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| ExtractError::PdfParse(error.to_string()))?;

            contents.push(join_fragments(&text));
        }

        Ok(Extraction {
            pages: page_count(contents.len())?,
            contents,
        })
    }
}

fn page_count(pages: usize) -> Result<u32, ExtractError> {
    u32::try_from(pages)
        .map_err(|_| ExtractError::PdfParse(format!("page count {pages} does not fit in u32")))
}

/// Collapses the fragments of one page into a single space-joined line.
pub fn join_fragments(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// PDFs go through `extractor`, everything else is one page of UTF-8 text.
pub fn extract<E: TextExtractor + ?Sized>(
    extractor: &E,
    file: &FileHandle,
) -> Result<Extraction, ExtractError> {
    if file.is_pdf() {
        return extractor.extract_pdf(&file.bytes);
    }

    Ok(Extraction {
        contents: vec![String::from_utf8_lossy(&file.bytes).into_owned()],
        pages: 1,
    })
}

pub fn extract_or_placeholder<E: TextExtractor + ?Sized>(
    extractor: &E,
    file: &FileHandle,
) -> Extraction {
    match extract(extractor, file) {
        Ok(extraction) => extraction,
        Err(error) => {
            warn!(file = %file.name, %error, "text extraction failed, storing placeholder");
            Extraction::failed()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PDF_MIME_TYPE;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Builds a PDF with one page per entry of `page_texts`.
    fn build_pdf(page_texts: &[&str]) -> Vec<u8> {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids = Vec::new();
        for text in page_texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 700.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let encoded = content.encode().expect("content should encode");
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(Object::from(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("pdf should serialize");
        bytes
    }

    #[test]
    fn three_page_pdf_yields_three_pages() {
        let bytes = build_pdf(&["Alpha page", "Beta page", "Gamma page"]);
        let file = FileHandle::new("three.pdf", PDF_MIME_TYPE, bytes);

        let extraction = extract(&LopdfExtractor, &file).expect("pdf should parse");

        assert_eq!(extraction.pages, 3);
        assert_eq!(extraction.contents.len(), 3);
        assert!(extraction.contents[1].contains("Beta"));
    }

    #[test]
    fn unparseable_pdf_degrades_to_placeholder() {
        let file = FileHandle::new("broken.pdf", PDF_MIME_TYPE, b"%PDF-1.4\n%broken".to_vec());

        let extraction = extract_or_placeholder(&LopdfExtractor, &file);

        assert_eq!(extraction.pages, 0);
        assert_eq!(extraction.contents, vec![EXTRACTION_FAILED_PLACEHOLDER.to_string()]);
    }

    #[test]
    fn text_file_is_a_single_page() {
        let file = FileHandle::new("notes.txt", "text/plain", b"line one\nline two".to_vec());

        let extraction = extract(&LopdfExtractor, &file).expect("text should always extract");

        assert_eq!(extraction.pages, 1);
        assert_eq!(extraction.contents, vec!["line one\nline two".to_string()]);
    }

    #[test]
    fn page_count_accepts_values_within_u32() {
        assert_eq!(page_count(3).expect("small counts fit"), 3);
        assert!(matches!(
            page_count(u32::MAX as usize),
            Ok(count) if count == u32::MAX
        ));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn page_count_above_u32_is_a_parse_error() {
        let result = page_count(u32::MAX as usize + 1);
        assert!(matches!(result, Err(ExtractError::PdfParse(_))));
    }

    #[test]
    fn fragments_are_space_joined() {
        assert_eq!(join_fragments("Hello\nworld  \n again"), "Hello world again");
    }
}
