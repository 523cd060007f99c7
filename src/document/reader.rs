use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    Txt,
    Markdown,
    Pdf,
    Docx,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "txt" | "text" => Some(DocumentFormat::Txt),
            "md" | "markdown" => Some(DocumentFormat::Markdown),
            "pdf" => Some(DocumentFormat::Pdf),
            "docx" | "doc" => Some(DocumentFormat::Docx),
            _ => None,
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentFormat::Txt => write!(f, "TXT"),
            DocumentFormat::Markdown => write!(f, "Markdown"),
            DocumentFormat::Pdf => write!(f, "PDF"),
            DocumentFormat::Docx => write!(f, "DOCX"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub format: Option<DocumentFormat>,
    pub characters: usize,
}

/// Text produced by a format-specific reader. A failed read carries an empty
/// text and an error message; callers must check `success` before analyzing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub name: String,
    pub text: String,
    pub success: bool,
    pub error: Option<String>,
    pub metadata: DocumentMetadata,
}

impl ParsedDocument {
    pub fn from_text(name: impl Into<String>, text: impl Into<String>, format: DocumentFormat) -> Self {
        let text = text.into();
        let characters = text.chars().count();
        Self {
            name: name.into(),
            text,
            success: true,
            error: None,
            metadata: DocumentMetadata {
                format: Some(format),
                characters,
            },
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: String::new(),
            success: false,
            error: Some(error.into()),
            metadata: DocumentMetadata::default(),
        }
    }
}

pub async fn read_document(path: impl AsRef<Path>) -> ParsedDocument {
    let path = path.as_ref();
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let format = match DocumentFormat::from_path(path) {
        Some(format) => format,
        None => {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("none");
            return ParsedDocument::failed(name, format!("Unsupported file format: {}", ext));
        }
    };

    match format {
        DocumentFormat::Txt | DocumentFormat::Markdown => match tokio::fs::read(path).await {
            Ok(bytes) => match String::from_utf8(bytes) {
                Ok(text) => {
                    tracing::debug!("Read {} ({} bytes)", path.display(), text.len());
                    ParsedDocument::from_text(name, text, format)
                }
                Err(e) => ParsedDocument::failed(name, format!("Error parsing {}: {}", format, e)),
            },
            Err(e) => ParsedDocument::failed(name, format!("Error reading {}: {}", path.display(), e)),
        },
        DocumentFormat::Pdf | DocumentFormat::Docx => ParsedDocument::failed(
            name,
            format!("{} text extraction is not supported; convert the document to TXT", format),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(DocumentFormat::from_path(Path::new("msa.TXT")), Some(DocumentFormat::Txt));
        assert_eq!(DocumentFormat::from_path(Path::new("sow.md")), Some(DocumentFormat::Markdown));
        assert_eq!(DocumentFormat::from_path(Path::new("nda.pdf")), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::from_path(Path::new("dpa.doc")), Some(DocumentFormat::Docx));
        assert_eq!(DocumentFormat::from_path(Path::new("contract")), None);
        assert_eq!(DocumentFormat::from_path(Path::new("contract.xlsx")), None);
    }

    #[tokio::test]
    async fn test_read_txt_document() {
        let path = std::env::temp_dir().join(format!("contractanalyzer-{}.txt", std::process::id()));
        tokio::fs::write(&path, "Party A and Party B agree.").await.unwrap();

        let doc = read_document(&path).await;
        tokio::fs::remove_file(&path).await.ok();

        assert!(doc.success);
        assert_eq!(doc.text, "Party A and Party B agree.");
        assert_eq!(doc.metadata.characters, 26);
        assert_eq!(doc.metadata.format, Some(DocumentFormat::Txt));
    }

    #[tokio::test]
    async fn test_unsupported_formats_fail_without_text() {
        let doc = read_document("agreement.pdf").await;
        assert!(!doc.success);
        assert!(doc.text.is_empty());
        assert!(doc.error.unwrap().contains("PDF"));

        let doc = read_document("agreement.xyz").await;
        assert!(!doc.success);
        assert!(doc.error.unwrap().contains("Unsupported file format: xyz"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let doc = read_document("/nonexistent/contract.txt").await;
        assert!(!doc.success);
        assert_eq!(doc.name, "contract.txt");
    }
}
