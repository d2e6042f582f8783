use std::path::Path;

use serde::{Deserialize, Serialize};

/// Extensions a document name may carry, and the kind each one implies.
pub const ALLOWED_EXTENSIONS: [(&str, DocumentKind); 2] = [
    ("txt", DocumentKind::PlainText),
    ("md", DocumentKind::Markup),
];

/// How a document's content is presented, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    PlainText,
    Markup,
}

impl DocumentKind {
    /// Infer the kind from a document name. Returns `None` when the
    /// extension is missing or not in the allow-list.
    pub fn from_name(name: &str) -> Option<Self> {
        let ext = extension(name)?;
        ALLOWED_EXTENSIONS
            .iter()
            .find(|(allowed, _)| *allowed == ext)
            .map(|(_, kind)| *kind)
    }

    /// Content type of the representation served for this kind.
    pub fn content_type(&self) -> &'static str {
        match self {
            DocumentKind::PlainText => "text/plain; charset=utf-8",
            DocumentKind::Markup => "text/html; charset=utf-8",
        }
    }
}

/// Extension of a document name, without the dot.
///
/// Hidden names like `.txt` have no extension.
pub fn extension(name: &str) -> Option<&str> {
    Path::new(name).extension().and_then(|ext| ext.to_str())
}

/// Whether `name` can address a document: a single flat file name that is
/// not hidden and carries an allowed extension.
pub fn is_document_name(name: &str) -> bool {
    is_flat_name(name) && DocumentKind::from_name(name).is_some()
}

/// A single path component that cannot escape the storage directory.
pub(crate) fn is_flat_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\', '\0'])
}

/// A stored document with its inferred kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub kind: DocumentKind,
    pub content: String,
}

impl Document {
    /// Build a document, inferring the kind from its name.
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let kind = DocumentKind::from_name(&name)?;
        Some(Self {
            name,
            kind,
            content: content.into(),
        })
    }

    /// The representation served to viewers: markup is rendered to HTML,
    /// plain text is passed through untouched.
    pub fn render(&self) -> RenderedDocument {
        let body = match self.kind {
            DocumentKind::PlainText => self.content.clone(),
            DocumentKind::Markup => crate::markdown::render(&self.content),
        };
        RenderedDocument {
            name: self.name.clone(),
            kind: self.kind,
            content_type: self.kind.content_type(),
            body,
        }
    }
}

/// A document prepared for viewing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDocument {
    pub name: String,
    pub kind: DocumentKind,
    pub content_type: &'static str,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_name() {
        assert_eq!(DocumentKind::from_name("notes.txt"), Some(DocumentKind::PlainText));
        assert_eq!(DocumentKind::from_name("about.md"), Some(DocumentKind::Markup));
        assert_eq!(DocumentKind::from_name("data.json"), None);
        assert_eq!(DocumentKind::from_name("README"), None);
        assert_eq!(DocumentKind::from_name("SHOUT.MD"), None);
        assert_eq!(DocumentKind::from_name(".txt"), None);
    }

    #[test]
    fn test_every_allowed_extension_names_a_document() {
        for (ext, kind) in ALLOWED_EXTENSIONS {
            let name = format!("file.{}", ext);
            assert_eq!(DocumentKind::from_name(&name), Some(kind));
            assert!(is_document_name(&name));
        }
    }

    #[test]
    fn test_is_document_name() {
        assert!(is_document_name("changes.txt"));
        assert!(is_document_name("two words.md"));
        assert!(!is_document_name("../secret.txt"));
        assert!(!is_document_name("sub/dir.md"));
        assert!(!is_document_name(".hidden.md"));
        assert!(!is_document_name(""));
    }

    #[test]
    fn test_plain_text_is_not_rendered() {
        let doc = Document::new("notes.txt", "# not a heading").unwrap();
        let rendered = doc.render();
        assert_eq!(rendered.body, "# not a heading");
        assert_eq!(rendered.content_type, "text/plain; charset=utf-8");
    }

    #[test]
    fn test_markup_is_rendered() {
        let doc = Document::new("about.md", "# Heading").unwrap();
        let rendered = doc.render();
        assert!(rendered.body.contains("<h1>Heading</h1>"));
        assert_eq!(rendered.kind, DocumentKind::Markup);
    }
}
