//! Document store: latest text and version of every open document.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};

use kousei_core::Snapshot;

use crate::conversion::position_to_offset;
use crate::error::StoreError;

/// Document content and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub uri: Url,
    pub version: i32,
    pub text: Arc<str>,
}

impl Document {
    /// Captures the current contents as an immutable snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.uri.clone(), self.version, Arc::clone(&self.text))
    }
}

/// Owner of all open documents.
///
/// Mutations take the write lock, so two writers never touch the same
/// document concurrently. Readers get clones of the immutable text.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: RwLock<HashMap<Url, Document>>,
}

impl DocumentStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly opened document.
    ///
    /// A repeated open of a document that is still open must carry a newer
    /// version; an older or equal one is rejected and leaves the stored
    /// contents untouched.
    pub fn open(
        &self,
        uri: Url,
        version: i32,
        text: impl Into<Arc<str>>,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write();
        if let Some(current) = documents.get(&uri)
            && version <= current.version
        {
            return Err(StoreError::StaleUpdateIgnored {
                uri,
                version,
                current: current.version,
            });
        }

        let document = Document {
            uri: uri.clone(),
            version,
            text: text.into(),
        };
        documents.insert(uri, document);
        Ok(())
    }

    /// Applies content changes in order and records the new version.
    ///
    /// A change with a full range replaces the text; a ranged change patches
    /// it. Versions that do not advance are rejected and leave the document
    /// untouched.
    pub fn apply_change(
        &self,
        uri: &Url,
        version: i32,
        changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Result<Snapshot, StoreError> {
        let mut documents = self.documents.write();
        let document = documents
            .get_mut(uri)
            .ok_or_else(|| StoreError::UnknownDocument(uri.clone()))?;

        if version <= document.version {
            return Err(StoreError::StaleUpdateIgnored {
                uri: uri.clone(),
                version,
                current: document.version,
            });
        }

        let mut text = document.text.to_string();
        for change in changes {
            match change.range {
                None => text = change.text,
                Some(range) => {
                    let start = position_to_offset(range.start, &text);
                    let end = position_to_offset(range.end, &text);
                    match (start, end) {
                        (Some(start), Some(end)) if start <= end => {
                            text.replace_range(start..end, &change.text);
                        }
                        _ => return Err(StoreError::InvalidRange(uri.clone())),
                    }
                }
            }
        }

        document.version = version;
        document.text = text.into();
        Ok(document.snapshot())
    }

    /// Forgets a document. Returns false if it was not open.
    pub fn close(&self, uri: &Url) -> bool {
        self.documents.write().remove(uri).is_some()
    }

    /// Returns the current document.
    pub fn get(&self, uri: &Url) -> Result<Document, StoreError> {
        self.documents
            .read()
            .get(uri)
            .cloned()
            .ok_or_else(|| StoreError::UnknownDocument(uri.clone()))
    }

    /// Captures the current document as a snapshot.
    pub fn snapshot(&self, uri: &Url) -> Result<Snapshot, StoreError> {
        self.get(uri).map(|document| document.snapshot())
    }

    /// Returns the current version, if the document is open.
    pub fn version(&self, uri: &Url) -> Option<i32> {
        self.documents.read().get(uri).map(|document| document.version)
    }

    /// Whether `snapshot` still describes the stored document.
    ///
    /// Both the version and the text must match: a close and reopen can
    /// reuse a version number for different contents.
    pub fn is_current(&self, snapshot: &Snapshot) -> bool {
        self.documents
            .read()
            .get(&snapshot.uri)
            .is_some_and(|document| {
                document.version == snapshot.version
                    && Arc::ptr_eq(&document.text, &snapshot.text)
            })
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.read().contains_key(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tower_lsp::lsp_types::{Position, Range};

    fn uri() -> Url {
        Url::parse("file:///tmp/thesis.tex").unwrap()
    }

    fn full(text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: text.to_string(),
        }
    }

    fn patch(start: (u32, u32), end: (u32, u32), text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range::new(
                Position::new(start.0, start.1),
                Position::new(end.0, end.1),
            )),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_open_and_get() {
        let store = DocumentStore::new();
        store.open(uri(), 1, "Hello world.").unwrap();

        let document = store.get(&uri()).unwrap();
        assert_eq!(document.version, 1);
        assert_eq!(&*document.text, "Hello world.");
        assert_eq!(store.version(&uri()), Some(1));
    }

    #[test]
    fn test_get_unknown_document() {
        let store = DocumentStore::new();
        assert_eq!(
            store.get(&uri()),
            Err(StoreError::UnknownDocument(uri()))
        );
        assert!(store.snapshot(&uri()).is_err());
        assert_eq!(store.version(&uri()), None);
    }

    #[test]
    fn test_full_change_replaces_text() {
        let store = DocumentStore::new();
        store.open(uri(), 1, "Hello world.").unwrap();

        let snapshot = store.apply_change(&uri(), 2, vec![full("Bye.")]).unwrap();
        assert_eq!(snapshot.version, 2);
        assert_eq!(&*snapshot.text, "Bye.");
    }

    #[test]
    fn test_stale_change_is_ignored() {
        let store = DocumentStore::new();
        store.open(uri(), 1, "one").unwrap();
        store.apply_change(&uri(), 3, vec![full("three")]).unwrap();

        for stale in [2, 3] {
            let err = store
                .apply_change(&uri(), stale, vec![full("stale")])
                .unwrap_err();
            assert_eq!(
                err,
                StoreError::StaleUpdateIgnored {
                    uri: uri(),
                    version: stale,
                    current: 3
                }
            );
        }
        assert_eq!(&*store.get(&uri()).unwrap().text, "three");
    }

    #[test]
    fn test_stale_reopen_is_ignored() {
        let store = DocumentStore::new();
        store.open(uri(), 1, "one").unwrap();
        store.apply_change(&uri(), 5, vec![full("five")]).unwrap();

        let err = store.open(uri(), 2, "old").unwrap_err();
        assert_eq!(
            err,
            StoreError::StaleUpdateIgnored {
                uri: uri(),
                version: 2,
                current: 5
            }
        );
        let document = store.get(&uri()).unwrap();
        assert_eq!(document.version, 5);
        assert_eq!(&*document.text, "five");

        store.open(uri(), 6, "six").unwrap();
        assert_eq!(&*store.get(&uri()).unwrap().text, "six");
    }

    #[test]
    fn test_reopen_after_close_may_restart_versions() {
        let store = DocumentStore::new();
        store.open(uri(), 5, "five").unwrap();
        store.close(&uri());

        store.open(uri(), 1, "one").unwrap();
        assert_eq!(store.version(&uri()), Some(1));
    }

    #[test]
    fn test_is_current() {
        let store = DocumentStore::new();
        store.open(uri(), 1, "first").unwrap();
        let snapshot = store.snapshot(&uri()).unwrap();
        assert!(store.is_current(&snapshot));

        store.close(&uri());
        assert!(!store.is_current(&snapshot));

        store.open(uri(), 1, "second").unwrap();
        assert_eq!(store.version(&uri()), Some(snapshot.version));
        assert!(!store.is_current(&snapshot));
        assert!(store.is_current(&store.snapshot(&uri()).unwrap()));
    }

    #[test]
    fn test_incremental_changes_apply_in_order() {
        let store = DocumentStore::new();
        store.open(uri(), 1, "Hi %note\nBob").unwrap();

        let snapshot = store
            .apply_change(
                &uri(),
                2,
                vec![patch((0, 3), (0, 8), ""), patch((1, 0), (1, 3), "Alice")],
            )
            .unwrap();
        assert_eq!(&*snapshot.text, "Hi \nAlice");
    }

    #[test]
    fn test_invalid_range_leaves_document_untouched() {
        let store = DocumentStore::new();
        store.open(uri(), 1, "one line").unwrap();

        let err = store
            .apply_change(&uri(), 2, vec![patch((5, 0), (5, 1), "x")])
            .unwrap_err();
        assert_eq!(err, StoreError::InvalidRange(uri()));
        assert_eq!(store.version(&uri()), Some(1));
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_changes() {
        let store = DocumentStore::new();
        store.open(uri(), 1, "before").unwrap();
        let snapshot = store.snapshot(&uri()).unwrap();

        store.apply_change(&uri(), 2, vec![full("after")]).unwrap();
        assert_eq!(&*snapshot.text, "before");
        assert_eq!(snapshot.version, 1);
    }

    #[test]
    fn test_close() {
        let store = DocumentStore::new();
        store.open(uri(), 1, "text").unwrap();

        assert!(store.close(&uri()));
        assert!(!store.close(&uri()));
        assert!(!store.contains(&uri()));
        assert!(matches!(
            store.apply_change(&uri(), 2, vec![full("x")]),
            Err(StoreError::UnknownDocument(_))
        ));
    }
}
