//! Async document session
//!
//! The core is a pure function of document text; this module is the
//! collaborator-facing boundary around it: an async storage trait plus a
//! per-document session that serializes mutating operations into a FIFO
//! chain, so each mutation observes the text produced by the previous one.
//!
//! Read-only operations go straight to storage without joining the chain;
//! raced against an in-flight mutation they may observe a pre- or post-write
//! snapshot. Callers needing a consistent view read after their own
//! mutations complete.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::annotations::{AnnotationRecord, RecordInput, RecordPatch};
use crate::editor::{AnnotationEditor, InsertStrategy};
use crate::error::{SessionError, StoreError};
use crate::scanner;
use crate::validate::{self, Diagnostic};

/// Storage for one document's text
///
/// Implemented by the collaborator (plugin host, file store). Timeout and
/// retry policy for the underlying I/O live entirely on this side of the
/// boundary.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read the current authoritative text
    async fn load(&self) -> Result<String, StoreError>;

    /// Persist new text
    async fn save(&self, text: &str) -> Result<(), StoreError>;
}

/// In-memory [`DocumentStore`] for tests and embedders without real storage
#[derive(Default)]
pub struct MemoryStore {
    text: RwLock<String>,
}

impl MemoryStore {
    pub fn new(text: &str) -> Self {
        Self {
            text: RwLock::new(text.to_string()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self) -> Result<String, StoreError> {
        Ok(self.text.read().await.clone())
    }

    async fn save(&self, text: &str) -> Result<(), StoreError> {
        *self.text.write().await = text.to_string();
        Ok(())
    }
}

/// A session over one open document
///
/// Owns that document's write chain: mutating calls queue on a fair lock and
/// execute strictly one at a time, in call order. Every open document gets
/// its own session, so one document's writes never serialize another's.
/// There is no mid-flight cancellation: once a mutation starts computing its
/// splice it runs to completion (success or a clean no-op failure) before
/// the chain admits the next call.
pub struct DocumentSession<S> {
    store: S,
    editor: AnnotationEditor,
    write_chain: Mutex<()>,
}

impl<S: DocumentStore> DocumentSession<S> {
    /// Session with the default editor
    pub fn new(store: S) -> Self {
        Self::with_editor(store, AnnotationEditor::new())
    }

    /// Session with a custom editor (template, render config)
    pub fn with_editor(store: S, editor: AnnotationEditor) -> Self {
        Self {
            store,
            editor,
            write_chain: Mutex::new(()),
        }
    }

    /// Direct access to the underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Parse the current text into an id-to-record map
    pub async fn annotations(&self) -> Result<HashMap<String, AnnotationRecord>, SessionError> {
        let text = self.store.load().await?;
        Ok(scanner::parse(&text))
    }

    /// Report structural defects in the current text
    pub async fn diagnostics(&self) -> Result<Vec<Diagnostic>, SessionError> {
        let text = self.store.load().await?;
        Ok(validate::validate(&text))
    }

    /// Insert a new annotation block
    pub async fn insert(
        &self,
        input: &RecordInput,
        strategy: InsertStrategy,
    ) -> Result<(), SessionError> {
        let _chain = self.write_chain.lock().await;
        let text = self.store.load().await?;
        let next = self.editor.insert(&text, input, strategy)?;
        self.store.save(&next).await?;
        Ok(())
    }

    /// Update the block with the given id
    pub async fn update(&self, id: &str, patch: &RecordPatch) -> Result<(), SessionError> {
        let _chain = self.write_chain.lock().await;
        let text = self.store.load().await?;
        let next = self.editor.update(&text, id, patch)?;
        self.store.save(&next).await?;
        Ok(())
    }

    /// Remove the block with the given id
    pub async fn remove(&self, id: &str) -> Result<(), SessionError> {
        let _chain = self.write_chain.lock().await;
        let text = self.store.load().await?;
        let next = self.editor.remove(&text, id)?;
        self.store.save(&next).await?;
        Ok(())
    }
}
