pub mod apps_script;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;

use crate::base::types::Res;

// Traits.

/// Generic document store trait that clients must implement.
///
/// Filed reports are also published as a shared document through this seam.
#[async_trait]
pub trait GenericDocsClient: Send + Sync + 'static {
    /// Create a document titled `title` from Markdown.
    ///
    /// Returns the document link, or `None` when no document was created.
    async fn create_document(&self, title: &str, markdown: &str) -> Res<Option<String>>;
}

// Structs.

/// Document client for the application.
///
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct DocsClient {
    inner: Arc<dyn GenericDocsClient>,
}

impl Deref for DocsClient {
    type Target = dyn GenericDocsClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl DocsClient {
    pub fn new(inner: Arc<dyn GenericDocsClient>) -> Self {
        Self { inner }
    }

    /// A client that creates nothing, used when the export is not configured.
    pub fn disabled() -> Self {
        Self { inner: Arc::new(DisabledDocs) }
    }

    /// A client that fails every call with `reason`.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(UnavailableDocs { reason: reason.into() }),
        }
    }
}

struct DisabledDocs;

#[async_trait]
impl GenericDocsClient for DisabledDocs {
    async fn create_document(&self, _title: &str, _markdown: &str) -> Res<Option<String>> {
        Ok(None)
    }
}

struct UnavailableDocs {
    reason: String,
}

#[async_trait]
impl GenericDocsClient for UnavailableDocs {
    async fn create_document(&self, _title: &str, _markdown: &str) -> Res<Option<String>> {
        Err(anyhow::anyhow!("{}", self.reason))
    }
}
