//! Workspace state management
//!
//! Tracks open documents, the context each one is edited in, and one
//! registry snapshot per (context, language).

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tower_lsp::lsp_types::Url;
use tracing::{debug, info, warn};

use super::analysis::document::DocumentState;
use super::analysis::language::{LanguageKind, LanguageProfile};
use super::engine::Engine;
use crate::catalog::CatalogSource;
use crate::config::{Settings, SettingsError};
use crate::registry::Registry;

/// Settings, language profiles, and the catalog source shared by every
/// workspace a server process creates.
#[derive(Clone)]
pub struct WorkspaceConfig {
    pub settings: Arc<Settings>,
    pub expression: Arc<LanguageProfile>,
    pub sentence: Arc<LanguageProfile>,
    pub source: Arc<dyn CatalogSource>,
}

impl WorkspaceConfig {
    /// Build both language profiles from `settings`.
    pub fn new(settings: Settings, source: Arc<dyn CatalogSource>) -> Result<Self, SettingsError> {
        Ok(Self {
            expression: Arc::new(settings.profile(LanguageKind::Expression)?),
            sentence: Arc::new(settings.profile(LanguageKind::Sentence)?),
            settings: Arc::new(settings),
            source,
        })
    }

    pub fn profile(&self, kind: LanguageKind) -> Arc<LanguageProfile> {
        match kind {
            LanguageKind::Expression => Arc::clone(&self.expression),
            LanguageKind::Sentence => Arc::clone(&self.sentence),
        }
    }
}

type RegistryKey = (String, LanguageKind);

/// Per-connection state of the language server.
pub struct Workspace {
    config: WorkspaceConfig,
    /// Open documents, keyed by URI.
    pub documents: DashMap<Url, DocumentState>,
    /// Contexts chosen with `calcsense.switchContext`, keyed by URI.
    contexts: DashMap<Url, String>,
    /// Loaded registries. A failed load is never stored.
    registries: DashMap<RegistryKey, Arc<Registry>>,
    /// Bumped whenever registries are dropped. A fetch that started under an
    /// older generation is returned to its caller but not stored.
    generation: AtomicU64,
}

impl Workspace {
    pub fn new(config: WorkspaceConfig) -> Self {
        Self {
            config,
            documents: DashMap::new(),
            contexts: DashMap::new(),
            registries: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// The language of a document: the client's language id when it names
    /// one, otherwise the file extension, otherwise the expression language.
    pub fn language_for(&self, uri: &Url, language_id: Option<&str>) -> LanguageKind {
        language_id
            .and_then(LanguageKind::parse)
            .or_else(|| {
                self.config
                    .settings
                    .language_for_path(Path::new(uri.path()))
            })
            .unwrap_or(LanguageKind::Expression)
    }

    pub fn open_document(&self, uri: Url, version: i32, source: String, language_id: &str) {
        let language = self.language_for(&uri, Some(language_id));
        debug!(%uri, %language, "opened document");
        self.documents
            .insert(uri.clone(), DocumentState::new(uri, version, source, language));
    }

    /// Replace a document's text. Unknown documents are opened by extension.
    pub fn update_document(&self, uri: Url, version: i32, source: String) {
        if let Some(mut doc) = self.documents.get_mut(&uri) {
            doc.update(version, source);
            return;
        }

        let language = self.language_for(&uri, None);
        self.documents
            .insert(uri.clone(), DocumentState::new(uri, version, source, language));
    }

    pub fn remove_document(&self, uri: &Url) {
        self.documents.remove(uri);
        self.contexts.remove(uri);
        self.release_unused();
    }

    /// Get a document by URI.
    pub fn get_document(
        &self,
        uri: &Url,
    ) -> Option<dashmap::mapref::one::Ref<'_, Url, DocumentState>> {
        self.documents.get(uri)
    }

    /// The context a document is edited in.
    pub fn context_for(&self, uri: &Url) -> String {
        self.contexts
            .get(uri)
            .map(|c| c.value().clone())
            .unwrap_or_else(|| self.config.settings.catalog.default_context.clone())
    }

    /// Move a document to another context. The next request loads its
    /// registry; requests already running keep their snapshot.
    pub fn switch_context(&self, uri: Url, context: String) {
        info!(%uri, %context, "switching context");
        self.contexts.insert(uri, context);
        self.release_unused();
    }

    /// Drop the registries no open document is edited with.
    fn release_unused(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let in_use: HashSet<RegistryKey> = self
            .documents
            .iter()
            .map(|doc| (self.context_for(doc.key()), doc.language))
            .collect();

        let before = self.registries.len();
        self.registries.retain(|key, _| in_use.contains(key));
        let released = before - self.registries.len();
        if released > 0 {
            debug!(released, "released unused registries");
        }
    }

    /// Number of registries currently loaded.
    pub fn loaded_registries(&self) -> usize {
        self.registries.len()
    }

    /// The registry for a context, loading it on first use.
    ///
    /// A catalog that cannot be fetched is logged and answered with an empty
    /// registry. The failure is not remembered, so the next request retries.
    pub async fn registry(&self, context: &str, language: LanguageKind) -> Arc<Registry> {
        let key = (context.to_string(), language);
        if let Some(registry) = self.registries.get(&key) {
            return Arc::clone(registry.value());
        }

        let generation = self.generation.load(Ordering::SeqCst);

        match self.config.source.fetch(context).await {
            Ok(payload) => {
                let registry = Arc::new(payload.into_registry(&self.config.profile(language)));
                info!(%context, %language, "loaded catalog");

                // The shard stays locked from the check to the insert, so an
                // invalidation either sees the entry or bumps first.
                let entry = self.registries.entry(key);
                if self.generation.load(Ordering::SeqCst) == generation {
                    entry.insert(Arc::clone(&registry));
                } else {
                    debug!(%context, "catalog invalidated during fetch; not caching");
                }
                registry
            }
            Err(e) => {
                warn!(%context, error = %e, "catalog unavailable; using empty registry");
                Arc::new(Registry::empty())
            }
        }
    }

    /// Drop the loaded registries of a context so they are fetched again.
    /// Returns how many were dropped.
    pub fn invalidate(&self, context: &str) -> usize {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let before = self.registries.len();
        self.registries.retain(|(ctx, _), _| ctx != context);
        before - self.registries.len()
    }

    /// Drop every loaded registry.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.registries.clear();
    }

    /// An engine for the document's current context and language.
    pub async fn engine_for(&self, uri: &Url) -> Option<Engine> {
        let language = self.documents.get(uri)?.language;
        let context = self.context_for(uri);
        let registry = self.registry(&context, language).await;
        Some(Engine::new(self.config.profile(language), registry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        CatalogPayload, CatalogResult, MemoryCatalogSource, SymbolPayload,
    };
    use async_trait::async_trait;
    use tokio::sync::Notify;

    fn workspace(source: Arc<dyn CatalogSource>) -> Workspace {
        let config = WorkspaceConfig::new(Settings::default(), source).unwrap();
        Workspace::new(config)
    }

    /// Holds every fetch until `release` is notified.
    #[derive(Default)]
    struct GatedSource {
        catalogs: MemoryCatalogSource,
        started: Notify,
        release: Notify,
    }

    #[async_trait]
    impl CatalogSource for GatedSource {
        async fn fetch(&self, context: &str) -> CatalogResult<CatalogPayload> {
            let payload = self.catalogs.fetch(context).await;
            self.started.notify_one();
            self.release.notified().await;
            payload
        }
    }

    fn payload(variable: &str) -> CatalogPayload {
        CatalogPayload {
            variables: vec![SymbolPayload {
                name: variable.to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file:///work/{path}")).unwrap()
    }

    #[test]
    fn test_language_detection() {
        let ws = workspace(Arc::new(MemoryCatalogSource::new()));

        assert_eq!(ws.language_for(&uri("a.feature"), None), LanguageKind::Sentence);
        assert_eq!(ws.language_for(&uri("a.calc"), None), LanguageKind::Expression);
        assert_eq!(
            ws.language_for(&uri("a.txt"), Some("sentence")),
            LanguageKind::Sentence
        );
        assert_eq!(ws.language_for(&uri("a.txt"), Some("plaintext")), LanguageKind::Expression);
    }

    #[tokio::test]
    async fn test_registry_memoized_until_invalidated() {
        let source = Arc::new(MemoryCatalogSource::new());
        source.insert("default", payload("First"));
        let ws = workspace(source.clone());

        let first = ws.registry("default", LanguageKind::Expression).await;
        source.insert("default", payload("Second"));
        let cached = ws.registry("default", LanguageKind::Expression).await;
        assert!(Arc::ptr_eq(&first, &cached));

        assert_eq!(ws.invalidate("default"), 1);
        let reloaded = ws.registry("default", LanguageKind::Expression).await;
        assert!(reloaded.resolve_path("second").is_some());
        // The old snapshot is untouched
        assert!(first.resolve_path("first").is_some());
    }

    #[tokio::test]
    async fn test_failed_load_is_not_memoized() {
        let source = Arc::new(MemoryCatalogSource::new());
        let ws = workspace(source.clone());

        let missing = ws.registry("payroll", LanguageKind::Expression).await;
        assert!(missing.is_empty());

        source.insert("payroll", payload("Gross"));
        let loaded = ws.registry("payroll", LanguageKind::Expression).await;
        assert!(loaded.resolve_path("gross").is_some());
    }

    #[tokio::test]
    async fn test_switch_context() {
        let source = Arc::new(MemoryCatalogSource::new());
        source.insert("default", payload("Alpha"));
        source.insert("billing", payload("Invoice"));
        let ws = workspace(source.clone());

        let doc = uri("rule.calc");
        ws.open_document(doc.clone(), 1, "Return ".to_string(), "expression");

        let engine = ws.engine_for(&doc).await.unwrap();
        assert!(engine.registry().resolve_path("alpha").is_some());

        ws.switch_context(doc.clone(), "billing".to_string());
        let switched = ws.engine_for(&doc).await.unwrap();
        assert!(switched.registry().resolve_path("invoice").is_some());
        assert!(switched.registry().resolve_path("alpha").is_none());

        ws.remove_document(&doc);
        assert!(ws.engine_for(&doc).await.is_none());
        assert_eq!(ws.context_for(&doc), "default");
    }

    #[tokio::test]
    async fn test_registries_released_with_their_documents() {
        let source = Arc::new(MemoryCatalogSource::new());
        for context in ["default", "a", "b", "c"] {
            source.insert(context, payload("Value"));
        }
        let ws = workspace(source);

        let doc = uri("rule.calc");
        ws.open_document(doc.clone(), 1, "Return ".to_string(), "expression");
        ws.engine_for(&doc).await.unwrap();

        for context in ["a", "b", "c"] {
            ws.switch_context(doc.clone(), context.to_string());
            ws.engine_for(&doc).await.unwrap();
            assert_eq!(ws.loaded_registries(), 1);
        }

        ws.remove_document(&doc);
        assert_eq!(ws.loaded_registries(), 0);
    }

    #[tokio::test]
    async fn test_shared_registry_kept_while_in_use() {
        let source = Arc::new(MemoryCatalogSource::new());
        source.insert("default", payload("Value"));
        let ws = workspace(source);

        let first = uri("first.calc");
        let second = uri("second.calc");
        ws.open_document(first.clone(), 1, String::new(), "expression");
        ws.open_document(second.clone(), 1, String::new(), "expression");
        let engine = ws.engine_for(&first).await.unwrap();
        ws.engine_for(&second).await.unwrap();
        assert_eq!(ws.loaded_registries(), 1);

        ws.remove_document(&first);
        assert_eq!(ws.loaded_registries(), 1);
        let cached = ws.engine_for(&second).await.unwrap();
        assert!(std::ptr::eq(engine.registry(), cached.registry()));

        ws.remove_document(&second);
        assert_eq!(ws.loaded_registries(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_during_fetch_is_not_undone() {
        let source = Arc::new(GatedSource::default());
        source.catalogs.insert("default", payload("Old"));
        let ws = workspace(source.clone());

        let (stale, ()) = tokio::join!(ws.registry("default", LanguageKind::Expression), async {
            source.started.notified().await;
            source.catalogs.insert("default", payload("New"));
            ws.invalidate("default");
            source.release.notify_one();
        });

        // The request in flight keeps what it fetched, but it is not cached.
        assert!(stale.resolve_path("old").is_some());
        assert_eq!(ws.loaded_registries(), 0);

        source.release.notify_one();
        let fresh = ws.registry("default", LanguageKind::Expression).await;
        assert!(fresh.resolve_path("new").is_some());
        assert_eq!(ws.loaded_registries(), 1);
    }
}
