//! LSP Backend - implements tower_lsp::LanguageServer
//!
//! Completion and hover for calculation expressions and scenario sentences.

use serde_json::Value;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info};

use super::engine::Engine;
use super::workspace::{Workspace, WorkspaceConfig};

/// Command that moves a document to another context: `[uri, context]`.
pub const SWITCH_CONTEXT_COMMAND: &str = "calcsense.switchContext";

/// Command that drops cached catalogs: `[context]`, or no argument for all.
pub const RELOAD_CATALOG_COMMAND: &str = "calcsense.reloadCatalog";

/// The LSP backend state.
pub struct LspBackend {
    /// The LSP client for sending notifications/requests back to the editor.
    client: Client,
    /// Documents, contexts, and registries of this connection.
    workspace: Workspace,
}

impl LspBackend {
    pub fn new(client: Client, config: WorkspaceConfig) -> Self {
        Self {
            client,
            workspace: Workspace::new(config),
        }
    }

    /// Get a reference to the workspace.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    fn switch_context(&self, arguments: &[Value]) -> Result<Option<Value>> {
        let (Some(uri), Some(context)) = (
            arguments.first().and_then(Value::as_str),
            arguments.get(1).and_then(Value::as_str),
        ) else {
            return Err(Error::invalid_params("expected [uri, context]"));
        };

        let uri = Url::parse(uri).map_err(|e| Error::invalid_params(e.to_string()))?;
        self.workspace.switch_context(uri, context.to_string());
        Ok(None)
    }

    fn reload_catalog(&self, arguments: &[Value]) -> Result<Option<Value>> {
        match arguments.first().and_then(Value::as_str) {
            Some(context) => {
                let dropped = self.workspace.invalidate(context);
                info!(%context, dropped, "catalog reload requested");
            }
            None => {
                self.workspace.invalidate_all();
                info!("reload of all catalogs requested");
            }
        }
        Ok(None)
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for LspBackend {
    async fn initialize(&self, _params: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                // Full document sync - we get the entire document on each change
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(vec![
                        ".".to_string(),  // Member access
                        "'".to_string(),  // Quoted references
                        "(".to_string(),  // Aggregate arguments
                        " ".to_string(),  // After keywords and operators
                    ]),
                    resolve_provider: Some(true),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: vec![
                        SWITCH_CONTEXT_COMMAND.to_string(),
                        RELOAD_CATALOG_COMMAND.to_string(),
                    ],
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "calcsense".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "calcsense language server initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.workspace
            .open_document(doc.uri, doc.version, doc.text, &doc.language_id);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // With FULL sync, we get the entire document content
        if let Some(change) = params.content_changes.into_iter().last() {
            self.workspace.update_document(uri, version, change.text);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        self.workspace.remove_document(&params.text_document.uri);
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let trigger = params
            .context
            .and_then(|c| c.trigger_character)
            .and_then(|t| t.chars().next());

        let Some(engine) = self.workspace.engine_for(uri).await else {
            return Ok(None);
        };
        let Some(source) = self.workspace.get_document(uri).map(|d| d.source.clone()) else {
            return Ok(None);
        };

        let items = engine.provide_completions(&source, position, trigger);

        if items.is_empty() {
            Ok(None)
        } else {
            Ok(Some(CompletionResponse::Array(items)))
        }
    }

    async fn completion_resolve(&self, item: CompletionItem) -> Result<CompletionItem> {
        Ok(Engine::resolve_completion(item))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(engine) = self.workspace.engine_for(uri).await else {
            return Ok(None);
        };
        let Some(source) = self.workspace.get_document(uri).map(|d| d.source.clone()) else {
            return Ok(None);
        };

        Ok(engine.provide_hover(&source, position))
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        debug!(command = %params.command, "execute command");
        match params.command.as_str() {
            SWITCH_CONTEXT_COMMAND => self.switch_context(&params.arguments),
            RELOAD_CATALOG_COMMAND => self.reload_catalog(&params.arguments),
            other => Err(Error::invalid_params(format!("unknown command: {other}"))),
        }
    }
}
