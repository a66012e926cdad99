//! Action handler traits, one per execution shape.
//!
//! Handlers are written against exactly one of these traits and never see
//! edge aggregation, item indexing, or the error policy -- the dispatcher
//! owns all of that. All traits are dyn-safe so a registry can hold them
//! behind `Arc`.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use weft_types::dispatch::{ActionSettings, ExecutionShape, Item};
use weft_types::error::HandlerError;

use crate::credential::CredentialClient;

/// Per-invocation context handed to every handler call.
#[derive(Clone)]
pub struct ActionContext {
    /// Workspace the invocation runs under; scopes credential fetches.
    pub workspace_id: Uuid,
    /// Present when the integration instance has a bound credential.
    pub credentials: Option<Arc<CredentialClient>>,
    /// Cooperative cancellation; the dispatcher also checks this between
    /// items, so long-running handlers only need it for in-call work.
    pub cancel: CancellationToken,
}

impl ActionContext {
    pub fn new(workspace_id: Uuid, credentials: Option<Arc<CredentialClient>>) -> Self {
        Self {
            workspace_id,
            credentials,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

impl std::fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionContext")
            .field("workspace_id", &self.workspace_id)
            .field("has_credentials", &self.credentials.is_some())
            .finish()
    }
}

/// One item in, exactly one item out.
#[async_trait]
pub trait SingleItemAction: Send + Sync {
    async fn handle(
        &self,
        item: Item,
        settings: &ActionSettings,
        ctx: &ActionContext,
    ) -> Result<Item, HandlerError>;
}

/// One item in, zero or more items out (expanders, filters).
#[async_trait]
pub trait MultiItemAction: Send + Sync {
    async fn handle(
        &self,
        item: Item,
        settings: &ActionSettings,
        ctx: &ActionContext,
    ) -> Result<Vec<Item>, HandlerError>;
}

/// An item routed to one of the configured output edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Routed {
    /// Zero-based edge index; must be below the invocation's
    /// `output_edge_count`.
    pub output_index: usize,
    pub item: Item,
}

impl Routed {
    pub fn new(output_index: usize, item: Item) -> Self {
        Self { output_index, item }
    }
}

/// One item in, one item out on a handler-chosen edge (if/else, switch).
#[async_trait]
pub trait RoutableAction: Send + Sync {
    async fn handle(
        &self,
        item: Item,
        settings: &ActionSettings,
        ctx: &ActionContext,
    ) -> Result<Routed, HandlerError>;
}

/// All items in one call, full per-edge output in one return (batch APIs,
/// aggregations). The returned outer vec must have exactly
/// `output_edge_count` entries.
#[async_trait]
pub trait BulkAction: Send + Sync {
    async fn handle(
        &self,
        items: Vec<Item>,
        settings: &ActionSettings,
        ctx: &ActionContext,
    ) -> Result<Vec<Vec<Item>>, HandlerError>;
}

/// A registered handler, tagged with its shape.
///
/// The tag is what lets the dispatcher drive every action through one code
/// path; handlers cannot lie about their shape because the constructor fixes
/// it.
#[derive(Clone)]
pub enum ActionHandler {
    Single(Arc<dyn SingleItemAction>),
    Multi(Arc<dyn MultiItemAction>),
    Routable(Arc<dyn RoutableAction>),
    Bulk(Arc<dyn BulkAction>),
}

impl ActionHandler {
    pub fn shape(&self) -> ExecutionShape {
        match self {
            Self::Single(_) => ExecutionShape::Single,
            Self::Multi(_) => ExecutionShape::Multi,
            Self::Routable(_) => ExecutionShape::Routable,
            Self::Bulk(_) => ExecutionShape::Bulk,
        }
    }
}

impl std::fmt::Debug for ActionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ActionHandler({:?})", self.shape())
    }
}
