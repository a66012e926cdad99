//! The uniform dispatch path over all execution shapes.

use std::collections::HashMap;

use tracing::{debug, warn};

use weft_types::dispatch::{IntegrationInput, IntegrationOutput, Item, ItemFailure};
use weft_types::error::{DispatchError, HandlerError};

use super::handler::{ActionContext, ActionHandler};

/// Builds an [`ActionDispatcher`], rejecting duplicate action types up front.
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    handlers: HashMap<String, ActionHandler>,
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under an action type. Fails with
    /// [`DispatchError::DuplicateAction`] when the type is already taken, so
    /// registration conflicts surface at startup instead of shadowing each
    /// other at dispatch time.
    pub fn register(
        mut self,
        action_type: impl Into<String>,
        handler: ActionHandler,
    ) -> Result<Self, DispatchError> {
        let action_type = action_type.into();
        if self.handlers.contains_key(&action_type) {
            return Err(DispatchError::DuplicateAction { action_type });
        }
        debug!(action_type, shape = ?handler.shape(), "registered action handler");
        self.handlers.insert(action_type, handler);
        Ok(self)
    }

    pub fn build(self) -> ActionDispatcher {
        ActionDispatcher {
            handlers: self.handlers,
        }
    }
}

/// Routes step invocations to their shape-tagged handlers.
///
/// Immutable after construction, so it is shared across concurrent workflow
/// runs without locking. Every shape goes through [`execute`] and gets the
/// same flattening, aggregation, and item-error policy:
///
/// - By default the first failing item aborts the whole invocation.
/// - With `continue_on_item_error` set, failing items are recorded in
///   `item_failures` and skipped; the invocation still succeeds.
/// - Cancellation and output-routing defects always abort, regardless of the
///   flag.
///
/// [`execute`]: ActionDispatcher::execute
pub struct ActionDispatcher {
    handlers: HashMap<String, ActionHandler>,
}

impl ActionDispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Registered action types, for startup diagnostics.
    pub fn action_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    /// Execute one step invocation.
    ///
    /// Input items are flattened across input edges in the caller's edge
    /// order; item indices in errors and failures refer to that flattened
    /// order. Relative item order is preserved on every output edge.
    pub async fn execute(
        &self,
        input: IntegrationInput,
        ctx: &ActionContext,
    ) -> Result<IntegrationOutput, DispatchError> {
        let IntegrationInput {
            action_type,
            items_by_input_edge,
            settings,
        } = input;

        let handler = self
            .handlers
            .get(&action_type)
            .ok_or_else(|| DispatchError::ActionNotFound {
                action_type: action_type.clone(),
            })?;

        let items: Vec<Item> = items_by_input_edge.into_values().flatten().collect();
        debug!(
            action_type,
            shape = ?handler.shape(),
            item_count = items.len(),
            "dispatching action"
        );

        let mut failures = Vec::new();
        let output = match handler {
            ActionHandler::Single(action) => {
                let mut out = Vec::with_capacity(items.len());
                for (item_index, item) in items.into_iter().enumerate() {
                    self.check_cancelled(&action_type, ctx)?;
                    match action.handle(item, &settings, ctx).await {
                        Ok(produced) => out.push(produced),
                        Err(err) => {
                            self.record_or_abort(&action_type, item_index, err, &settings, &mut failures)?
                        }
                    }
                }
                IntegrationOutput::single_edge(out)
            }

            ActionHandler::Multi(action) => {
                let mut out = Vec::new();
                for (item_index, item) in items.into_iter().enumerate() {
                    self.check_cancelled(&action_type, ctx)?;
                    match action.handle(item, &settings, ctx).await {
                        Ok(produced) => out.extend(produced),
                        Err(err) => {
                            self.record_or_abort(&action_type, item_index, err, &settings, &mut failures)?
                        }
                    }
                }
                IntegrationOutput::single_edge(out)
            }

            ActionHandler::Routable(action) => {
                let mut edges: Vec<Vec<Item>> = vec![Vec::new(); settings.output_edge_count];
                for (item_index, item) in items.into_iter().enumerate() {
                    self.check_cancelled(&action_type, ctx)?;
                    match action.handle(item, &settings, ctx).await {
                        Ok(routed) => {
                            // An out-of-range edge is a handler defect, never a
                            // data problem, so it aborts even under the
                            // continue-on-error policy.
                            let edge = edges.get_mut(routed.output_index).ok_or(
                                DispatchError::OutputIndexOutOfBounds {
                                    action_type: action_type.clone(),
                                    item_index,
                                    output_index: routed.output_index,
                                    output_edge_count: settings.output_edge_count,
                                },
                            )?;
                            edge.push(routed.item);
                        }
                        Err(err) => {
                            self.record_or_abort(&action_type, item_index, err, &settings, &mut failures)?
                        }
                    }
                }
                IntegrationOutput {
                    items_by_output_edge: edges,
                    item_failures: Vec::new(),
                }
            }

            ActionHandler::Bulk(action) => {
                self.check_cancelled(&action_type, ctx)?;
                match action.handle(items, &settings, ctx).await {
                    Ok(edges) => {
                        if edges.len() != settings.output_edge_count {
                            return Err(DispatchError::OutputEdgeMismatch {
                                action_type: action_type.clone(),
                                expected: settings.output_edge_count,
                                actual: edges.len(),
                            });
                        }
                        IntegrationOutput {
                            items_by_output_edge: edges,
                            item_failures: Vec::new(),
                        }
                    }
                    Err(err) => {
                        // A bulk call has no per-item granularity; the whole
                        // batch is one failure attributed to index 0.
                        self.record_or_abort(&action_type, 0, err, &settings, &mut failures)?;
                        IntegrationOutput::empty(settings.output_edge_count)
                    }
                }
            }
        };

        if !failures.is_empty() {
            warn!(
                action_type,
                failed_items = failures.len(),
                "action completed with skipped items"
            );
        }

        Ok(IntegrationOutput {
            item_failures: failures,
            ..output
        })
    }

    fn check_cancelled(&self, action_type: &str, ctx: &ActionContext) -> Result<(), DispatchError> {
        if ctx.cancel.is_cancelled() {
            return Err(DispatchError::Cancelled {
                action_type: action_type.to_string(),
            });
        }
        Ok(())
    }

    /// Apply the uniform item-error policy: record and continue, or abort.
    fn record_or_abort(
        &self,
        action_type: &str,
        item_index: usize,
        err: HandlerError,
        settings: &weft_types::dispatch::ActionSettings,
        failures: &mut Vec<ItemFailure>,
    ) -> Result<(), DispatchError> {
        if settings.continue_on_item_error {
            failures.push(ItemFailure {
                item_index,
                message: err.to_string(),
            });
            Ok(())
        } else {
            Err(DispatchError::Handler {
                action_type: action_type.to_string(),
                item_index,
                source: err,
            })
        }
    }
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.action_types().collect();
        types.sort_unstable();
        f.debug_struct("ActionDispatcher")
            .field("action_types", &types)
            .finish()
    }
}
