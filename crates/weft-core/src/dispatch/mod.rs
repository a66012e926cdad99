//! Shape-tagged action dispatch.
//!
//! Every integration action declares one of four execution shapes (per item
//! in / one out, per item in / many out, per item in / routed out, or all
//! items in one call). [`dispatcher::ActionDispatcher`] gives the workflow
//! engine a single entry point over all of them: flatten the input edges,
//! drive the handler per its shape, aggregate outputs per edge, and apply
//! one uniform item-error policy.

pub mod dispatcher;
pub mod handler;

pub use dispatcher::{ActionDispatcher, DispatcherBuilder};
pub use handler::{
    ActionContext, ActionHandler, BulkAction, MultiItemAction, Routed, RoutableAction,
    SingleItemAction,
};
