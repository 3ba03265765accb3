//! List views
//!
//! A `ListView` owns one `ListFetcher` and turns its pages into the
//! collection a consumer renders:
//!
//! - fixed keys pinned at the top, resolved through an `EntityLookup`
//!   when the fetched pages do not contain them
//! - locally added and removed entities
//! - an optional cap on the number of items
//! - periodic refresh of the first page or of every page
//! - an optional filter deciding which fetch errors are reported
//!
//! Every key appears at most once in the published items.

mod list_view;
mod merge;

pub use list_view::{ErrorFilter, ListView};
