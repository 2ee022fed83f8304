//! Reconcile a local build directory against a remote bucket.
//!
//! Every logical path found on either side becomes a [`Resource`], is
//! classified into a [`Status`], and is handed to the [`Executor`], which
//! issues at most one store mutation for it.

pub mod action;
#[cfg(feature = "s3")]
mod connect;
pub mod error;
pub mod hash;
pub mod local;
pub mod remote;
pub mod resource;
pub mod status;
pub mod stream;

pub use crate::action::{Executor, Report, Verb};
pub use crate::resource::Resource;
pub use crate::status::{Facts, Status, classify};
pub use crate::stream::{Summary, SyncEvent, enumerate, run, sync};
#[cfg(feature = "s3")]
pub use crate::connect::connect;
