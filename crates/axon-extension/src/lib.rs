//! Extension SDK for the axon runtime.
//!
//! This crate is what user logic depends on: the [`Extension`] trait
//! its code implements, and the [`AddonRegistry`] its factories
//! register into.
//!
//! # Registration flow
//!
//! ```text
//! dynamic module ── register(kind, name, callback) ──► AddonRegistry
//!                                                          │
//! runtime ── register_all(ctx) / register_specific ───────┘
//!                │
//!                ▼ callback(ctx)
//!          ctx.install_extension(group, name, instance)
//!                │
//!                ▼ runtime drains ctx
//!          extension hosted in its graph
//! ```
//!
//! Registration is deliberately lenient about duplicates: a second
//! `(kind, name)` registration warns and is ignored, so redundant
//! attempts by dynamically loaded modules never abort startup.

mod addon;
mod error;
mod extension;
mod registry;

pub use addon::{AddonKind, InstalledExtension, RegisterCtx, RegisterFn};
pub use error::{AddonError, ExtensionError};
pub use extension::Extension;
pub use registry::AddonRegistry;
