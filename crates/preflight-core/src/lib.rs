//! Preflight Core - pre-apply safety gates for declarative deployments
//!
//! This crate provides:
//! - **Registry**: Named, independently switchable checks driven by an enable-list
//!   and a configuration document, run with aggregated results
//! - **Checks**: The [`Check`] trait and the [`CheckFn`] closure adapter
//! - **Validators**: Compose independent old/new comparison rules that never
//!   short-circuit ([`Validator`], [`Validation`], [`ValidationFn`])
//! - **Change graph**: The planned changes a check inspects
//! - **Configuration**: The parsed configuration document and opaque per-check config
//!
//! Everything here is synchronous and performs no cluster I/O. A cancelled
//! [`CancellationToken`] stops a run at the next check boundary.

pub mod aggregate;
pub mod check;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod registry;
pub mod suggest;
pub mod validator;

pub use aggregate::ErrorList;
pub use check::{Check, CheckError, CheckFn};
pub use config::{CheckConfig, PreflightConfig, PreflightRule};
pub use context::CancellationToken;
pub use error::{BoxError, PreflightError, Result};
pub use graph::{Change, ChangeGraph, ChangeOp, Resource, ResourceIdentity, ResourceKey};
pub use registry::{CheckFailure, Registry};
pub use validator::{Validation, ValidationErrors, ValidationFailure, ValidationFn, Validator};
