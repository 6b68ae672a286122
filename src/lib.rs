//! # krmfn
//!
//! A staging and marshalling library for KRM function pipelines.
//!
//! The crate prepares structured configuration resources and a pipeline of
//! transformation functions for execution by an external
//! function-execution substrate, then normalizes the substrate's output
//! back into typed resource collections:
//!
//! - accumulate heterogeneous resource inputs (raw serialized streams,
//!   parsed document nodes, typed objects) into one ordered document list
//! - translate declarative function specs (container image or local
//!   executable, plus inline key/value configuration) into annotated
//!   descriptor documents
//! - split and join multi-document streams, stripping substrate-internal
//!   bookkeeping annotations
//! - parse substrate output back into document nodes or typed objects
//!
//! Function execution itself lives behind the
//! [`FunctionRuntime`](krm::runtime::FunctionRuntime) contract and is not
//! part of this crate.
//!
//! Everything here is synchronous and blocking; the only suspension point
//! is the substrate call inside `execute()`.

pub mod krm;
