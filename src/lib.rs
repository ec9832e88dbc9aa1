//! This library grounds lifted temporal planning tasks and translates them into a finite-domain (SAS+) representation.
//!
//! # Grounding
//! A [PreprocessedTask][datatypes::PreprocessedTask] describes a planning task by typed objects, functions and lifted durative operators.
//! The [grounder] instantiates every operator that can be reached from the initial state, level by level, until no new value of any
//! variable becomes reachable. Quantified goals and constraints are expanded over the concrete objects, and variables whose value never
//! changes are folded into the actions that read them.
//!
//! # Translation
//! The [translator] computes pairs of propositions that can never hold at the same time (mutexes) by a second fixpoint over the grounded
//! actions. The [mutex graph][mutex_graph::MutexGraph] of those pairs is split into cliques, and every clique becomes one multi-valued
//! variable of the resulting [SasTask][sas::SasTask].
//!
//! # Input-file format:
//! The input is a JSON document holding the typed task and its lifted operators, as written by the parser and preprocessor.
//! Type `0` is `#boolean` and type `1` is `number`; object `0` is `#false` and object `1` is `#true`.
//!
//! ## Example input file:
//! ```json
//! {
//!   "task": {
//!     "types": [{ "name": "#boolean" }, { "name": "number" }, { "name": "block" }],
//!     "objects": [{ "name": "#false" }, { "name": "#true" }, { "name": "a", "types": [2] }],
//!     "functions": [{ "name": "on", "parameters": [{ "name": "x", "types": [2] }], "value_types": [0] }],
//!     "init": [{ "function": 0, "parameters": [2], "value": { "object": 1 } }]
//!   },
//!   "operators": []
//! }
//! ```
//!
//! ## Example usage:
//! ```
//! use ground_sas::{datatypes::PreprocessedTask, Config};
//! # let input = r##"{"task":{"types":[{"name":"#boolean"},{"name":"number"}],"objects":[{"name":"#false"},{"name":"#true"}],"functions":[]},"operators":[]}"##;
//! let task = PreprocessedTask::from_json(input)?;
//! let config = Config::default();
//! let grounded = ground_sas::grounder::ground(&task, config.keep_static_data)?;
//! let sas = ground_sas::translator::translate(&grounded, &config)?;
//! assert!(sas.variables.is_empty());
//! # Ok::<(), ground_sas::Error>(())
//! ```
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code
)]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_qualifications,
    unused_extern_crates,
    variant_size_differences
)]

pub mod config;
pub mod datatypes;
pub mod error;
pub mod grounder;
pub mod mutex_graph;
pub mod sas;
pub mod translator;

#[cfg(test)]
mod test;

pub use config::{Config, SplitStrategy};
pub use error::{Error, Result};
