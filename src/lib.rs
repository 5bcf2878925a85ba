//! # LINEDEPS
//!
//! Per-line dependency extraction for Java source trees.
//!
//! Every syntax node of a compilation unit is classified into a closed set of
//! kinds; each kind has one extraction strategy that asks a [`core::Resolver`]
//! what the node refers to and turns the answer into qualified identifiers.
//! The result is a [`core::Report`]: for every file with at least one
//! dependency, a map from 1-based line number to the set of identifiers that
//! line depends on.
//!
//! ## Layers
//!
//! - [`core`]: strategies, traversal, report model and orchestration
//! - [`parsers`]: tree-sitter front end for Java
//! - [`resolve`]: the project type index and [`resolve::JavaResolver`]
//! - [`formatters`]: text and JSON presentation
//! - [`config`]: layered `.linedeps.toml` configuration

pub mod config;
pub mod core;
pub mod formatters;
pub mod parsers;
pub mod resolve;
