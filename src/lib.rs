//! Front end and code generator for the Minat expression language.
//!
//! Source text flows strictly forward through four stages:
//! tokens ([`minlang::compiler::tokenize`]), postfix shunt entities
//! ([`minlang::compiler::shunt`]), a forest of tree nodes
//! ([`minlang::compiler::ast`]) and finally backend output
//! ([`minlang::compile`]). Every call owns its own state, so separate
//! compilations can run side by side.

pub mod config;
pub mod minlang;
