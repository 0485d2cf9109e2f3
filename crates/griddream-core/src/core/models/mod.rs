//! Atom records, the chemistry type table, and the in-memory model a molecule source
//! fills for every candidate.

pub mod atom;
pub mod model;
pub mod typing;
