//! Query building for catalorm.
//!
//! `QueryOptions` describes a SELECT over one entity table; `statement`
//! renders it and the other DML/DDL the model engine issues.

mod options;
pub mod statement;

pub use options::QueryOptions;
