pub mod analysis;
pub mod categories;
pub mod check;
pub(crate) mod common;
pub mod flagged;
pub mod import;
pub mod policy;
pub mod rollup;
