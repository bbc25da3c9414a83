pub mod classify;
pub mod grouping;
pub mod pipeline;
pub mod policy;
pub mod query;
pub mod reference;
pub mod refresh;
pub mod rollup;
pub mod types;
