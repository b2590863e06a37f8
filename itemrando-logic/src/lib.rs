// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]

pub mod routes;
pub mod traverse;

pub use routes::{Route, RouteStore};
pub use traverse::{
    traverse, traverse_graph, PathEntry, TraverseOptions, TraverseResult, Traverser,
};
