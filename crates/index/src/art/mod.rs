//! Adaptive radix tree primary index (spec §4.2).

mod node;
mod tree;

pub(crate) use tree::ArtTree;
