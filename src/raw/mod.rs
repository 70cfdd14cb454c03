mod arena;
mod node;
mod tree;

pub(crate) use arena::Handle;
pub(crate) use tree::RawBalanceTree;
