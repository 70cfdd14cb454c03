use alloy_primitives::Address;

/// Per-account payload stored by the tree.
///
/// The default value (zero balance, inactive) is what unknown identifiers
/// report; a stored payload with a zero balance is *registered* but not
/// tree-resident.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AccountMeta {
    /// Current balance; the primary sort key of the tree.
    pub balance: u128,
    /// Whether the registry considers the account active.
    pub active: bool,
}

/// Node color in the red-black tree.
///
/// Absent children read as [`Color::Black`]. The default is black, so an
/// unlinked node reads exactly like NIL.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Color {
    Red,
    #[default]
    Black,
}

/// Snapshot of a resident node's links, as identifiers.
///
/// Returned by [`BalanceTree::node`](crate::BalanceTree::node); absent
/// links are `None` rather than the all-zero sentinel identifier.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NodeView {
    pub key: Address,
    pub parent: Option<Address>,
    pub left: Option<Address>,
    pub right: Option<Address>,
    pub color: Color,
}
