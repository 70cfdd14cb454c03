use alloy_primitives::Address;

use super::arena::Handle;
use crate::account::{AccountMeta, Color};

/// A red-black node: identifier, three links, color, payload.
///
/// The node exists for as long as its account is registered. While the
/// account is tree-resident the links describe its position; once removed,
/// the links are cleared and the node is storage for the retained payload
/// only.
#[derive(Clone, Debug)]
pub(crate) struct RbNode {
    pub(crate) key: Address,
    pub(crate) parent: Option<Handle>,
    pub(crate) left: Option<Handle>,
    pub(crate) right: Option<Handle>,
    pub(crate) color: Color,
    pub(crate) meta: AccountMeta,
}

impl RbNode {
    /// A node holding a payload but not linked into the ordered structure.
    pub(crate) const fn unlinked(key: Address, meta: AccountMeta) -> Self {
        Self {
            key,
            parent: None,
            left: None,
            right: None,
            color: Color::Black,
            meta,
        }
    }

    /// Ordering key: balance first, identifier as the tie-break.
    ///
    /// Identifiers are unique, so this order is strict and a new node with
    /// an equal balance lands right of a smaller identifier.
    #[inline]
    pub(crate) const fn order_key(&self) -> (u128, Address) {
        (self.meta.balance, self.key)
    }

    /// Detaches the node after it leaves the tree.
    ///
    /// Residency is judged by `parent`/root, so a retained entry must not
    /// keep stale links or color.
    pub(crate) fn clear_links(&mut self) {
        self.parent = None;
        self.left = None;
        self.right = None;
        self.color = Color::Black;
    }
}
