use alloc::collections::BTreeMap;

use alloy_primitives::{Address, U256};
use log::trace;

use super::arena::{Arena, Handle};
use super::node::RbNode;
use crate::account::{AccountMeta, Color, NodeView};
use crate::error::{Error, Result};

/// The red-black core backing [`BalanceTree`](crate::BalanceTree).
///
/// Nodes live in an append-only [`Arena`]; `index` maps identifiers to
/// their arena handles. An account can be *registered* (present in `index`)
/// without being *resident* (linked under `root`): zero-balance accounts
/// keep their payload but take no part in ordering, `len`, or `total`.
#[derive(Clone)]
pub(crate) struct RawBalanceTree {
    nodes: Arena<RbNode>,
    index: BTreeMap<Address, Handle>,
    root: Option<Handle>,
    len: usize,
    total: U256,
}

impl RawBalanceTree {
    pub(crate) const fn new() -> Self {
        Self {
            nodes: Arena::new(),
            index: BTreeMap::new(),
            root: None,
            len: 0,
            total: U256::ZERO,
        }
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Arena::with_capacity(capacity),
            index: BTreeMap::new(),
            root: None,
            len: 0,
            total: U256::ZERO,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) const fn total_balance(&self) -> U256 {
        self.total
    }

    pub(crate) fn capacity(&self) -> usize {
        self.nodes.capacity()
    }

    #[inline]
    fn node(&self, handle: Handle) -> &RbNode {
        self.nodes.get(handle)
    }

    #[inline]
    fn node_mut(&mut self, handle: Handle) -> &mut RbNode {
        self.nodes.get_mut(handle)
    }

    /// Color of a possibly-absent child. NIL is black.
    #[inline]
    fn color_of(&self, handle: Option<Handle>) -> Color {
        handle.map_or(Color::Black, |h| self.node(h).color)
    }

    fn is_resident_handle(&self, handle: Handle) -> bool {
        self.root == Some(handle) || self.node(handle).parent.is_some()
    }

    /// True iff the key is linked into the ordered structure.
    pub(crate) fn is_resident(&self, key: Address) -> bool {
        !key.is_zero() && self.index.get(&key).is_some_and(|&h| self.is_resident_handle(h))
    }

    /// True iff the key has a stored payload, resident or not.
    pub(crate) fn is_registered(&self, key: Address) -> bool {
        self.index.contains_key(&key)
    }

    /// Stored payload for the key; the default payload if never inserted.
    pub(crate) fn meta(&self, key: Address) -> AccountMeta {
        self.index.get(&key).map_or_else(AccountMeta::default, |&h| self.node(h).meta)
    }

    pub(crate) fn insert(&mut self, key: Address, meta: AccountMeta) -> Result<()> {
        if key.is_zero() {
            return Err(Error::NullKey);
        }

        let handle = match self.index.get(&key) {
            Some(&h) => {
                if self.is_resident_handle(h) {
                    return Err(Error::Exists(key));
                }
                // Registered but unlinked: reuse the slot.
                self.node_mut(h).meta = meta;
                h
            }
            None => {
                let h = self.nodes.alloc(RbNode::unlinked(key, meta));
                self.index.insert(key, h);
                h
            }
        };

        // Zero balances are registered but never linked into the order.
        if meta.balance == 0 {
            return Ok(());
        }

        self.link(handle);
        self.len += 1;
        self.total = self
            .total
            .checked_add(U256::from(meta.balance))
            .expect("`RawBalanceTree::insert()` - total balance overflow!");
        Ok(())
    }

    pub(crate) fn remove(&mut self, key: Address) -> Result<()> {
        if key.is_zero() {
            return Err(Error::NullKey);
        }
        let handle = match self.index.get(&key) {
            Some(&h) if self.is_resident_handle(h) => h,
            _ => return Err(Error::NotFound(key)),
        };

        let balance = self.node(handle).meta.balance;
        trace!("tree unlink {key} balance={balance}");
        self.unlink(handle);
        self.node_mut(handle).clear_links();
        self.len -= 1;
        self.total = self
            .total
            .checked_sub(U256::from(balance))
            .expect("`RawBalanceTree::remove()` - total balance underflow!");
        Ok(())
    }

    /// Smallest resident key in `(balance, identifier)` order.
    pub(crate) fn first(&self) -> Option<Address> {
        self.first_handle().map(|h| self.node(h).key)
    }

    /// Largest resident key in `(balance, identifier)` order.
    pub(crate) fn last(&self) -> Option<Address> {
        self.last_handle().map(|h| self.node(h).key)
    }

    pub(crate) fn first_handle(&self) -> Option<Handle> {
        self.root.map(|r| self.min_from(r))
    }

    pub(crate) fn last_handle(&self) -> Option<Handle> {
        self.root.map(|r| self.max_from(r))
    }

    /// In-order successor of `key`, or `None` for the largest or a
    /// non-resident key.
    pub(crate) fn next(&self, key: Address) -> Result<Option<Address>> {
        if key.is_zero() {
            return Err(Error::NullKey);
        }
        match self.index.get(&key) {
            Some(&h) if self.is_resident_handle(h) => {
                Ok(self.successor(h).map(|s| self.node(s).key))
            }
            _ => Ok(None),
        }
    }

    /// In-order predecessor of `key`, or `None` for the smallest or a
    /// non-resident key.
    pub(crate) fn prev(&self, key: Address) -> Result<Option<Address>> {
        if key.is_zero() {
            return Err(Error::NullKey);
        }
        match self.index.get(&key) {
            Some(&h) if self.is_resident_handle(h) => {
                Ok(self.predecessor(h).map(|p| self.node(p).key))
            }
            _ => Ok(None),
        }
    }

    /// Link snapshot of a resident node.
    pub(crate) fn node_view(&self, key: Address) -> Result<NodeView> {
        let handle = match self.index.get(&key) {
            Some(&h) if !key.is_zero() && self.is_resident_handle(h) => h,
            _ => return Err(Error::NotFound(key)),
        };
        let node = self.node(handle);
        Ok(NodeView {
            key,
            parent: node.parent.map(|p| self.node(p).key),
            left: node.left.map(|l| self.node(l).key),
            right: node.right.map(|r| self.node(r).key),
            color: node.color,
        })
    }

    /// Identifier and balance for a handle obtained from iteration.
    pub(crate) fn entry(&self, handle: Handle) -> (Address, u128) {
        let node = self.node(handle);
        (node.key, node.meta.balance)
    }

    pub(crate) fn successor(&self, handle: Handle) -> Option<Handle> {
        if let Some(right) = self.node(handle).right {
            return Some(self.min_from(right));
        }
        let mut current = handle;
        while let Some(parent) = self.node(current).parent {
            if self.node(parent).left == Some(current) {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    pub(crate) fn predecessor(&self, handle: Handle) -> Option<Handle> {
        if let Some(left) = self.node(handle).left {
            return Some(self.max_from(left));
        }
        let mut current = handle;
        while let Some(parent) = self.node(current).parent {
            if self.node(parent).right == Some(current) {
                return Some(parent);
            }
            current = parent;
        }
        None
    }

    fn min_from(&self, mut handle: Handle) -> Handle {
        while let Some(left) = self.node(handle).left {
            handle = left;
        }
        handle
    }

    fn max_from(&self, mut handle: Handle) -> Handle {
        while let Some(right) = self.node(handle).right {
            handle = right;
        }
        handle
    }

    /// BST descent and red link, then fixup. `handle` must be unlinked and
    /// carry a positive balance.
    fn link(&mut self, handle: Handle) {
        let order = self.node(handle).order_key();
        trace!("tree link {} balance={}", self.node(handle).key, order.0);

        let mut parent = None;
        let mut cursor = self.root;
        let mut went_left = false;
        while let Some(current) = cursor {
            parent = Some(current);
            if order < self.node(current).order_key() {
                cursor = self.node(current).left;
                went_left = true;
            } else {
                cursor = self.node(current).right;
                went_left = false;
            }
        }

        {
            let node = self.node_mut(handle);
            node.parent = parent;
            node.color = Color::Red;
        }
        match parent {
            None => self.root = Some(handle),
            Some(p) if went_left => self.node_mut(p).left = Some(handle),
            Some(p) => self.node_mut(p).right = Some(handle),
        }

        self.insert_fixup(handle);
    }

    /// Classic insert rebalance: while the parent is red, recolor past a red
    /// uncle and ascend, or rotate once or twice past a black uncle and
    /// stop. At most two rotations.
    fn insert_fixup(&mut self, mut current: Handle) {
        while let Some(parent) = self.node(current).parent
            && self.node(parent).color == Color::Red
        {
            // A red parent is never the root, so the grandparent exists.
            let grandparent = self
                .node(parent)
                .parent
                .expect("`RawBalanceTree::insert_fixup()` - red parent without a grandparent!");

            if self.node(grandparent).left == Some(parent) {
                let uncle = self.node(grandparent).right;
                if self.color_of(uncle) == Color::Red {
                    let uncle =
                        uncle.expect("`RawBalanceTree::insert_fixup()` - red uncle is absent!");
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(uncle).color = Color::Black;
                    self.node_mut(grandparent).color = Color::Red;
                    current = grandparent;
                } else {
                    if self.node(parent).right == Some(current) {
                        current = parent;
                        self.rotate_left(current);
                    }
                    let parent = self
                        .node(current)
                        .parent
                        .expect("`RawBalanceTree::insert_fixup()` - rotated node lost its parent!");
                    let grandparent = self
                        .node(parent)
                        .parent
                        .expect("`RawBalanceTree::insert_fixup()` - red parent without a grandparent!");
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(grandparent).color = Color::Red;
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.node(grandparent).left;
                if self.color_of(uncle) == Color::Red {
                    let uncle =
                        uncle.expect("`RawBalanceTree::insert_fixup()` - red uncle is absent!");
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(uncle).color = Color::Black;
                    self.node_mut(grandparent).color = Color::Red;
                    current = grandparent;
                } else {
                    if self.node(parent).left == Some(current) {
                        current = parent;
                        self.rotate_right(current);
                    }
                    let parent = self
                        .node(current)
                        .parent
                        .expect("`RawBalanceTree::insert_fixup()` - rotated node lost its parent!");
                    let grandparent = self
                        .node(parent)
                        .parent
                        .expect("`RawBalanceTree::insert_fixup()` - red parent without a grandparent!");
                    self.node_mut(parent).color = Color::Black;
                    self.node_mut(grandparent).color = Color::Red;
                    self.rotate_left(grandparent);
                }
            }
        }

        if let Some(root) = self.root {
            self.node_mut(root).color = Color::Black;
        }
    }

    /// Detaches `handle` from the pointer graph, splicing in the in-order
    /// successor when both children exist. Aggregates are the caller's job.
    fn unlink(&mut self, target: Handle) {
        let target_left = self.node(target).left;
        let target_right = self.node(target).right;

        let (fix_child, fix_parent, spliced_color) = if target_left.is_none() {
            let parent = self.node(target).parent;
            self.transplant(target, target_right);
            (target_right, parent, self.node(target).color)
        } else if target_right.is_none() {
            let parent = self.node(target).parent;
            self.transplant(target, target_left);
            (target_left, parent, self.node(target).color)
        } else {
            // Two children: the successor is spliced into the vacated
            // position and takes over the target's color, so the node that
            // physically leaves a path is the successor in its old spot.
            let right =
                target_right.expect("`RawBalanceTree::unlink()` - right child vanished!");
            let left = target_left.expect("`RawBalanceTree::unlink()` - left child vanished!");
            let successor = self.min_from(right);
            let successor_color = self.node(successor).color;
            let child = self.node(successor).right;

            let fix_parent = if self.node(successor).parent == Some(target) {
                Some(successor)
            } else {
                let above = self.node(successor).parent;
                self.transplant(successor, child);
                self.node_mut(successor).right = Some(right);
                self.node_mut(right).parent = Some(successor);
                above
            };

            self.transplant(target, Some(successor));
            self.node_mut(successor).left = Some(left);
            self.node_mut(left).parent = Some(successor);
            let target_color = self.node(target).color;
            self.node_mut(successor).color = target_color;

            (child, fix_parent, successor_color)
        };

        if spliced_color == Color::Black {
            self.remove_fixup(fix_child, fix_parent);
        }
    }

    /// Replaces the subtree rooted at `from` with the subtree rooted at
    /// `to`. Leaves `from`'s own links stale; callers clean them up.
    fn transplant(&mut self, from: Handle, to: Option<Handle>) {
        let parent = self.node(from).parent;
        match parent {
            None => self.root = to,
            Some(p) => {
                if self.node(p).left == Some(from) {
                    self.node_mut(p).left = to;
                } else {
                    self.node_mut(p).right = to;
                }
            }
        }
        if let Some(to) = to {
            self.node_mut(to).parent = parent;
        }
    }

    /// Double-black propagation after a black node left the tree.
    ///
    /// `current` is the child spliced into the vacated position and may be
    /// absent (an absent child reads as black), so the position is pinned by
    /// `parent` rather than by the node itself.
    fn remove_fixup(&mut self, mut current: Option<Handle>, mut parent: Option<Handle>) {
        while current != self.root && self.color_of(current) == Color::Black {
            let Some(p) = parent else {
                break;
            };

            if current == self.node(p).left {
                let mut sibling = self
                    .node(p)
                    .right
                    .expect("`RawBalanceTree::remove_fixup()` - double black without a sibling!");
                if self.node(sibling).color == Color::Red {
                    self.node_mut(sibling).color = Color::Black;
                    self.node_mut(p).color = Color::Red;
                    self.rotate_left(p);
                    sibling = self
                        .node(p)
                        .right
                        .expect("`RawBalanceTree::remove_fixup()` - rotation lost the sibling!");
                }

                let near = self.node(sibling).left;
                let far = self.node(sibling).right;
                if self.color_of(near) == Color::Black && self.color_of(far) == Color::Black {
                    self.node_mut(sibling).color = Color::Red;
                    current = Some(p);
                    parent = self.node(p).parent;
                } else {
                    if self.color_of(far) == Color::Black {
                        let near = near
                            .expect("`RawBalanceTree::remove_fixup()` - red near child is absent!");
                        self.node_mut(near).color = Color::Black;
                        self.node_mut(sibling).color = Color::Red;
                        self.rotate_right(sibling);
                        sibling = self
                            .node(p)
                            .right
                            .expect("`RawBalanceTree::remove_fixup()` - rotation lost the sibling!");
                    }
                    let parent_color = self.node(p).color;
                    self.node_mut(sibling).color = parent_color;
                    self.node_mut(p).color = Color::Black;
                    let far = self
                        .node(sibling)
                        .right
                        .expect("`RawBalanceTree::remove_fixup()` - red far child is absent!");
                    self.node_mut(far).color = Color::Black;
                    self.rotate_left(p);
                    current = self.root;
                    parent = None;
                }
            } else {
                let mut sibling = self
                    .node(p)
                    .left
                    .expect("`RawBalanceTree::remove_fixup()` - double black without a sibling!");
                if self.node(sibling).color == Color::Red {
                    self.node_mut(sibling).color = Color::Black;
                    self.node_mut(p).color = Color::Red;
                    self.rotate_right(p);
                    sibling = self
                        .node(p)
                        .left
                        .expect("`RawBalanceTree::remove_fixup()` - rotation lost the sibling!");
                }

                let near = self.node(sibling).right;
                let far = self.node(sibling).left;
                if self.color_of(near) == Color::Black && self.color_of(far) == Color::Black {
                    self.node_mut(sibling).color = Color::Red;
                    current = Some(p);
                    parent = self.node(p).parent;
                } else {
                    if self.color_of(far) == Color::Black {
                        let near = near
                            .expect("`RawBalanceTree::remove_fixup()` - red near child is absent!");
                        self.node_mut(near).color = Color::Black;
                        self.node_mut(sibling).color = Color::Red;
                        self.rotate_left(sibling);
                        sibling = self
                            .node(p)
                            .left
                            .expect("`RawBalanceTree::remove_fixup()` - rotation lost the sibling!");
                    }
                    let parent_color = self.node(p).color;
                    self.node_mut(sibling).color = parent_color;
                    self.node_mut(p).color = Color::Black;
                    let far = self
                        .node(sibling)
                        .left
                        .expect("`RawBalanceTree::remove_fixup()` - red far child is absent!");
                    self.node_mut(far).color = Color::Black;
                    self.rotate_right(p);
                    current = self.root;
                    parent = None;
                }
            }
        }

        if let Some(handle) = current {
            self.node_mut(handle).color = Color::Black;
        }
    }

    /// Lifts `x`'s right child into `x`'s position. Pointer surgery only;
    /// `len` and `total` are untouched.
    fn rotate_left(&mut self, x: Handle) {
        let y = self.node(x).right.expect("`RawBalanceTree::rotate_left()` - no right child!");
        let y_left = self.node(y).left;

        self.node_mut(x).right = y_left;
        if let Some(child) = y_left {
            self.node_mut(child).parent = Some(x);
        }

        let x_parent = self.node(x).parent;
        self.node_mut(y).parent = x_parent;
        match x_parent {
            None => self.root = Some(y),
            Some(p) => {
                if self.node(p).left == Some(x) {
                    self.node_mut(p).left = Some(y);
                } else {
                    self.node_mut(p).right = Some(y);
                }
            }
        }

        self.node_mut(y).left = Some(x);
        self.node_mut(x).parent = Some(y);
    }

    /// Mirror of [`Self::rotate_left`].
    fn rotate_right(&mut self, x: Handle) {
        let y = self.node(x).left.expect("`RawBalanceTree::rotate_right()` - no left child!");
        let y_right = self.node(y).right;

        self.node_mut(x).left = y_right;
        if let Some(child) = y_right {
            self.node_mut(child).parent = Some(x);
        }

        let x_parent = self.node(x).parent;
        self.node_mut(y).parent = x_parent;
        match x_parent {
            None => self.root = Some(y),
            Some(p) => {
                if self.node(p).left == Some(x) {
                    self.node_mut(p).left = Some(y);
                } else {
                    self.node_mut(p).right = Some(y);
                }
            }
        }

        self.node_mut(y).right = Some(x);
        self.node_mut(x).parent = Some(y);
    }
}

#[cfg(test)]
impl RawBalanceTree {
    /// Checks every structural invariant and panics with a description on
    /// the first violation. Test-only; used after each step of the
    /// randomized suites.
    pub(crate) fn validate_invariants(&self) {
        assert_eq!(self.color_of(self.root), Color::Black, "root must be black");

        let (count, sum) = match self.root {
            None => (0, U256::ZERO),
            Some(root) => {
                assert!(self.node(root).parent.is_none(), "root must not have a parent");
                let (count, sum, _height, _min, _max) = self.validate_subtree(root);
                (count, sum)
            }
        };
        assert_eq!(self.len, count, "len diverges from in-order count");
        assert_eq!(self.total, sum, "total diverges from in-order sum");

        let mut resident = 0;
        for (&key, &handle) in &self.index {
            let node = self.node(handle);
            assert_eq!(node.key, key, "index entry points at a foreign node");
            if self.is_resident_handle(handle) {
                resident += 1;
            } else {
                assert!(node.left.is_none(), "unlinked node keeps a left child");
                assert!(node.right.is_none(), "unlinked node keeps a right child");
                assert_eq!(node.color, Color::Black, "unlinked node keeps a color");
            }
        }
        assert_eq!(resident, self.len, "resident index entries diverge from len");
    }

    /// Returns `(count, sum, black_height, min_order, max_order)` for the
    /// subtree, asserting order, link symmetry, balance positivity, and the
    /// red and black rules along the way.
    #[allow(clippy::type_complexity)]
    fn validate_subtree(
        &self,
        handle: Handle,
    ) -> (usize, U256, usize, (u128, Address), (u128, Address)) {
        let node = self.node(handle);
        let order = node.order_key();
        assert!(node.meta.balance > 0, "resident node with a zero balance");

        if node.color == Color::Red {
            assert_eq!(self.color_of(node.left), Color::Black, "red node with a red left child");
            assert_eq!(self.color_of(node.right), Color::Black, "red node with a red right child");
        }

        let mut count = 1;
        let mut sum = U256::from(node.meta.balance);
        let mut min_order = order;
        let mut max_order = order;

        let left_height = match node.left {
            None => 1,
            Some(left) => {
                assert_eq!(self.node(left).parent, Some(handle), "left child disowns its parent");
                let (c, s, height, child_min, child_max) = self.validate_subtree(left);
                assert!(child_max < order, "left subtree out of order");
                count += c;
                sum += s;
                min_order = child_min;
                height
            }
        };
        let right_height = match node.right {
            None => 1,
            Some(right) => {
                assert_eq!(self.node(right).parent, Some(handle), "right child disowns its parent");
                let (c, s, height, child_min, child_max) = self.validate_subtree(right);
                assert!(child_min > order, "right subtree out of order");
                count += c;
                sum += s;
                max_order = child_max;
                height
            }
        };
        assert_eq!(left_height, right_height, "black height mismatch");

        let height = left_height + usize::from(node.color == Color::Black);
        (count, sum, height, min_order, max_order)
    }
}
