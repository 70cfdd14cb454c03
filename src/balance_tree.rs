use core::fmt;
use core::iter::{FusedIterator, Rev};

use alloy_primitives::{Address, U256};

use crate::account::{AccountMeta, NodeView};
use crate::error::Result;
use crate::raw::{Handle, RawBalanceTree};

/// An ordered index of account balances.
///
/// `BalanceTree` keeps one node per account identifier, ordered by
/// `(balance, identifier)` in a red-black tree, and answers insert, remove,
/// membership, stepping, and aggregate queries in O(log n).
///
/// Two membership notions apply and are deliberately distinct:
///
/// - **registered** - the identifier has a stored [`AccountMeta`], whether
///   or not it currently participates in the order. Zero-balance accounts
///   and removed accounts stay registered.
/// - **resident** - the identifier is linked into the ordered structure and
///   contributes to [`len`](Self::len), [`total_balance`](Self::total_balance),
///   and iteration. Only accounts with a positive balance are resident.
///
/// The all-zero identifier is a reserved sentinel and is rejected by every
/// mutating or stepping operation.
///
/// The tree is a single-writer data structure: it does not lock, block, or
/// suspend, and callers serialize access.
///
/// # Examples
///
/// ```
/// use alloy_primitives::Address;
/// use tally_tree::{AccountMeta, BalanceTree};
///
/// let mut tree = BalanceTree::new();
/// let alice = Address::with_last_byte(1);
/// let bob = Address::with_last_byte(2);
///
/// tree.insert(alice, AccountMeta { balance: 100, active: true })?;
/// tree.insert(bob, AccountMeta { balance: 250, active: true })?;
///
/// assert_eq!(tree.len(), 2);
/// assert_eq!(tree.first(), Some(alice));
/// assert_eq!(tree.last(), Some(bob));
/// assert_eq!(tree.balance_of(bob), 250);
/// # Ok::<(), tally_tree::Error>(())
/// ```
#[derive(Clone)]
pub struct BalanceTree {
    raw: RawBalanceTree,
}

impl Default for BalanceTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceTree {
    /// Creates an empty tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            raw: RawBalanceTree::new(),
        }
    }

    /// Creates an empty tree with node storage for at least `capacity`
    /// accounts.
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_tree::BalanceTree;
    ///
    /// let tree = BalanceTree::with_capacity(32);
    /// assert!(tree.is_empty());
    /// assert!(tree.capacity() >= 32);
    /// ```
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            raw: RawBalanceTree::with_capacity(capacity),
        }
    }

    /// Returns the current node-storage capacity.
    ///
    /// Registered accounts keep their node after removal, so capacity is
    /// consumed per distinct identifier, not per resident account.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Number of resident accounts.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// True if no account is resident.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Sum of all resident balances.
    #[must_use]
    pub const fn total_balance(&self) -> U256 {
        self.raw.total_balance()
    }

    /// True iff `key` is the reserved all-zero sentinel identifier.
    #[must_use]
    pub fn is_null(key: Address) -> bool {
        key.is_zero()
    }

    /// Inserts an account.
    ///
    /// A payload with a zero balance is stored against the key but not
    /// linked into the order: the account becomes registered, not resident,
    /// and no aggregate moves. A positive balance links a node at its
    /// `(balance, identifier)` position and rebalances.
    ///
    /// # Errors
    ///
    /// [`Error::NullKey`](crate::Error::NullKey) for the sentinel key;
    /// [`Error::Exists`](crate::Error::Exists) if the key is already
    /// resident. On error nothing is mutated.
    ///
    /// # Examples
    ///
    /// ```
    /// use alloy_primitives::Address;
    /// use tally_tree::{AccountMeta, BalanceTree, Error};
    ///
    /// let mut tree = BalanceTree::new();
    /// let key = Address::with_last_byte(7);
    /// tree.insert(key, AccountMeta { balance: 42, active: true })?;
    ///
    /// assert_eq!(
    ///     tree.insert(key, AccountMeta { balance: 1, active: true }),
    ///     Err(Error::Exists(key)),
    /// );
    /// # Ok::<(), tally_tree::Error>(())
    /// ```
    pub fn insert(&mut self, key: Address, meta: AccountMeta) -> Result<()> {
        self.raw.insert(key, meta)
    }

    /// Removes a resident account from the order.
    ///
    /// The stored payload is retained unchanged, so the account stays
    /// registered and [`meta`](Self::meta) keeps answering; only the node's
    /// links are cleared and the aggregates adjusted.
    ///
    /// # Errors
    ///
    /// [`Error::NullKey`](crate::Error::NullKey) for the sentinel key;
    /// [`Error::NotFound`](crate::Error::NotFound) if the key is not
    /// resident.
    pub fn remove(&mut self, key: Address) -> Result<()> {
        self.raw.remove(key)
    }

    /// Stored payload for `key`, or the default payload if the key was
    /// never inserted. Total; does not allocate.
    #[must_use]
    pub fn meta(&self, key: Address) -> AccountMeta {
        self.raw.meta(key)
    }

    /// Balance recorded for `key`; zero if unknown.
    #[must_use]
    pub fn balance_of(&self, key: Address) -> u128 {
        self.raw.meta(key).balance
    }

    /// True iff `key` is resident (linked into the order).
    #[must_use]
    pub fn is_resident(&self, key: Address) -> bool {
        self.raw.is_resident(key)
    }

    /// True iff `key` has a stored payload, resident or not.
    #[must_use]
    pub fn is_registered(&self, key: Address) -> bool {
        self.raw.is_registered(key)
    }

    /// Resident account with the smallest `(balance, identifier)`.
    #[must_use]
    pub fn first(&self) -> Option<Address> {
        self.raw.first()
    }

    /// Resident account with the largest `(balance, identifier)`.
    #[must_use]
    pub fn last(&self) -> Option<Address> {
        self.raw.last()
    }

    /// In-order successor of `key`, or `None` when `key` is the largest
    /// resident account or not resident at all.
    ///
    /// # Errors
    ///
    /// [`Error::NullKey`](crate::Error::NullKey) for the sentinel key.
    pub fn next(&self, key: Address) -> Result<Option<Address>> {
        self.raw.next(key)
    }

    /// In-order predecessor of `key`, or `None` when `key` is the smallest
    /// resident account or not resident at all.
    ///
    /// # Errors
    ///
    /// [`Error::NullKey`](crate::Error::NullKey) for the sentinel key.
    pub fn prev(&self, key: Address) -> Result<Option<Address>> {
        self.raw.prev(key)
    }

    /// Link snapshot (parent, children, color) of a resident node.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`](crate::Error::NotFound) if the key is not
    /// resident.
    pub fn node(&self, key: Address) -> Result<NodeView> {
        self.raw.node_view(key)
    }

    /// Iterates resident accounts in ascending `(balance, identifier)`
    /// order. Does not allocate.
    ///
    /// # Examples
    ///
    /// ```
    /// use alloy_primitives::Address;
    /// use tally_tree::{AccountMeta, BalanceTree};
    ///
    /// let mut tree = BalanceTree::new();
    /// for i in [3u8, 1, 2] {
    ///     let meta = AccountMeta { balance: u128::from(i) * 10, active: true };
    ///     tree.insert(Address::with_last_byte(i), meta)?;
    /// }
    ///
    /// let balances: Vec<u128> = tree.ascending().map(|(_, balance)| balance).collect();
    /// assert_eq!(balances, [10, 20, 30]);
    /// # Ok::<(), tally_tree::Error>(())
    /// ```
    #[must_use]
    pub fn ascending(&self) -> Iter<'_> {
        Iter {
            raw: &self.raw,
            front: self.raw.first_handle(),
            back: self.raw.last_handle(),
            remaining: self.raw.len(),
        }
    }

    /// Iterates resident accounts in descending `(balance, identifier)`
    /// order. Does not allocate.
    ///
    /// Equivalent to [`ascending()`](Self::ascending)`.rev()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use alloy_primitives::Address;
    /// use tally_tree::{AccountMeta, BalanceTree};
    ///
    /// let mut tree = BalanceTree::new();
    /// for i in [3u8, 1, 2] {
    ///     let meta = AccountMeta { balance: u128::from(i) * 10, active: true };
    ///     tree.insert(Address::with_last_byte(i), meta)?;
    /// }
    ///
    /// let balances: Vec<u128> = tree.descending().map(|(_, balance)| balance).collect();
    /// assert_eq!(balances, [30, 20, 10]);
    /// # Ok::<(), tally_tree::Error>(())
    /// ```
    #[must_use]
    pub fn descending(&self) -> Rev<Iter<'_>> {
        self.ascending().rev()
    }
}

impl fmt::Debug for BalanceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.ascending()).finish()
    }
}

/// Iterator over resident accounts in `(balance, identifier)` order.
///
/// Created by [`BalanceTree::ascending`]; [`BalanceTree::descending`] is
/// the same cursor reversed. Each step is an O(log n) walk; a full pass is
/// O(n) amortized.
///
/// # Examples
///
/// ```
/// use alloy_primitives::Address;
/// use tally_tree::{AccountMeta, BalanceTree};
///
/// let mut tree = BalanceTree::new();
/// for i in [1u8, 2, 3] {
///     let meta = AccountMeta { balance: u128::from(i), active: true };
///     tree.insert(Address::with_last_byte(i), meta)?;
/// }
///
/// let mut iter = tree.ascending();
/// assert_eq!(iter.len(), 3);
/// assert_eq!(iter.next().map(|(_, b)| b), Some(1));
/// assert_eq!(iter.next_back().map(|(_, b)| b), Some(3));
/// assert_eq!(iter.next().map(|(_, b)| b), Some(2));
/// assert_eq!(iter.next(), None);
/// # Ok::<(), tally_tree::Error>(())
/// ```
#[must_use = "iterators are lazy and do nothing unless consumed"]
#[derive(Clone)]
pub struct Iter<'a> {
    raw: &'a RawBalanceTree,
    front: Option<Handle>,
    back: Option<Handle>,
    remaining: usize,
}

impl Iterator for Iter<'_> {
    type Item = (Address, u128);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.front?;
        self.remaining -= 1;
        if self.remaining == 0 {
            // The cursors met; park both ends.
            self.front = None;
            self.back = None;
        } else {
            self.front = self.raw.successor(handle);
        }
        Some(self.raw.entry(handle))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let handle = self.back?;
        self.remaining -= 1;
        if self.remaining == 0 {
            self.front = None;
            self.back = None;
        } else {
            self.back = self.raw.predecessor(handle);
        }
        Some(self.raw.entry(handle))
    }
}

impl ExactSizeIterator for Iter<'_> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl FusedIterator for Iter<'_> {}
