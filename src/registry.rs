use alloc::vec::Vec;

use alloy_primitives::{Address, U256};

use crate::account::AccountMeta;
use crate::balance_tree::BalanceTree;
use crate::error::{Error, Result};

/// Account registry over a [`BalanceTree`].
///
/// The registry owns the tree and routes every mutation through it, at
/// most one tree mutation per call. A balance change is a structural event:
/// the account is removed, its payload edited, and reinserted so the tree
/// re-sorts it (the remove-modify-reinsert idiom).
///
/// The registry is single-writer like the tree underneath it; a host that
/// shares it across threads wraps the whole registry in a reader-writer
/// lock.
///
/// # Examples
///
/// ```
/// use alloy_primitives::Address;
/// use tally_tree::AccountRegistry;
///
/// let mut registry = AccountRegistry::new();
/// let alice = Address::with_last_byte(1);
/// let bob = Address::with_last_byte(2);
///
/// registry.deposit(alice, 100)?;
/// registry.deposit(bob, 250)?;
/// registry.deposit(alice, 200)?;
///
/// assert_eq!(registry.top_n(10), vec![alice, bob]);
/// assert_eq!(registry.withdraw_all(bob)?, 250);
/// assert_eq!(registry.len(), 1);
/// # Ok::<(), tally_tree::Error>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct AccountRegistry {
    tree: BalanceTree,
}

impl AccountRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tree: BalanceTree::new(),
        }
    }

    /// Creates an empty registry with storage for at least `capacity`
    /// accounts.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tree: BalanceTree::with_capacity(capacity),
        }
    }

    /// Returns the current account-storage capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.tree.capacity()
    }

    /// Number of accounts with a positive balance.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// True if no account holds a positive balance.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Sum of all positive balances.
    #[must_use]
    pub const fn total_balance(&self) -> U256 {
        self.tree.total_balance()
    }

    /// Balance held by `key`; zero if unknown.
    #[must_use]
    pub fn balance_of(&self, key: Address) -> u128 {
        self.tree.balance_of(key)
    }

    /// Whether `key` is marked active.
    #[must_use]
    pub fn is_active(&self, key: Address) -> bool {
        self.tree.meta(key).active
    }

    /// Whether `key` has ever been deposited to.
    #[must_use]
    pub fn is_registered(&self, key: Address) -> bool {
        self.tree.is_registered(key)
    }

    /// Read-only view of the underlying tree.
    #[must_use]
    pub const fn tree(&self) -> &BalanceTree {
        &self.tree
    }

    /// Credits `delta` to `key` and re-sorts the account.
    ///
    /// If the account is resident it is first removed, so the tree sees the
    /// balance change as remove-modify-reinsert. The account is marked
    /// active. A first deposit of zero registers the account without making
    /// it resident.
    ///
    /// # Errors
    ///
    /// [`Error::NullKey`](crate::Error::NullKey) for the sentinel key.
    ///
    /// # Panics
    ///
    /// Panics if the balance would exceed `u128::MAX`; bounding deposits is
    /// the caller's contract.
    pub fn deposit(&mut self, key: Address, delta: u128) -> Result<()> {
        if self.tree.is_resident(key) {
            self.tree.remove(key)?;
        }
        let mut meta = self.tree.meta(key);
        meta.balance = meta
            .balance
            .checked_add(delta)
            .expect("`AccountRegistry::deposit()` - balance overflow!");
        meta.active = true;
        self.tree.insert(key, meta)
    }

    /// Withdraws the full balance of `key`, deactivates the account, and
    /// returns the withdrawn amount.
    ///
    /// The caller effects the external transfer of the returned amount; the
    /// registry's bookkeeping and that transfer must succeed together. An
    /// unknown key withdraws zero and is not registered by the attempt.
    ///
    /// # Errors
    ///
    /// [`Error::NullKey`](crate::Error::NullKey) for the sentinel key.
    pub fn withdraw_all(&mut self, key: Address) -> Result<u128> {
        if self.tree.is_resident(key) {
            self.tree.remove(key)?;
        } else if !self.tree.is_registered(key) {
            return if key.is_zero() { Err(Error::NullKey) } else { Ok(0) };
        }
        let amount = self.tree.meta(key).balance;
        self.tree.insert(key, AccountMeta { balance: 0, active: false })?;
        Ok(amount)
    }

    /// Up to `min(n, len)` account identifiers in descending balance order.
    ///
    /// Allocates nothing beyond the returned vector; an empty tree yields
    /// an empty vector.
    #[must_use]
    pub fn top_n(&self, n: usize) -> Vec<Address> {
        self.tree.descending().take(n).map(|(key, _)| key).collect()
    }
}
