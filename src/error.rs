use alloy_primitives::Address;
use thiserror::Error;

/// Errors returned by [`BalanceTree`](crate::BalanceTree) and
/// [`AccountRegistry`](crate::AccountRegistry) operations.
///
/// Every error is raised before any state is mutated, so on `Err` the tree
/// is exactly as it was before the call.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
pub enum Error {
    /// The all-zero identifier is reserved to mean "absent" and may never be
    /// inserted, removed, or stepped from.
    #[error("the null account identifier is reserved")]
    NullKey,
    /// The account is not resident in the tree.
    #[error("account {0} is not in the tree")]
    NotFound(Address),
    /// The account is already resident in the tree.
    #[error("account {0} is already in the tree")]
    Exists(Address),
}

/// Convenience alias for results carrying [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
