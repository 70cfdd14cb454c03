//! Ordered account-balance index for Rust.
//!
//! This crate provides [`BalanceTree`], a red-black tree of account
//! identifiers ordered by balance, and [`AccountRegistry`], a thin facade
//! that maintains per-account metadata and aggregate totals on top of it.
//! All structural operations (insert, remove, stepping to a neighbor,
//! min/max) are O(log n):
//!
//! - [`insert`](BalanceTree::insert) / [`remove`](BalanceTree::remove) -
//!   link and unlink accounts, keeping the red-black invariants
//! - [`first`](BalanceTree::first) / [`last`](BalanceTree::last) /
//!   [`next`](BalanceTree::next) / [`prev`](BalanceTree::prev) - walk the
//!   `(balance, identifier)` order in either direction
//! - [`deposit`](AccountRegistry::deposit) /
//!   [`withdraw_all`](AccountRegistry::withdraw_all) /
//!   [`top_n`](AccountRegistry::top_n) - balance mutation via the
//!   remove-modify-reinsert idiom, and descending enumeration
//!
//! # Example
//!
//! ```
//! use alloy_primitives::{Address, U256};
//! use tally_tree::AccountRegistry;
//!
//! let mut registry = AccountRegistry::new();
//! let alice = Address::with_last_byte(1);
//! let bob = Address::with_last_byte(2);
//! let carol = Address::with_last_byte(3);
//!
//! registry.deposit(alice, 100)?;
//! registry.deposit(bob, 85)?;
//! registry.deposit(carol, 92)?;
//!
//! // Descending enumeration of the richest accounts (O(log n) per step).
//! assert_eq!(registry.top_n(2), vec![alice, carol]);
//!
//! // A deposit re-sorts the account in the ranking.
//! registry.deposit(bob, 20)?;
//! assert_eq!(registry.top_n(3), vec![bob, alice, carol]);
//!
//! assert_eq!(registry.total_balance(), U256::from(297));
//! # Ok::<(), tally_tree::Error>(())
//! ```
//!
//! # Design
//!
//! Accounts with a **zero balance are registered but not tree-resident**:
//! their payload stays readable, but they take no part in ordering,
//! counting, or the balance total. The all-zero identifier is a reserved
//! sentinel and is rejected outright.
//!
//! Nodes live in an append-only arena indexed by dense handles, with an
//! identifier-to-handle map for external lookup; the tree is a
//! single-writer structure with no interior locking.
//!
//! # Features
//!
//! - **`no_std` compatible** - only requires `alloc`
//! - **Deterministic order** - equal balances are tie-broken by identifier,
//!   so the order is total and insertion-order independent
//! - **Root-level aggregates** - account count and balance sum are
//!   maintained per mutation and read in O(1)

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]

extern crate alloc;

mod account;
mod error;
mod raw;

pub mod balance_tree;
pub mod registry;

pub use account::{AccountMeta, Color, NodeView};
pub use balance_tree::BalanceTree;
pub use error::{Error, Result};
pub use registry::AccountRegistry;
