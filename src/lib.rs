//! chain-hashmap: a single-threaded, separately chained hash map from
//! byte strings to byte strings with a pluggable hasher.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a resizable associative container over opaque byte blobs whose
//!   chain manipulation can be reasoned about without raw pointers.
//! - Layers:
//!   - `chain::Chains`: a generational arena of entries (`slotmap`) plus
//!     a vector of bucket heads. Chains are doubly linked through arena
//!     keys, so unlinking a located entry is O(1) and resizing only
//!     rewrites links.
//!   - `ChainHashMap<H>`: owns the chains, the hasher, the sizing policy
//!     and the optional occupancy counters; runs growth/shrink checks and
//!     exposes insert/lookup/contains/remove.
//!
//! Constraints
//! - Single-threaded: no locking and no atomics. Callers sharing a table
//!   across threads must serialize access themselves.
//! - Keys and values are copied in on insert; returned values are borrows
//!   that cannot outlive the next mutating call.
//! - Keys match only on identical length and bytes.
//! - Iteration order is bucket order then chain order, and changes on
//!   every resize.
//!
//! Resizing
//! - Growth is checked in `insert` (`capacity * max_load_factor <= len`)
//!   once the key and value are copied, before a new entry's slot is
//!   computed. It repeats the growth factor until the table is under the
//!   threshold. Shrink is checked at the start of `remove`
//!   (`len <= capacity * min_load_factor`) and never goes below one bucket
//!   or onto a capacity the current entries would already overload.
//! - A resize is not incremental: every entry is relinked in one pass.
//!   Rebuilt chains are prepended to, so their order may reverse.
//!
//! Hasher and rehashing invariants
//! - Each entry stores the digest computed on insert, and rehashing folds
//!   the stored digest against the new capacity. The hasher never runs
//!   while links are being rewritten.
//! - Digests are capacity-agnostic; the table reduces them with `%`.
//!
//! Failure model
//! - Missing keys are ordinary results (`None`, `false`, `NotFound`).
//! - Key and value buffers, bucket heads and stats counters are reserved
//!   with `try_reserve_exact` before any link changes. Their allocation
//!   failure in `insert` returns `Err` and leaves the table unchanged. A
//!   shrink that cannot allocate is skipped.
//! - The entry arena (`SlotMap`) grows through an infallible allocation
//!   when a new key is linked; out of memory there aborts like any `Vec`
//!   push.

mod chain;
mod chain_hash_map;
mod chain_hash_map_proptest;
pub mod config;
mod error;
pub mod hasher;
mod stats;

// Public surface
pub use chain_hash_map::{ChainHashMap, InsertOutcome, Iter, RemoveOutcome};
pub use config::TableConfig;
pub use error::TableError;
pub use hasher::{ByteHasher, PolynomialHasher};
pub use stats::StatsSummary;
