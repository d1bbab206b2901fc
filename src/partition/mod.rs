//! partition — population state by category.
//!
//! Purpose
//! -------
//! Own the abundance-at-age (or at-length) vectors for every category and
//! provide the views processes and observations use to reach them.
//!
//! Key behaviors
//! -------------
//! - [`Categories`] validates category names and expands label short-hand.
//! - [`Partition`] allocates and resets the per-category vectors.
//! - [`CategoriesAccessor`], [`CombinedCategories`] and
//!   [`CachedCombinedCategories`] are index-based views.
//!
//! Downstream usage
//! ----------------
//! - The model builds exactly one partition and passes it by reference in
//!   every build and execution context.
pub mod accessors;
pub mod categories;
pub mod errors;
#[allow(clippy::module_inception)]
pub mod partition;

// ---- Re-exports (primary public surface) ----
pub use self::accessors::{CachedCombinedCategories, CategoriesAccessor, CombinedCategories};
pub use self::categories::{Categories, CategoriesConfig, CategoryInfo};
pub use self::errors::{PartitionError, PartitionResult};
pub use self::partition::{Category, CategoryId, Partition, PartitionStructure};
