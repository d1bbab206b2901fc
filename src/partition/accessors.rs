//! partition::accessors — category views over the partition.
//!
//! Purpose
//! -------
//! Processes and observations never hold category data directly; they hold
//! one of these lightweight views (vectors of [`CategoryId`]) and borrow
//! the [`Partition`] when they execute.
//!
//! Key behaviors
//! -------------
//! - [`CategoriesAccessor`]: flat list of categories, filtered to those
//!   active in the current year on iteration.
//! - [`CombinedCategories`]: groups of categories (`"male+female"` is one
//!   group of two), re-resolved per year.
//! - [`CachedCombinedCategories`]: combined groups plus a snapshot of their
//!   data taken before a time step runs, for before/after interpolation.
//!
//! Invariants & assumptions
//! ------------------------
//! - Views must be rebuilt if the partition is rebuilt; resets are fine
//!   because ids and widths survive them.
use crate::partition::{
    errors::PartitionResult,
    partition::{CategoryId, Partition},
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoriesAccessor {
    labels: Vec<String>,
    ids: Vec<CategoryId>,
}

impl CategoriesAccessor {
    pub fn new(partition: &Partition, labels: &[String]) -> PartitionResult<Self> {
        let ids = labels.iter().map(|l| partition.id(l)).collect::<PartitionResult<Vec<_>>>()?;
        Ok(Self { labels: labels.to_vec(), ids })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn ids(&self) -> &[CategoryId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// `(position, id)` for categories active in `year`.
    pub fn active<'a>(
        &'a self, partition: &'a Partition, year: u32,
    ) -> impl Iterator<Item = (usize, CategoryId)> + 'a {
        self.ids.iter().copied().enumerate().filter(move |(_, id)| partition.get(*id).is_active(year))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CombinedCategories {
    labels: Vec<String>,
    groups: Vec<Vec<CategoryId>>,
}

impl CombinedCategories {
    /// Each label becomes one group; `+` joins members.
    pub fn new(partition: &Partition, labels: &[String]) -> PartitionResult<Self> {
        let mut groups = Vec::with_capacity(labels.len());
        for label in labels {
            let members =
                label.split('+').map(|l| partition.id(l)).collect::<PartitionResult<Vec<_>>>()?;
            groups.push(members);
        }
        Ok(Self { labels: labels.to_vec(), groups })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn groups(&self) -> &[Vec<CategoryId>] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Members of group `g` that are defined in `year`.
    pub fn members_in_year(&self, partition: &Partition, g: usize, year: u32) -> Vec<CategoryId> {
        self.groups[g].iter().copied().filter(|id| partition.get(*id).is_active(year)).collect()
    }

    /// Slot-wise sum of the active members of group `g`.
    pub fn group_data(&self, partition: &Partition, g: usize, year: u32) -> Vec<f64> {
        let mut out = vec![0.0; partition.width()];
        for id in self.members_in_year(partition, g, year) {
            for (slot, value) in out.iter_mut().zip(&partition.get(id).data) {
                *slot += value;
            }
        }
        out
    }
}

/// Combined groups with a pre-time-step snapshot.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CachedCombinedCategories {
    combined: CombinedCategories,
    cache: Vec<Vec<Vec<f64>>>,
}

impl CachedCombinedCategories {
    pub fn new(partition: &Partition, labels: &[String]) -> PartitionResult<Self> {
        let combined = CombinedCategories::new(partition, labels)?;
        let cache = combined
            .groups()
            .iter()
            .map(|g| vec![vec![0.0; partition.width()]; g.len()])
            .collect();
        Ok(Self { combined, cache })
    }

    pub fn combined(&self) -> &CombinedCategories {
        &self.combined
    }

    /// Snapshot every member's data.
    pub fn build_cache(&mut self, partition: &Partition) {
        for (g, group) in self.combined.groups().iter().enumerate() {
            for (m, id) in group.iter().enumerate() {
                self.cache[g][m].copy_from_slice(&partition.get(*id).data);
            }
        }
    }

    pub fn cached(&self, g: usize, m: usize) -> &[f64] {
        &self.cache[g][m]
    }

    /// `before + (after - before) * proportion`, slot-wise, for group `g`
    /// member `m`.
    pub fn interpolate(&self, partition: &Partition, g: usize, m: usize, proportion: f64) -> Vec<f64> {
        let after = &partition.get(self.combined.groups()[g][m]).data;
        self.cache[g][m].iter().zip(after).map(|(b, a)| b + (a - b) * proportion).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{
        categories::{Categories, CategoriesConfig},
        partition::PartitionStructure,
    };
    use std::collections::BTreeMap;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Year filtering for flat and combined accessors.
    // - Slot-wise sums over combined groups.
    // - Cache snapshots and before/after interpolation.
    //
    // They intentionally DO NOT cover:
    // - Short-hand expansion (see categories.rs).
    // -------------------------------------------------------------------------

    fn partition() -> Partition {
        let mut years = BTreeMap::new();
        years.insert("female".to_string(), vec![2001]);
        let cats = Categories::new(&CategoriesConfig {
            format: String::new(),
            names: vec!["male".to_string(), "female".to_string()],
            age_lengths: vec![],
            years,
        })
        .unwrap();
        Partition::build(PartitionStructure::Age, 1, 3, true, &[], &cats, |_| None).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Categories restricted to certain years are skipped elsewhere.
    //
    // Given
    // -----
    // - "female" only defined in 2001.
    //
    // Expect
    // ------
    // - In 2000 only "male" is active; in 2001 both are.
    fn accessor_filters_by_year() {
        // Arrange
        let p = partition();
        let acc =
            CategoriesAccessor::new(&p, &["male".to_string(), "female".to_string()]).unwrap();

        // Act
        let y2000: Vec<_> = acc.active(&p, 2000).collect();
        let y2001: Vec<_> = acc.active(&p, 2001).collect();

        // Assert
        assert_eq!(y2000.len(), 1);
        assert_eq!(y2001.len(), 2);
    }

    #[test]
    // Purpose
    // -------
    // Combined groups sum their active members slot-wise.
    //
    // Given
    // -----
    // - male = [1,2,3], female = [10,20,30], group "male+female".
    //
    // Expect
    // ------
    // - [11,22,33] in 2001; [1,2,3] in 2000.
    fn combined_group_sums_members() {
        // Arrange
        let mut p = partition();
        p.category_mut("male").unwrap().data = vec![1.0, 2.0, 3.0];
        p.category_mut("female").unwrap().data = vec![10.0, 20.0, 30.0];
        let combined = CombinedCategories::new(&p, &["male+female".to_string()]).unwrap();

        // Act
        let both = combined.group_data(&p, 0, 2001);
        let male_only = combined.group_data(&p, 0, 2000);

        // Assert
        assert_eq!(both, vec![11.0, 22.0, 33.0]);
        assert_eq!(male_only, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    // Purpose
    // -------
    // The cache keeps pre-step values and interpolates toward current ones.
    //
    // Given
    // -----
    // - male = [10,10,10] cached, then halved.
    //
    // Expect
    // ------
    // - Cached values unchanged; proportion 0.5 gives 7.5.
    fn cache_interpolates_between_snapshots() {
        // Arrange
        let mut p = partition();
        p.category_mut("male").unwrap().data = vec![10.0; 3];
        let mut cached = CachedCombinedCategories::new(&p, &["male".to_string()]).unwrap();
        cached.build_cache(&p);

        // Act
        p.category_mut("male").unwrap().data = vec![5.0; 3];
        let mid = cached.interpolate(&p, 0, 0, 0.5);

        // Assert
        assert_eq!(cached.cached(0, 0), &[10.0, 10.0, 10.0]);
        assert!(mid.iter().all(|v| (v - 7.5).abs() < 1e-12));
    }
}
