//! partition::partition — owned per-category abundance storage.
//!
//! Purpose
//! -------
//! Own one numeric vector per category (abundance by age, or by length
//! bin) for the current model year. Everything else in the engine reads
//! or mutates these vectors through [`CategoryId`] handles.
//!
//! Key behaviors
//! -------------
//! - [`Partition::build`] allocates zero-filled vectors of the model width
//!   once; the width never changes afterwards.
//! - [`Partition::reset`] zeroes every vector at the start of each run.
//! - Label lookups are O(1) through a hash index; ids are stable for the
//!   partition's lifetime.
//!
//! Invariants & assumptions
//! ------------------------
//! - `data.len() == width()` for every category, always.
//! - A [`CategoryId`] is only ever produced by the partition that owns it.
//!
//! Conventions
//! -----------
//! - Slot `i` of an age partition holds age `min_age + i`; with a plus
//!   group the last slot accumulates ages `>= max_age`.
//! - Mean weight per slot is maintained by the model from the category's
//!   age-length relationship; it is `1.0` when none is configured.
use std::collections::HashMap;

use serde::Deserialize;

use crate::partition::{
    categories::Categories,
    errors::{PartitionError, PartitionResult},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStructure {
    #[default]
    Age,
    Length,
}

/// Stable handle to a category inside a [`Partition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(pub usize);

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: String,
    pub min_age: u32,
    pub max_age: u32,
    /// Empty means every model year.
    pub years: Vec<u32>,
    pub age_length: Option<usize>,
    pub data: Vec<f64>,
    pub mean_weight: Vec<f64>,
}

impl Category {
    pub fn is_active(&self, year: u32) -> bool {
        self.years.is_empty() || self.years.contains(&year)
    }

    pub fn total(&self) -> f64 {
        self.data.iter().sum()
    }

    /// Slot index holding `age`, if inside the category's age range.
    pub fn age_index(&self, age: u32) -> Option<usize> {
        if age < self.min_age || age > self.max_age {
            None
        } else {
            Some((age - self.min_age) as usize)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    structure: PartitionStructure,
    min_age: u32,
    max_age: u32,
    plus_group: bool,
    length_bins: Vec<f64>,
    categories: Vec<Category>,
    index: HashMap<String, CategoryId>,
}

impl Partition {
    /// Allocate one zero-filled vector per configured category.
    ///
    /// Parameters
    /// ----------
    /// - `age_length_index`: resolves an age-length label to the model's
    ///   index for it; `None` means the label is not defined.
    ///
    /// Errors
    /// ------
    /// - `InvalidDimensions` for an empty age range or missing length bins.
    /// - `UnknownAgeLength` when a category references an undefined
    ///   age-length.
    pub fn build<F>(
        structure: PartitionStructure, min_age: u32, max_age: u32, plus_group: bool,
        length_bins: &[f64], categories: &Categories, age_length_index: F,
    ) -> PartitionResult<Self>
    where
        F: Fn(&str) -> Option<usize>,
    {
        if max_age < min_age {
            return Err(PartitionError::InvalidDimensions {
                reason: format!("max_age ({max_age}) is less than min_age ({min_age})"),
            });
        }
        if structure == PartitionStructure::Length {
            if length_bins.is_empty() {
                return Err(PartitionError::InvalidDimensions {
                    reason: "a length partition requires length_bins".to_string(),
                });
            }
            if length_bins.windows(2).any(|w| w[1] <= w[0]) {
                return Err(PartitionError::InvalidDimensions {
                    reason: "length_bins must be strictly increasing".to_string(),
                });
            }
        }
        let width = match structure {
            PartitionStructure::Age => (max_age - min_age + 1) as usize,
            PartitionStructure::Length if plus_group => length_bins.len(),
            PartitionStructure::Length => length_bins.len().saturating_sub(1),
        };
        if width == 0 {
            return Err(PartitionError::InvalidDimensions {
                reason: "partition would have no slots".to_string(),
            });
        }
        let mut items = Vec::with_capacity(categories.len());
        let mut index = HashMap::with_capacity(categories.len());
        for info in categories.infos() {
            let age_length = match &info.age_length {
                Some(label) => Some(age_length_index(label).ok_or_else(|| {
                    PartitionError::UnknownAgeLength {
                        category: info.name.clone(),
                        age_length: label.clone(),
                    }
                })?),
                None => None,
            };
            index.insert(info.name.clone(), CategoryId(items.len()));
            items.push(Category {
                name: info.name.clone(),
                min_age,
                max_age,
                years: info.years.clone(),
                age_length,
                data: vec![0.0; width],
                mean_weight: vec![1.0; width],
            });
        }
        Ok(Self {
            structure,
            min_age,
            max_age,
            plus_group,
            length_bins: length_bins.to_vec(),
            categories: items,
            index,
        })
    }

    /// Zero every category's data; dimensions are untouched.
    pub fn reset(&mut self) {
        for category in &mut self.categories {
            category.data.iter_mut().for_each(|v| *v = 0.0);
        }
    }

    pub fn structure(&self) -> PartitionStructure {
        self.structure
    }

    pub fn min_age(&self) -> u32 {
        self.min_age
    }

    pub fn max_age(&self) -> u32 {
        self.max_age
    }

    pub fn plus_group(&self) -> bool {
        self.plus_group
    }

    pub fn width(&self) -> usize {
        self.categories.first().map_or(0, |c| c.data.len())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Evaluation points for selectivities: ages, or length-bin midpoints
    /// (the lower edge for the plus bin).
    pub fn x_values(&self) -> Vec<f64> {
        match self.structure {
            PartitionStructure::Age => (self.min_age..=self.max_age).map(f64::from).collect(),
            PartitionStructure::Length => (0..self.width())
                .map(|i| match self.length_bins.get(i + 1) {
                    Some(upper) => 0.5 * (self.length_bins[i] + upper),
                    None => self.length_bins[i],
                })
                .collect(),
        }
    }

    pub fn id(&self, label: &str) -> PartitionResult<CategoryId> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| PartitionError::UnknownCategory { label: label.to_string() })
    }

    pub fn category(&self, label: &str) -> PartitionResult<&Category> {
        let id = self.id(label)?;
        Ok(&self.categories[id.0])
    }

    pub fn category_mut(&mut self, label: &str) -> PartitionResult<&mut Category> {
        let id = self.id(label)?;
        Ok(&mut self.categories[id.0])
    }

    pub fn get(&self, id: CategoryId) -> &Category {
        &self.categories[id.0]
    }

    pub fn get_mut(&mut self, id: CategoryId) -> &mut Category {
        &mut self.categories[id.0]
    }

    /// Mutable access to two distinct categories at once.
    pub fn pair_mut(&mut self, a: CategoryId, b: CategoryId) -> (&mut Category, &mut Category) {
        debug_assert_ne!(a, b);
        if a.0 < b.0 {
            let (left, right) = self.categories.split_at_mut(b.0);
            (&mut left[a.0], &mut right[0])
        } else {
            let (left, right) = self.categories.split_at_mut(a.0);
            (&mut right[0], &mut left[b.0])
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Category> {
        self.categories.iter_mut()
    }
}
