use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use thiserror::Error;

use super::model::{Field, FieldValue, SalaryDataset, SalaryRecord};
use super::reduce::Reducer;

/// One bit per dimension in the per-record filter mask.
pub const MAX_DIMENSIONS: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    #[error("dimension {0} does not belong to this index")]
    UnknownDimension(usize),
    #[error("an index supports at most {MAX_DIMENSIONS} dimensions")]
    TooManyDimensions,
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Handle to a dimension registered on a [`CrossFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DimensionId(usize);

/// The active filter of one dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DimensionFilter {
    /// No constraint.
    #[default]
    All,
    Exact(FieldValue),
    /// Half-open: `lo <= key < hi`.
    Range { lo: FieldValue, hi: FieldValue },
    /// Any of the listed keys. An empty set rejects everything.
    Set(BTreeSet<FieldValue>),
}

impl DimensionFilter {
    pub fn accepts(&self, key: &FieldValue) -> bool {
        match self {
            DimensionFilter::All => true,
            DimensionFilter::Exact(k) => k == key,
            DimensionFilter::Range { lo, hi } => lo <= key && key < hi,
            DimensionFilter::Set(keys) => keys.contains(key),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, DimensionFilter::All)
    }

    /// Toggle `key` in a multi-key filter, the way clicking a bar does.
    /// Removing the last key falls back to [`DimensionFilter::All`].
    pub fn toggled(&self, key: &FieldValue) -> DimensionFilter {
        let mut keys = match self {
            DimensionFilter::All => BTreeSet::new(),
            DimensionFilter::Exact(k) => BTreeSet::from([k.clone()]),
            DimensionFilter::Set(keys) => keys.clone(),
            DimensionFilter::Range { .. } => BTreeSet::new(),
        };
        if !keys.remove(key) {
            keys.insert(key.clone());
        }
        if keys.is_empty() {
            DimensionFilter::All
        } else {
            DimensionFilter::Set(keys)
        }
    }
}

struct Dimension {
    /// Key of every record, in record order.
    keys: Vec<FieldValue>,
    /// Record indices ordered by key.
    sorted: Vec<usize>,
    filter: DimensionFilter,
}

// ---------------------------------------------------------------------------
// Groups
// ---------------------------------------------------------------------------

/// Type-erased view of a group, driven by the index on filter changes.
trait GroupSink {
    /// The dimension whose filter this group ignores.
    fn observed(&self) -> Option<usize>;
    fn add(&mut self, record: &SalaryRecord, key: Option<&FieldValue>);
    fn remove(&mut self, record: &SalaryRecord, key: Option<&FieldValue>);
}

struct KeyedGroup<R: Reducer> {
    reducer: R,
    dimension: usize,
    values: BTreeMap<FieldValue, R::Acc>,
}

impl<R: Reducer> GroupSink for KeyedGroup<R> {
    fn observed(&self) -> Option<usize> {
        Some(self.dimension)
    }

    fn add(&mut self, record: &SalaryRecord, key: Option<&FieldValue>) {
        if let Some(acc) = key.and_then(|k| self.values.get_mut(k)) {
            self.reducer.add(acc, record);
        }
    }

    fn remove(&mut self, record: &SalaryRecord, key: Option<&FieldValue>) {
        if let Some(acc) = key.and_then(|k| self.values.get_mut(k)) {
            self.reducer.remove(acc, record);
        }
    }
}

struct TotalGroup<R: Reducer> {
    reducer: R,
    value: R::Acc,
}

impl<R: Reducer> GroupSink for TotalGroup<R> {
    fn observed(&self) -> Option<usize> {
        None
    }

    fn add(&mut self, record: &SalaryRecord, _key: Option<&FieldValue>) {
        self.reducer.add(&mut self.value, record);
    }

    fn remove(&mut self, record: &SalaryRecord, _key: Option<&FieldValue>) {
        self.reducer.remove(&mut self.value, record);
    }
}

/// A key → aggregate mapping over one dimension.
///
/// The group sees every filter except its own dimension's, so a chart never
/// filters away its own bars.
pub struct Group<R: Reducer> {
    dimension: DimensionId,
    state: Rc<RefCell<KeyedGroup<R>>>,
}

impl<R: Reducer> Clone for Group<R> {
    fn clone(&self) -> Self {
        Self {
            dimension: self.dimension,
            state: Rc::clone(&self.state),
        }
    }
}

impl<R: Reducer> Group<R> {
    pub fn dimension(&self) -> DimensionId {
        self.dimension
    }

    /// Every key of the dimension with its current aggregate, ordered by key.
    pub fn all(&self) -> Vec<(FieldValue, R::Acc)> {
        self.state
            .borrow()
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn get(&self, key: &FieldValue) -> Option<R::Acc> {
        self.state.borrow().values.get(key).cloned()
    }

    pub fn size(&self) -> usize {
        self.state.borrow().values.len()
    }
}

/// A single aggregate over every record passing all filters.
pub struct GroupAll<R: Reducer> {
    state: Rc<RefCell<TotalGroup<R>>>,
}

impl<R: Reducer> Clone for GroupAll<R> {
    fn clone(&self) -> Self {
        Self {
            state: Rc::clone(&self.state),
        }
    }
}

impl<R: Reducer> GroupAll<R> {
    pub fn value(&self) -> R::Acc {
        self.state.borrow().value.clone()
    }
}

// ---------------------------------------------------------------------------
// CrossFilter
// ---------------------------------------------------------------------------

/// Multi-dimensional filtering index over one dataset.
///
/// Each record carries a bitmask with one bit per dimension whose filter
/// rejects it. A record is selected when its mask is zero. Changing a
/// filter only touches records whose bit flips, and each group is told to
/// add or remove exactly those records whose visibility to it changed.
pub struct CrossFilter {
    records: Vec<SalaryRecord>,
    masks: Vec<u64>,
    dimensions: Vec<Dimension>,
    groups: Vec<Rc<RefCell<dyn GroupSink>>>,
}

impl CrossFilter {
    pub fn new(dataset: SalaryDataset) -> Self {
        let n = dataset.records.len();
        Self {
            records: dataset.records,
            masks: vec![0; n],
            dimensions: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Total number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records passing every filter.
    pub fn selected_count(&self) -> usize {
        self.masks.iter().filter(|m| **m == 0).count()
    }

    /// Records passing every filter, in load order.
    pub fn selected(&self) -> impl Iterator<Item = &SalaryRecord> + '_ {
        self.records
            .iter()
            .zip(&self.masks)
            .filter(|(_, m)| **m == 0)
            .map(|(r, _)| r)
    }

    /// Register a dimension keyed by `key_fn`.
    pub fn dimension<F>(&mut self, key_fn: F) -> Result<DimensionId, IndexError>
    where
        F: Fn(&SalaryRecord) -> FieldValue,
    {
        if self.dimensions.len() >= MAX_DIMENSIONS {
            return Err(IndexError::TooManyDimensions);
        }
        let keys: Vec<FieldValue> = self.records.iter().map(&key_fn).collect();
        let mut sorted: Vec<usize> = (0..keys.len()).collect();
        sorted.sort_by(|&a, &b| keys[a].cmp(&keys[b]));

        let id = DimensionId(self.dimensions.len());
        self.dimensions.push(Dimension {
            keys,
            sorted,
            filter: DimensionFilter::All,
        });
        log::debug!("registered dimension {}", id.0);
        Ok(id)
    }

    /// Register a dimension keyed by a single field.
    pub fn dimension_on(&mut self, field: Field) -> Result<DimensionId, IndexError> {
        self.dimension(move |r| field.pluck(r))
    }

    fn dim(&self, id: DimensionId) -> Result<&Dimension, IndexError> {
        self.dimensions
            .get(id.0)
            .ok_or(IndexError::UnknownDimension(id.0))
    }

    pub fn filter_of(&self, id: DimensionId) -> Result<&DimensionFilter, IndexError> {
        Ok(&self.dim(id)?.filter)
    }

    /// Replace the filter on one dimension and update every group.
    pub fn filter(&mut self, id: DimensionId, filter: DimensionFilter) -> Result<(), IndexError> {
        self.dim(id)?;
        self.set_filter(id.0, filter);
        Ok(())
    }

    /// Clear every dimension's filter.
    pub fn filter_all(&mut self) {
        for d in 0..self.dimensions.len() {
            self.set_filter(d, DimensionFilter::All);
        }
    }

    /// `d` must be a registered dimension.
    fn set_filter(&mut self, d: usize, filter: DimensionFilter) {
        let dimension = &mut self.dimensions[d];
        if dimension.filter == filter {
            return;
        }
        dimension.filter = filter;

        let bit = 1u64 << d;
        let mut changed = Vec::new();
        for (i, key) in dimension.keys.iter().enumerate() {
            let old = self.masks[i];
            let new = if dimension.filter.accepts(key) {
                old & !bit
            } else {
                old | bit
            };
            if new != old {
                self.masks[i] = new;
                changed.push((i, old, new));
            }
        }

        for group in &self.groups {
            let mut group = group.borrow_mut();
            let observed = group.observed();
            let ignore = observed.map_or(0, |o| 1u64 << o);
            for &(i, old, new) in &changed {
                let before = old & !ignore == 0;
                let after = new & !ignore == 0;
                if before == after {
                    continue;
                }
                let key = observed.map(|o| &self.dimensions[o].keys[i]);
                if after {
                    group.add(&self.records[i], key);
                } else {
                    group.remove(&self.records[i], key);
                }
            }
        }

        log::debug!(
            "dimension {d} filter changed: {} records moved, {} selected",
            changed.len(),
            self.selected_count()
        );
    }

    /// Group a dimension by key with a custom reducer.
    pub fn group<R>(&mut self, id: DimensionId, reducer: R) -> Result<Group<R>, IndexError>
    where
        R: Reducer + 'static,
    {
        let dimension = self.dim(id)?;
        let ignore = 1u64 << id.0;

        let mut values: BTreeMap<FieldValue, R::Acc> = BTreeMap::new();
        for key in &dimension.keys {
            values.entry(key.clone()).or_insert_with(|| reducer.initial());
        }
        for (i, key) in dimension.keys.iter().enumerate() {
            if self.masks[i] & !ignore == 0 {
                if let Some(acc) = values.get_mut(key) {
                    reducer.add(acc, &self.records[i]);
                }
            }
        }

        let state = Rc::new(RefCell::new(KeyedGroup {
            reducer,
            dimension: id.0,
            values,
        }));
        let sink: Rc<RefCell<dyn GroupSink>> = state.clone();
        self.groups.push(sink);
        Ok(Group {
            dimension: id,
            state,
        })
    }

    /// A single aggregate over all selected records.
    pub fn group_all<R>(&mut self, reducer: R) -> GroupAll<R>
    where
        R: Reducer + 'static,
    {
        let mut value = reducer.initial();
        for record in self.selected() {
            reducer.add(&mut value, record);
        }
        let state = Rc::new(RefCell::new(TotalGroup { reducer, value }));
        let sink: Rc<RefCell<dyn GroupSink>> = state.clone();
        self.groups.push(sink);
        GroupAll { state }
    }

    /// The `k` selected records with the largest keys, largest first.
    pub fn top(&self, id: DimensionId, k: usize) -> Result<Vec<&SalaryRecord>, IndexError> {
        let dimension = self.dim(id)?;
        Ok(dimension
            .sorted
            .iter()
            .rev()
            .filter(|&&i| self.masks[i] == 0)
            .take(k)
            .map(|&i| &self.records[i])
            .collect())
    }

    /// The `k` selected records with the smallest keys, smallest first.
    pub fn bottom(&self, id: DimensionId, k: usize) -> Result<Vec<&SalaryRecord>, IndexError> {
        let dimension = self.dim(id)?;
        Ok(dimension
            .sorted
            .iter()
            .filter(|&&i| self.masks[i] == 0)
            .take(k)
            .map(|&i| &self.records[i])
            .collect())
    }

    /// Smallest and largest integer key over all records.
    pub fn extent(&self, id: DimensionId) -> Result<Option<(i64, i64)>, IndexError> {
        let dimension = self.dim(id)?;
        let numeric = |&i: &usize| dimension.keys[i].as_i64();
        let min = dimension.sorted.iter().find_map(numeric);
        let max = dimension.sorted.iter().rev().find_map(numeric);
        Ok(min.zip(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::reduce::{AverageSalary, CountReducer, GenderRankMatch};

    fn rec(
        discipline: &str,
        sex: &str,
        rank: &str,
        service: Option<i64>,
        salary: i64,
    ) -> SalaryRecord {
        SalaryRecord {
            discipline: discipline.into(),
            sex: sex.into(),
            rank: rank.into(),
            yrs_service: service,
            yrs_since_phd: service.map(|s| s + 2),
            salary: Some(salary),
        }
    }

    fn sample() -> CrossFilter {
        let records = vec![
            rec("A", "Female", "Prof", Some(12), 100000),
            rec("A", "Male", "AsstProf", Some(3), 70000),
            rec("B", "Male", "Prof", Some(45), 150000),
            rec("B", "Female", "AssocProf", Some(7), 90000),
            rec("B", "Male", "Prof", Some(0), 110000),
            rec("A", "Male", "AssocProf", None, 95000),
        ];
        CrossFilter::new(SalaryDataset::from_records(records, Vec::new()))
    }

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    #[test]
    fn group_counts_every_key() {
        let mut cf = sample();
        let sex = cf.dimension_on(Field::Sex).unwrap();
        let counts = cf.group(sex, CountReducer).unwrap();
        assert_eq!(counts.all(), vec![(text("Female"), 2), (text("Male"), 4)]);
    }

    #[test]
    fn filter_updates_other_dimensions_only() {
        let mut cf = sample();
        let discipline = cf.dimension_on(Field::Discipline).unwrap();
        let sex = cf.dimension_on(Field::Sex).unwrap();
        let by_discipline = cf.group(discipline, CountReducer).unwrap();
        let by_sex = cf.group(sex, CountReducer).unwrap();

        cf.filter(discipline, DimensionFilter::Exact(text("B"))).unwrap();

        assert_eq!(by_sex.get(&text("Female")), Some(1));
        assert_eq!(by_sex.get(&text("Male")), Some(2));
        // The discipline group ignores its own filter.
        assert_eq!(by_discipline.get(&text("A")), Some(3));
        assert_eq!(cf.selected_count(), 3);
    }

    #[test]
    fn clearing_filters_restores_groups_exactly() {
        let mut cf = sample();
        let discipline = cf.dimension_on(Field::Discipline).unwrap();
        let sex = cf.dimension_on(Field::Sex).unwrap();
        let avg = cf.group(sex, AverageSalary).unwrap();
        let before = avg.all();

        for _ in 0..5 {
            cf.filter(discipline, DimensionFilter::Exact(text("A"))).unwrap();
            cf.filter(discipline, DimensionFilter::Exact(text("B"))).unwrap();
            cf.filter(sex, DimensionFilter::Exact(text("Male"))).unwrap();
        }
        cf.filter_all();

        assert_eq!(avg.all(), before);
        assert_eq!(cf.selected_count(), cf.len());
    }

    #[test]
    fn emptied_key_stays_in_group() {
        let mut cf = sample();
        let discipline = cf.dimension_on(Field::Discipline).unwrap();
        let sex = cf.dimension_on(Field::Sex).unwrap();
        let avg = cf.group(sex, AverageSalary).unwrap();

        cf.filter(discipline, DimensionFilter::Set(BTreeSet::new())).unwrap();

        let female = avg.get(&text("Female")).unwrap();
        assert_eq!(female.count, 0);
        assert_eq!(female.average, 0.0);
        assert_eq!(avg.size(), 2);
    }

    #[test]
    fn group_all_sees_every_filter() {
        let mut cf = sample();
        let discipline = cf.dimension_on(Field::Discipline).unwrap();
        let women = cf.group_all(GenderRankMatch::new("Female", "Prof"));
        assert_eq!(women.value().count, 2);
        assert_eq!(women.value().ratio(), 0.5);

        cf.filter(discipline, DimensionFilter::Exact(text("B"))).unwrap();
        assert_eq!(women.value().count, 1);
        assert_eq!(women.value().ratio(), 0.0);
    }

    #[test]
    fn group_created_after_filter_starts_filtered() {
        let mut cf = sample();
        let discipline = cf.dimension_on(Field::Discipline).unwrap();
        cf.filter(discipline, DimensionFilter::Exact(text("A"))).unwrap();
        let sex = cf.dimension_on(Field::Sex).unwrap();
        let counts = cf.group(sex, CountReducer).unwrap();
        assert_eq!(counts.get(&text("Male")), Some(2));
    }

    #[test]
    fn extent_ignores_missing_keys() {
        let mut cf = sample();
        let service = cf.dimension_on(Field::YrsService).unwrap();
        assert_eq!(cf.extent(service).unwrap(), Some((0, 45)));
    }

    #[test]
    fn top_and_bottom_respect_filters() {
        let mut cf = sample();
        let salary = cf.dimension_on(Field::Salary).unwrap();
        let sex = cf.dimension_on(Field::Sex).unwrap();

        let top = cf.top(salary, 2).unwrap();
        assert_eq!(top[0].salary, Some(150000));
        assert_eq!(top[1].salary, Some(110000));

        cf.filter(sex, DimensionFilter::Exact(text("Female"))).unwrap();
        let bottom = cf.bottom(salary, 5).unwrap();
        let salaries: Vec<_> = bottom.iter().map(|r| r.salary).collect();
        assert_eq!(salaries, vec![Some(90000), Some(100000)]);
    }

    #[test]
    fn range_filter_is_half_open() {
        let f = DimensionFilter::Range {
            lo: FieldValue::Integer(3),
            hi: FieldValue::Integer(7),
        };
        assert!(f.accepts(&FieldValue::Integer(3)));
        assert!(!f.accepts(&FieldValue::Integer(7)));
    }

    #[test]
    fn toggling_keys() {
        let f = DimensionFilter::All.toggled(&text("Male"));
        assert_eq!(f, DimensionFilter::Set(BTreeSet::from([text("Male")])));
        let f = f.toggled(&text("Female"));
        assert!(f.accepts(&text("Female")) && f.accepts(&text("Male")));
        let f = f.toggled(&text("Male")).toggled(&text("Female"));
        assert!(f.is_all());
    }

    #[test]
    fn dimension_limit() {
        let mut cf = sample();
        for _ in 0..MAX_DIMENSIONS {
            cf.dimension_on(Field::Rank).unwrap();
        }
        assert_eq!(
            cf.dimension_on(Field::Rank).unwrap_err(),
            IndexError::TooManyDimensions
        );
    }

    #[test]
    fn foreign_dimension_is_rejected() {
        let mut a = sample();
        let mut b = sample();
        a.dimension_on(Field::Sex).unwrap();
        let second = a.dimension_on(Field::Rank).unwrap();
        b.dimension_on(Field::Sex).unwrap();
        assert_eq!(
            b.filter(second, DimensionFilter::All).unwrap_err(),
            IndexError::UnknownDimension(1)
        );
    }

    #[test]
    fn filter_all_clears_every_dimension() {
        let mut cf = sample();
        let discipline = cf.dimension_on(Field::Discipline).unwrap();
        let sex = cf.dimension_on(Field::Sex).unwrap();
        let counts = cf.group(discipline, CountReducer).unwrap();

        cf.filter(discipline, DimensionFilter::Exact(text("A"))).unwrap();
        cf.filter(sex, DimensionFilter::Exact(text("Female"))).unwrap();
        assert!(cf.filter(DimensionId(7), DimensionFilter::All).is_err());
        assert_eq!(cf.selected_count(), 1);

        cf.filter_all();
        assert!(cf.filter_of(discipline).unwrap().is_all());
        assert!(cf.filter_of(sex).unwrap().is_all());
        assert_eq!(counts.all(), vec![(text("A"), 3), (text("B"), 3)]);
        assert_eq!(cf.selected_count(), 6);
    }
}
