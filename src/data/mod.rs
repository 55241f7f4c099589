/// Data layer: records, loading, reducers and the cross-filter index.
///
/// Architecture:
/// ```text
///  .csv / .json
///        │
///        ▼
///   ┌──────────┐
///   │  loader  │  parse file, coerce numeric text → SalaryDataset
///   └──────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │ CrossFilter │  dimensions + filter masks
///   └─────────────┘
///        │  add / remove on filter change
///        ▼
///   ┌──────────┐
///   │  reduce  │  per-group running aggregates
///   └──────────┘
/// ```

pub mod index;
pub mod loader;
pub mod model;
pub mod reduce;
