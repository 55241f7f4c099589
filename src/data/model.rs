use std::fmt;

// ---------------------------------------------------------------------------
// FieldValue – a dimension / group key
// ---------------------------------------------------------------------------

/// An ordered, hashable key extracted from a record.
///
/// Variant order is the sort order: `Missing` sorts before every number, and
/// numbers sort before text. Composite keys compare element by element.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldValue {
    /// A numeric cell that could not be coerced.
    Missing,
    Integer(i64),
    Text(String),
    Tuple(Vec<FieldValue>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Missing => write!(f, "NaN"),
            FieldValue::Integer(i) => write!(f, "{i}"),
            FieldValue::Text(s) => write!(f, "{s}"),
            FieldValue::Tuple(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(FieldValue::Missing, FieldValue::Integer)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl FieldValue {
    /// Numeric view of the key, used for axis extents.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Text view of the key, used for categorical labels.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Element `i` of a composite key.
    pub fn component(&self, i: usize) -> Option<&FieldValue> {
        match self {
            FieldValue::Tuple(items) => items.get(i),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// SalaryRecord – one row of the salary file
// ---------------------------------------------------------------------------

/// A single faculty salary record.
///
/// Numeric fields are `None` when the source text could not be coerced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalaryRecord {
    pub discipline: String,
    pub sex: String,
    pub rank: String,
    pub yrs_service: Option<i64>,
    pub yrs_since_phd: Option<i64>,
    pub salary: Option<i64>,
}

/// The record fields a dimension can be keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Discipline,
    Sex,
    Rank,
    YrsService,
    YrsSincePhd,
    Salary,
}

impl Field {
    /// Extract this field from a record as a key.
    pub fn pluck(self, record: &SalaryRecord) -> FieldValue {
        match self {
            Field::Discipline => FieldValue::from(record.discipline.as_str()),
            Field::Sex => FieldValue::from(record.sex.as_str()),
            Field::Rank => FieldValue::from(record.rank.as_str()),
            Field::YrsService => FieldValue::from(record.yrs_service),
            Field::YrsSincePhd => FieldValue::from(record.yrs_since_phd),
            Field::Salary => FieldValue::from(record.salary),
        }
    }

    /// Build a composite key from several fields, in order.
    pub fn pluck_tuple(fields: &[Field], record: &SalaryRecord) -> FieldValue {
        FieldValue::Tuple(fields.iter().map(|f| f.pluck(record)).collect())
    }

    /// Column name in the source file.
    pub fn column_name(self) -> &'static str {
        match self {
            Field::Discipline => "discipline",
            Field::Sex => "sex",
            Field::Rank => "rank",
            Field::YrsService => "yrs.service",
            Field::YrsSincePhd => "yrs.since.phd",
            Field::Salary => "salary",
        }
    }
}

// ---------------------------------------------------------------------------
// SalaryDataset – the complete loaded dataset
// ---------------------------------------------------------------------------

/// Count of numeric cells per column that failed coercion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoercionReport {
    pub yrs_service: usize,
    pub yrs_since_phd: usize,
    pub salary: usize,
}

impl CoercionReport {
    pub fn total(&self) -> usize {
        self.yrs_service + self.yrs_since_phd + self.salary
    }

    fn tally(&mut self, record: &SalaryRecord) {
        self.yrs_service += usize::from(record.yrs_service.is_none());
        self.yrs_since_phd += usize::from(record.yrs_since_phd.is_none());
        self.salary += usize::from(record.salary.is_none());
    }
}

/// The full parsed dataset.
#[derive(Debug, Clone)]
pub struct SalaryDataset {
    /// All records, in file order.
    pub records: Vec<SalaryRecord>,
    /// Column names as they appeared in the source.
    pub column_names: Vec<String>,
    /// Non-numeric cells found while coercing.
    pub coercion: CoercionReport,
}

impl SalaryDataset {
    /// Build the dataset and its coercion report from parsed records.
    pub fn from_records(records: Vec<SalaryRecord>, column_names: Vec<String>) -> Self {
        let mut coercion = CoercionReport::default();
        for record in &records {
            coercion.tally(record);
        }
        SalaryDataset {
            records,
            column_names,
            coercion,
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> SalaryRecord {
        SalaryRecord {
            discipline: "B".into(),
            sex: "Male".into(),
            rank: "Prof".into(),
            yrs_service: Some(18),
            yrs_since_phd: Some(19),
            salary: None,
        }
    }

    #[test]
    fn missing_sorts_before_numbers() {
        let mut keys = vec![
            FieldValue::Integer(3),
            FieldValue::Missing,
            FieldValue::Integer(-1),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                FieldValue::Missing,
                FieldValue::Integer(-1),
                FieldValue::Integer(3)
            ]
        );
    }

    #[test]
    fn pluck_tuple_keeps_field_order() {
        let key = Field::pluck_tuple(
            &[Field::YrsService, Field::Salary, Field::Sex, Field::Rank],
            &record(),
        );
        assert_eq!(key.component(0), Some(&FieldValue::Integer(18)));
        assert_eq!(key.component(1), Some(&FieldValue::Missing));
        assert_eq!(key.component(3).and_then(|v| v.as_text()), Some("Prof"));
        assert_eq!(key.to_string(), "18,NaN,Male,Prof");
    }

    #[test]
    fn coercion_report_counts_missing_cells() {
        let ds = SalaryDataset::from_records(vec![record(), record()], Vec::new());
        assert_eq!(ds.coercion.salary, 2);
        assert_eq!(ds.coercion.total(), 2);
    }
}
