use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value as JsonValue;

use super::model::{Field, SalaryDataset, SalaryRecord};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a salary dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`  – header row with `rank`, `discipline`, `yrs.since.phd`,
///   `yrs.service`, `sex` and `salary` columns (any order)
/// * `.json` – `[{ "rank": "Prof", "salary": 139750, ... }, ...]`
pub fn load_file(path: &Path) -> Result<SalaryDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            load_csv(file)?
        }
        "json" => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            load_json(&text)?
        }
        other => bail!("Unsupported file extension: .{other}"),
    };

    if dataset.coercion.total() > 0 {
        log::warn!(
            "{}: {} numeric cells could not be parsed ({:?})",
            path.display(),
            dataset.coercion.total(),
            dataset.coercion
        );
    }
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// Numeric coercion
// ---------------------------------------------------------------------------

/// Coerce text to an integer the way a lenient integer-prefix parser does.
///
/// Leading whitespace and one sign are accepted, then the longest run of
/// ASCII digits is used and anything after it is ignored. Returns `None`
/// when no digit follows, or when the digits overflow `i64`.
pub fn parse_int(text: &str) -> Option<i64> {
    let s = text.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let magnitude: i64 = digits[..end].parse().ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn coerce_json(val: Option<&JsonValue>) -> Option<i64> {
    match val? {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        JsonValue::String(s) => parse_int(s),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Resolved positions of the six salary columns in a header row.
struct ColumnIndex {
    discipline: usize,
    sex: usize,
    rank: usize,
    yrs_service: usize,
    yrs_since_phd: usize,
    salary: usize,
}

/// Dotted and underscored spellings are both accepted.
fn normalize_header(name: &str) -> String {
    name.trim().replace('.', "_").to_ascii_lowercase()
}

impl ColumnIndex {
    fn from_headers(headers: &[String]) -> Result<Self> {
        let find = |field: Field| -> Result<usize> {
            let wanted = normalize_header(field.column_name());
            headers
                .iter()
                .position(|h| normalize_header(h) == wanted)
                .with_context(|| format!("CSV missing '{}' column", field.column_name()))
        };
        Ok(ColumnIndex {
            discipline: find(Field::Discipline)?,
            sex: find(Field::Sex)?,
            rank: find(Field::Rank)?,
            yrs_service: find(Field::YrsService)?,
            yrs_since_phd: find(Field::YrsSincePhd)?,
            salary: find(Field::Salary)?,
        })
    }
}

/// Parse CSV rows into a dataset.
///
/// Short rows are tolerated: absent cells read as empty text, which coerces
/// to a missing number. Structural CSV errors abort the load.
pub fn load_csv<R: Read>(input: R) -> Result<SalaryDataset> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(input);
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let cols = ColumnIndex::from_headers(&headers)?;
    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("CSV row {row_no}"))?;
        let cell = |i: usize| row.get(i).unwrap_or("").trim();

        records.push(SalaryRecord {
            discipline: cell(cols.discipline).to_string(),
            sex: cell(cols.sex).to_string(),
            rank: cell(cols.rank).to_string(),
            yrs_service: parse_int(cell(cols.yrs_service)),
            yrs_since_phd: parse_int(cell(cols.yrs_since_phd)),
            salary: parse_int(cell(cols.salary)),
        });
    }

    log::debug!("parsed {} CSV rows", records.len());
    Ok(SalaryDataset::from_records(records, headers))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the same column names as the CSV:
///
/// ```json
/// [
///   { "rank": "Prof", "discipline": "B", "yrs.since.phd": 19,
///     "yrs.service": 18, "sex": "Male", "salary": "139750" }
/// ]
/// ```
pub fn load_json(text: &str) -> Result<SalaryDataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;
    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut column_names: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        for key in obj.keys() {
            if !column_names.contains(key) {
                column_names.push(key.clone());
            }
        }

        let lookup = |field: Field| {
            let wanted = normalize_header(field.column_name());
            obj.iter()
                .find(|(k, _)| normalize_header(k) == wanted)
                .map(|(_, v)| v)
        };
        let text = |field: Field| match lookup(field) {
            Some(JsonValue::String(s)) => s.trim().to_string(),
            Some(JsonValue::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        records.push(SalaryRecord {
            discipline: text(Field::Discipline),
            sex: text(Field::Sex),
            rank: text(Field::Rank),
            yrs_service: coerce_json(lookup(Field::YrsService)),
            yrs_since_phd: coerce_json(lookup(Field::YrsSincePhd)),
            salary: coerce_json(lookup(Field::Salary)),
        });
    }

    Ok(SalaryDataset::from_records(records, column_names))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
\"\",\"rank\",\"discipline\",\"yrs.since.phd\",\"yrs.service\",\"sex\",\"salary\"
\"1\",\"Prof\",\"B\",19,18,\"Male\",139750
\"2\",\"AsstProf\",\"A\",4,3,\"Female\",79750
\"3\",\"AssocProf\",\"B\",12,7,\"Female\",n/a
";

    #[test]
    fn parse_int_takes_leading_digits() {
        assert_eq!(parse_int("139750"), Some(139750));
        assert_eq!(parse_int("  42"), Some(42));
        assert_eq!(parse_int("95000.50"), Some(95000));
        assert_eq!(parse_int("12yrs"), Some(12));
        assert_eq!(parse_int("-7"), Some(-7));
        assert_eq!(parse_int("n/a"), None);
        assert_eq!(parse_int(""), None);
        assert_eq!(parse_int("-"), None);
    }

    #[test]
    fn csv_maps_dotted_columns() {
        let ds = load_csv(CSV.as_bytes()).unwrap();
        assert_eq!(ds.len(), 3);
        let first = &ds.records[0];
        assert_eq!(first.rank, "Prof");
        assert_eq!(first.discipline, "B");
        assert_eq!(first.yrs_since_phd, Some(19));
        assert_eq!(first.yrs_service, Some(18));
        assert_eq!(first.sex, "Male");
        assert_eq!(first.salary, Some(139750));
    }

    #[test]
    fn malformed_salary_keeps_record() {
        let ds = load_csv(CSV.as_bytes()).unwrap();
        let third = &ds.records[2];
        assert_eq!(third.rank, "AssocProf");
        assert_eq!(third.salary, None);
        assert_eq!(ds.coercion.salary, 1);
    }

    #[test]
    fn missing_column_is_an_error() {
        let err = load_csv("rank,sex,salary\nProf,Male,1\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("discipline"));
    }

    #[test]
    fn short_row_reads_as_missing_numbers() {
        let csv = "rank,discipline,yrs.since.phd,yrs.service,sex,salary\nProf,A,3\n";
        let ds = load_csv(csv.as_bytes()).unwrap();
        assert_eq!(ds.records[0].yrs_since_phd, Some(3));
        assert_eq!(ds.records[0].yrs_service, None);
        assert_eq!(ds.records[0].sex, "");
    }

    #[test]
    fn json_accepts_numbers_and_text() {
        let text = r#"[
            {"rank": "Prof", "discipline": "A", "yrs.since.phd": 10,
             "yrs.service": "8", "sex": "Female", "salary": 101000.0},
            {"rank": "Prof", "discipline": "A", "yrs_since_phd": null,
             "yrs_service": 2, "sex": "Male", "salary": "oops"}
        ]"#;
        let ds = load_json(text).unwrap();
        assert_eq!(ds.records[0].yrs_service, Some(8));
        assert_eq!(ds.records[0].salary, Some(101000));
        assert_eq!(ds.records[1].yrs_since_phd, None);
        assert_eq!(ds.records[1].salary, None);
        assert_eq!(ds.coercion.total(), 2);
    }

    #[test]
    fn json_rejects_non_array() {
        assert!(load_json("{}").is_err());
    }

    #[test]
    fn unsupported_extension_fails() {
        let err = load_file(Path::new("salaries.parquet")).unwrap_err();
        assert!(err.to_string().contains(".parquet"));
    }
}
