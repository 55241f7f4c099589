use super::model::SalaryRecord;

// ---------------------------------------------------------------------------
// Reducer – incremental aggregate maintenance
// ---------------------------------------------------------------------------

/// How a group's aggregate changes as records enter or leave the filtered
/// set.
///
/// Implementations must be symmetric: adding a multiset of records and then
/// removing the same multiset, in any order, restores `initial()` exactly.
pub trait Reducer {
    type Acc: Clone + std::fmt::Debug;

    fn initial(&self) -> Self::Acc;
    fn add(&self, acc: &mut Self::Acc, record: &SalaryRecord);
    fn remove(&self, acc: &mut Self::Acc, record: &SalaryRecord);
}

/// Number of records per key.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountReducer;

impl Reducer for CountReducer {
    type Acc = u64;

    fn initial(&self) -> u64 {
        0
    }

    fn add(&self, acc: &mut u64, _record: &SalaryRecord) {
        *acc += 1;
    }

    fn remove(&self, acc: &mut u64, _record: &SalaryRecord) {
        *acc = acc.saturating_sub(1);
    }
}

// ---------------------------------------------------------------------------
// Average salary
// ---------------------------------------------------------------------------

/// Running count, total and average of salaries.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SalaryStats {
    pub count: u64,
    pub total: i64,
    pub average: f64,
}

/// Count + sum + average over `salary`.
///
/// Records with a non-numeric salary are ignored by both `add` and `remove`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AverageSalary;

impl Reducer for AverageSalary {
    type Acc = SalaryStats;

    fn initial(&self) -> SalaryStats {
        SalaryStats::default()
    }

    fn add(&self, acc: &mut SalaryStats, record: &SalaryRecord) {
        let Some(salary) = record.salary else {
            return;
        };
        acc.count += 1;
        acc.total += salary;
        acc.average = acc.total as f64 / acc.count as f64;
    }

    fn remove(&self, acc: &mut SalaryStats, record: &SalaryRecord) {
        let Some(salary) = record.salary else {
            return;
        };
        acc.count = acc.count.saturating_sub(1);
        if acc.count == 0 {
            acc.total = 0;
            acc.average = 0.0;
        } else {
            acc.total -= salary;
            acc.average = acc.total as f64 / acc.count as f64;
        }
    }
}

// ---------------------------------------------------------------------------
// Match ratios
// ---------------------------------------------------------------------------

/// Records seen and how many of them matched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatchCount {
    pub total: u64,
    pub matched: u64,
}

impl MatchCount {
    /// `matched / total`, or 0 for an empty group.
    pub fn ratio(&self) -> f64 {
        ratio(self.matched, self.total)
    }
}

/// Fraction of records holding `rank`.
#[derive(Debug, Clone)]
pub struct RankMatch {
    pub rank: String,
}

impl RankMatch {
    pub fn new(rank: impl Into<String>) -> Self {
        Self { rank: rank.into() }
    }
}

impl Reducer for RankMatch {
    type Acc = MatchCount;

    fn initial(&self) -> MatchCount {
        MatchCount::default()
    }

    fn add(&self, acc: &mut MatchCount, record: &SalaryRecord) {
        acc.total += 1;
        if record.rank == self.rank {
            acc.matched += 1;
        }
    }

    fn remove(&self, acc: &mut MatchCount, record: &SalaryRecord) {
        acc.total = acc.total.saturating_sub(1);
        if record.rank == self.rank {
            acc.matched = acc.matched.saturating_sub(1);
        }
    }
}

/// Records of one sex and how many of them hold the target rank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfShare {
    pub count: u64,
    pub are_prof: u64,
}

impl ProfShare {
    /// `are_prof / count`, or 0 when nobody of that sex is selected.
    pub fn ratio(&self) -> f64 {
        ratio(self.are_prof, self.count)
    }
}

/// Fraction of records of `sex` that hold `rank`. Other sexes are ignored.
#[derive(Debug, Clone)]
pub struct GenderRankMatch {
    pub sex: String,
    pub rank: String,
}

impl GenderRankMatch {
    pub fn new(sex: impl Into<String>, rank: impl Into<String>) -> Self {
        Self {
            sex: sex.into(),
            rank: rank.into(),
        }
    }
}

impl Reducer for GenderRankMatch {
    type Acc = ProfShare;

    fn initial(&self) -> ProfShare {
        ProfShare::default()
    }

    fn add(&self, acc: &mut ProfShare, record: &SalaryRecord) {
        if record.sex != self.sex {
            return;
        }
        acc.count += 1;
        if record.rank == self.rank {
            acc.are_prof += 1;
        }
    }

    fn remove(&self, acc: &mut ProfShare, record: &SalaryRecord) {
        if record.sex != self.sex {
            return;
        }
        acc.count = acc.count.saturating_sub(1);
        if record.rank == self.rank {
            acc.are_prof = acc.are_prof.saturating_sub(1);
        }
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(sex: &str, rank: &str, salary: Option<i64>) -> SalaryRecord {
        SalaryRecord {
            discipline: "A".into(),
            sex: sex.into(),
            rank: rank.into(),
            yrs_service: Some(1),
            yrs_since_phd: Some(2),
            salary,
        }
    }

    fn fold<R: Reducer>(reducer: &R, records: &[SalaryRecord]) -> R::Acc {
        let mut acc = reducer.initial();
        for r in records {
            reducer.add(&mut acc, r);
        }
        acc
    }

    #[test]
    fn average_of_three_salaries() {
        let records = [
            rec("Female", "Prof", Some(50000)),
            rec("Female", "Prof", Some(70000)),
            rec("Female", "Prof", Some(90000)),
        ];
        let acc = fold(&AverageSalary, &records);
        assert_eq!(acc.count, 3);
        assert_eq!(acc.total, 210000);
        assert_eq!(format!("{:.2}", acc.average), "70000.00");
    }

    #[test]
    fn removing_last_record_resets_average() {
        let r = rec("Male", "Prof", Some(123456));
        let mut acc = fold(&AverageSalary, std::slice::from_ref(&r));
        AverageSalary.remove(&mut acc, &r);
        assert_eq!(acc, SalaryStats::default());
        assert!(!acc.average.is_nan());
    }

    #[test]
    fn remove_subtracts_from_total() {
        let a = rec("Male", "Prof", Some(100));
        let b = rec("Male", "Prof", Some(300));
        let mut acc = fold(&AverageSalary, &[a.clone(), b]);
        AverageSalary.remove(&mut acc, &a);
        assert_eq!(acc.count, 1);
        assert_eq!(acc.total, 300);
        assert_eq!(acc.average, 300.0);
    }

    #[test]
    fn average_skips_missing_salary() {
        let records = [rec("Male", "Prof", Some(80000)), rec("Male", "Prof", None)];
        let mut acc = fold(&AverageSalary, &records);
        assert_eq!(acc.count, 1);
        assert_eq!(acc.average, 80000.0);
        AverageSalary.remove(&mut acc, &records[1]);
        assert_eq!(acc.count, 1);
    }

    #[test]
    fn reducers_are_symmetric() {
        let records: Vec<SalaryRecord> = (0..25)
            .map(|i| {
                let sex = if i % 3 == 0 { "Female" } else { "Male" };
                let rank = ["Prof", "AsstProf", "AssocProf"][i % 3];
                let salary = if i % 7 == 0 { None } else { Some(40000 + i as i64 * 1733) };
                rec(sex, rank, salary)
            })
            .collect();

        // Remove in a different order than added.
        let order: Vec<usize> = (0..records.len()).map(|i| (i * 11) % 25).collect();

        let mut avg = fold(&AverageSalary, &records);
        let mut count = fold(&CountReducer, &records);
        let prof = RankMatch::new("Prof");
        let mut matches = fold(&prof, &records);
        let women = GenderRankMatch::new("Female", "Prof");
        let mut share = fold(&women, &records);

        for &i in &order {
            AverageSalary.remove(&mut avg, &records[i]);
            CountReducer.remove(&mut count, &records[i]);
            prof.remove(&mut matches, &records[i]);
            women.remove(&mut share, &records[i]);
        }

        assert_eq!(avg, SalaryStats::default());
        assert_eq!(count, 0);
        assert_eq!(matches, MatchCount::default());
        assert_eq!(share, ProfShare::default());
    }

    #[test]
    fn rank_match_ratio() {
        let records: Vec<SalaryRecord> = (0..10)
            .map(|i| rec("Male", if i < 4 { "Prof" } else { "AsstProf" }, Some(1)))
            .collect();
        let acc = fold(&RankMatch::new("Prof"), &records);
        assert_eq!(acc, MatchCount { total: 10, matched: 4 });
        assert_eq!(acc.ratio(), 0.4);
        assert_eq!(MatchCount::default().ratio(), 0.0);
    }

    #[test]
    fn gender_scoped_prof_share() {
        let mut records: Vec<SalaryRecord> = (0..20)
            .map(|i| rec("Female", if i < 5 { "Prof" } else { "AssocProf" }, Some(1)))
            .collect();
        records.push(rec("Male", "Prof", Some(1)));
        let acc = fold(&GenderRankMatch::new("Female", "Prof"), &records);
        assert_eq!(acc, ProfShare { count: 20, are_prof: 5 });
        assert_eq!(acc.ratio(), 0.25);
        assert_eq!(ProfShare::default().ratio(), 0.0);
    }
}
