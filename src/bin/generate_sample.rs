use anyhow::{Context, Result};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in `lo..=hi`.
    fn range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_f64() * (hi - lo + 1) as f64) as i64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// (rank, years since PhD range, base salary)
const RANKS: [(&str, (i64, i64), f64); 3] = [
    ("AsstProf", (1, 10), 80000.0),
    ("AssocProf", (6, 30), 94000.0),
    ("Prof", (12, 56), 125000.0),
];

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let output_path = "Salaries.csv";
    let n_rows = 397;

    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("creating {output_path}"))?;
    writer.write_record([
        "",
        "rank",
        "discipline",
        "yrs.since.phd",
        "yrs.service",
        "sex",
        "salary",
    ])?;

    for id in 1..=n_rows {
        let (rank, (phd_lo, phd_hi), base) = match rng.next_f64() {
            p if p < 0.17 => RANKS[0],
            p if p < 0.33 => RANKS[1],
            _ => RANKS[2],
        };
        let sex = if rng.next_f64() < 0.1 { "Female" } else { "Male" };
        let discipline = if rng.next_f64() < 0.45 { "A" } else { "B" };

        let yrs_since_phd = rng.range(phd_lo, phd_hi);
        let yrs_service = rng.range(0, yrs_since_phd.max(1) - 1);
        let bonus = if discipline == "B" { 12000.0 } else { 0.0 };
        let salary = (base + bonus + 400.0 * yrs_service as f64 + rng.gauss(0.0, 15000.0))
            .max(55000.0)
            .round() as i64;

        writer.write_record([
            id.to_string(),
            rank.to_string(),
            discipline.to_string(),
            yrs_since_phd.to_string(),
            yrs_service.to_string(),
            sex.to_string(),
            salary.to_string(),
        ])?;
    }
    writer.flush().context("flushing CSV")?;

    println!("Wrote {n_rows} salary records to {output_path}");
    Ok(())
}
