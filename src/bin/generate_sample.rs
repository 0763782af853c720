//! Generate the three raw-format sample CSVs the dashboard expects under
//! `data/`. Values are synthetic but follow the real extracts' shape:
//! Eurostat metadata columns, mixed program sources, both sexes, age bands
//! with a TOTAL aggregate, and QU-coded income quintiles with gaps.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

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

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

// (country, screening level in 2000, yearly gain, total mortality per 100k)
const COUNTRIES: [(&str, f64, f64, f64); 6] = [
    ("DE", 28.0, 1.1, 34.0),
    ("ES", 35.0, 0.9, 26.0),
    ("FR", 30.0, 1.2, 32.0),
    ("IT", 32.0, 0.8, 30.0),
    ("PL", 18.0, 1.4, 28.0),
    ("SE", 55.0, 0.6, 24.0),
];

const YEARS: std::ops::RangeInclusive<i64> = 2000..=2022;
const SURVEY_YEARS: [i64; 2] = [2014, 2019];

const MORTALITY_AGES: [(&str, f64); 8] = [
    ("Y15-24", 0.01),
    ("Y25-34", 0.05),
    ("Y35-44", 0.20),
    ("Y45-49", 0.45),
    ("Y50-54", 0.70),
    ("Y55-59", 0.95),
    ("Y60-64", 1.25),
    ("TOTAL", 1.0),
];

const EXAM_AGES: [(&str, f64); 5] = [
    ("Y15-24", -18.0),
    ("Y25-34", -8.0),
    ("Y35-44", 4.0),
    ("Y45-49", 12.0),
    ("Y50-64", 16.0),
];

fn clamp_pct(v: f64) -> f64 {
    v.clamp(0.0, 100.0)
}

fn write_screening(path: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "DATAFLOW",
        "LAST UPDATE",
        "freq",
        "unit",
        "source",
        "icd10",
        "geo",
        "TIME_PERIOD",
        "OBS_VALUE",
        "OBS_FLAG",
    ])?;

    let mut rows = 0;
    for (geo, base, gain, _) in COUNTRIES {
        for year in YEARS {
            let t = (year - 2000) as f64;
            for (source, offset) in [("PRG", 0.0), ("SRV", 6.0)] {
                // PRG data only exists once programmes started rolling out.
                if source == "PRG" && year < 2004 && geo == "PL" {
                    continue;
                }
                let rate = clamp_pct(base + gain * t + offset + rng.gauss(0.0, 2.5));
                writer.write_record([
                    "ESTAT:HLTH_PS_SCRE",
                    "14/02/24 11:00:00",
                    "A",
                    "PC",
                    source,
                    "C50",
                    geo,
                    &year.to_string(),
                    &format!("{rate:.1}"),
                    "",
                ])?;
                rows += 1;
            }
        }
    }
    writer.flush()?;
    Ok(rows)
}

fn write_mortality(path: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "DATAFLOW",
        "LAST UPDATE",
        "freq",
        "unit",
        "sex",
        "age",
        "icd10",
        "geo",
        "TIME_PERIOD",
        "OBS_VALUE",
        "OBS_FLAG",
    ])?;

    let mut rows = 0;
    for (geo, _, _, total_rate) in COUNTRIES {
        for year in YEARS {
            let t = (year - 2000) as f64;
            // Mortality slowly declines over the period.
            let level = total_rate * (1.0 - 0.008 * t);
            for (age, weight) in MORTALITY_AGES {
                let rate = (level * weight + rng.gauss(0.0, 0.4)).max(0.0);
                for (sex, scale) in [("F", 1.0), ("M", 0.01)] {
                    writer.write_record([
                        "ESTAT:HLTH_CD_ASDR2",
                        "14/02/24 11:00:00",
                        "A",
                        "RT",
                        sex,
                        age,
                        "C50",
                        geo,
                        &year.to_string(),
                        &format!("{:.2}", rate * scale),
                        "",
                    ])?;
                    rows += 1;
                }
            }
        }
    }
    writer.flush()?;
    Ok(rows)
}

fn write_exam_income(path: &Path, rng: &mut SimpleRng) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "DATAFLOW",
        "LAST UPDATE",
        "freq",
        "unit",
        "duration",
        "quant_inc",
        "age",
        "geo",
        "TIME_PERIOD",
        "OBS_VALUE",
        "OBS_FLAG",
    ])?;

    let mut rows = 0;
    for (geo, base, _, _) in COUNTRIES {
        for year in SURVEY_YEARS {
            for (quintile, q_index) in
                [("QU1", 0.0), ("QU2", 1.0), ("QU3", 2.0), ("QU4", 3.0), ("QU5", 4.0), ("TOTAL", 2.0)]
            {
                for (age, age_offset) in EXAM_AGES {
                    // Sparse surveys: a few cells are simply not published.
                    let missing = rng.next_f64() < 0.03;
                    let value = if missing {
                        String::new()
                    } else {
                        let rate = clamp_pct(
                            base + 6.0 * q_index + age_offset + rng.gauss(0.0, 3.0),
                        );
                        format!("{rate:.1}")
                    };
                    writer.write_record([
                        "ESTAT:HLTH_EHIS_PA7I",
                        "14/02/24 11:00:00",
                        "A",
                        "PC",
                        "LT1Y",
                        quintile,
                        age,
                        geo,
                        &year.to_string(),
                        &value,
                        if missing { ":" } else { "" },
                    ])?;
                    rows += 1;
                }
            }
        }
    }
    writer.flush()?;
    Ok(rows)
}

fn main() -> Result<()> {
    env_logger::init();
    let mut rng = SimpleRng::new(42);

    let out_dir = Path::new("data");
    fs::create_dir_all(out_dir).context("creating data directory")?;

    let n = write_screening(&out_dir.join("breast_cancer_screening.csv"), &mut rng)?;
    info!("wrote {n} screening rows");
    let n = write_mortality(&out_dir.join("death_due_to_cancer.csv"), &mut rng)?;
    info!("wrote {n} mortality rows");
    let n = write_exam_income(&out_dir.join("breast_exam_income.csv"), &mut rng)?;
    info!("wrote {n} exam-by-income rows");

    println!("Wrote sample datasets to {}", out_dir.display());
    Ok(())
}
