//! Writes a synthetic static-fire test (CSV and Parquet) for trying the analyzer.
//!
//! Usage: `generate_sample [output_dir]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

const SAMPLE_RATE_HZ: f64 = 100.0;
const DURATION_S: f64 = 10.0;

const IGNITION_S: f64 = 2.0;
const SHUTDOWN_S: f64 = 6.5;
const RAMP_S: f64 = 0.3;

const NOMINAL_THRUST_LBF: f64 = 1000.0;
const NOMINAL_PC_PSI: f64 = 300.0;
const FUEL_FLOW_LBS: f64 = 1.2;
const OX_FLOW_LBS: f64 = 3.0;

const COLUMNS: [&str; 9] = [
    "Time (s)",
    "Thrust LC1 (lbf)",
    "Thrust LC2 (lbf)",
    "Chamber Pressure (psi)",
    "Fuel Weight (lbs)",
    "Ox Weight (lbs)",
    "Fuel Venturi P1 (psi)",
    "Fuel Venturi P2 (psi)",
    "Feed Press (psi)",
];

/// Small deterministic noise source (splitmix64 + Box-Muller).
struct Noise(u64);

impl Noise {
    fn next_unit(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }

    fn gauss(&mut self, std_dev: f64) -> f64 {
        let u1 = self.next_unit().max(1e-15);
        let u2 = self.next_unit();
        std_dev * (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }
}

/// 0 before ignition, 1 at steady state, linear ramps in between.
fn throttle(t: f64) -> f64 {
    if t < IGNITION_S || t > SHUTDOWN_S + RAMP_S {
        0.0
    } else if t < IGNITION_S + RAMP_S {
        (t - IGNITION_S) / RAMP_S
    } else if t > SHUTDOWN_S {
        1.0 - (t - SHUTDOWN_S) / RAMP_S
    } else {
        1.0
    }
}

fn generate() -> Vec<[f64; 9]> {
    let mut noise = Noise(7);
    let rows = (DURATION_S * SAMPLE_RATE_HZ) as usize + 1;
    let mut fuel = 40.0;
    let mut ox = 90.0;
    let dt = 1.0 / SAMPLE_RATE_HZ;

    (0..rows)
        .map(|i| {
            let t = i as f64 * dt;
            let k = throttle(t);
            let thrust = NOMINAL_THRUST_LBF * k;
            fuel -= FUEL_FLOW_LBS * k * dt;
            ox -= OX_FLOW_LBS * k * dt;

            let feed = 450.0 - 20.0 * k;
            let venturi_drop = 35.0 * k * k;
            [
                t,
                0.55 * thrust + noise.gauss(4.0),
                0.45 * thrust + noise.gauss(4.0),
                NOMINAL_PC_PSI * k + noise.gauss(1.5),
                fuel + noise.gauss(0.02),
                ox + noise.gauss(0.05),
                feed + noise.gauss(0.8),
                feed - venturi_drop + noise.gauss(0.8),
                feed + noise.gauss(0.5),
            ]
        })
        .collect()
}

fn write_csv(path: &PathBuf, rows: &[[f64; 9]]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record(row.iter().map(|v| format!("{v:.4}")))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &PathBuf, rows: &[[f64; 9]]) -> Result<()> {
    let schema = Arc::new(Schema::new(
        COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Float64, false))
            .collect::<Vec<_>>(),
    ));
    let arrays: Vec<ArrayRef> = (0..COLUMNS.len())
        .map(|c| Arc::new(Float64Array::from_iter_values(rows.iter().map(|r| r[c]))) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays).context("Failed to build record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let out_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let rows = generate();

    let csv_path = out_dir.join("sample_hotfire.csv");
    write_csv(&csv_path, &rows)?;
    let parquet_path = out_dir.join("sample_hotfire.parquet");
    write_parquet(&parquet_path, &rows)?;

    log::info!(
        "Wrote {} rows to {} and {}",
        rows.len(),
        csv_path.display(),
        parquet_path.display()
    );
    println!(
        "Wrote {} rows ({:.1} s burn at {NOMINAL_THRUST_LBF} lbf) to {}",
        rows.len(),
        SHUTDOWN_S - IGNITION_S,
        out_dir.display()
    );
    Ok(())
}
