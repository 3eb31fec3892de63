use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use log::info;
use parquet::arrow::ArrowWriter;

const N_ROWS: usize = 200;
const WEIGHTS: [f64; 3] = [1.5, -2.0, 0.75];
const GROUP_OFFSETS: [(&str, f64); 3] = [("north", 0.0), ("south", 1.0), ("east", -0.5)];

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

/// Columns of the synthetic regression dataset.
struct Sample {
    features: [Vec<f64>; 3],
    group: Vec<&'static str>,
    target: Vec<f64>,
}

fn generate(rng: &mut SimpleRng) -> Sample {
    let mut sample = Sample {
        features: [Vec::new(), Vec::new(), Vec::new()],
        group: Vec::with_capacity(N_ROWS),
        target: Vec::with_capacity(N_ROWS),
    };

    for i in 0..N_ROWS {
        let (group, offset) = GROUP_OFFSETS[i % GROUP_OFFSETS.len()];
        let mut y = offset + rng.gauss(0.0, 0.1);
        for (column, weight) in sample.features.iter_mut().zip(WEIGHTS) {
            let v = rng.gauss(0.0, 1.0);
            y += weight * v;
            column.push(v);
        }
        sample.group.push(group);
        sample.target.push(y);
    }
    sample
}

fn write_csv(sample: &Sample, path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record(["x1", "x2", "x3", "group", "target"])?;
    for i in 0..sample.target.len() {
        writer.write_record([
            sample.features[0][i].to_string(),
            sample.features[1][i].to_string(),
            sample.features[2][i].to_string(),
            sample.group[i].to_string(),
            sample.target[i].to_string(),
        ])?;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(())
}

fn write_parquet(sample: &Sample, path: &str) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("x1", DataType::Float64, false),
        Field::new("x2", DataType::Float64, false),
        Field::new("x3", DataType::Float64, false),
        Field::new("group", DataType::Utf8, false),
        Field::new("target", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Float64Array::from(sample.features[0].clone())),
            Arc::new(Float64Array::from(sample.features[1].clone())),
            Arc::new(Float64Array::from(sample.features[2].clone())),
            Arc::new(StringArray::from(sample.group.clone())),
            Arc::new(Float64Array::from(sample.target.clone())),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = SimpleRng::new(42);
    let sample = generate(&mut rng);

    for (path, write) in [
        ("sample_data.csv", write_csv as fn(&Sample, &str) -> Result<()>),
        ("sample_data.parquet", write_parquet),
    ] {
        write(&sample, path).with_context(|| format!("writing {path}"))?;
        info!("wrote {path}");
    }

    println!(
        "Wrote {} rows (3 features, group, target) to sample_data.csv and sample_data.parquet",
        sample.target.len()
    );
    Ok(())
}
