//! Forecast command: run an ensemble nowcast and summarise it as JSON.

use std::path::Path;

use anyhow::{Context, Result, bail};
use ndarray::{Array3, ArrayView2, Axis};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span};

use nimbus_steps::{Nowcast, forecast};

use crate::cli::ForecastArgs;
use crate::config::{NimbusConfig, SyntheticToml};
use crate::convert;

/// Input file layout: `history` is `[frame][row][col]` with `null` for
/// missing pixels, `motion` is `[component][row][col]` in pixels per step.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputFile {
    history: Vec<Vec<Vec<Option<f64>>>>,
    motion: Vec<Vec<Vec<f64>>>,
}

#[derive(Debug, Serialize)]
struct Summary {
    lead_times: Vec<f64>,
    members: Vec<MemberSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timing: Option<TimingSummary>,
}

#[derive(Debug, Serialize)]
struct MemberSummary {
    member: usize,
    steps: Vec<FieldSummary>,
}

#[derive(Debug, Serialize, PartialEq)]
struct FieldSummary {
    lead_time: f64,
    mean: Option<f64>,
    max: Option<f64>,
    /// Share of valid pixels at or above the rain threshold.
    wet_area_ratio: Option<f64>,
}

#[derive(Debug, Serialize)]
struct TimingSummary {
    init_ms: f64,
    main_loop_ms: f64,
}

/// Run the nowcast pipeline.
pub fn run(args: ForecastArgs) -> Result<()> {
    let _cmd = info_span!("forecast").entered();

    // 1. Load project TOML
    let config: NimbusConfig = match &args.config {
        Some(path) => {
            let toml_str = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            toml::from_str(&toml_str).context("failed to parse TOML config")?
        }
        None => {
            info!("no config file given, using defaults");
            NimbusConfig::default()
        }
    };
    let steps_cfg = convert::build_steps_config(&config, args.seed)?;
    let timesteps = convert::build_timesteps(&config.forecast);

    // 2. Observed frames and motion
    let (history, motion) = match &args.input {
        Some(path) => {
            info!(path = %path.display(), "reading input fields");
            read_input(path)?
        }
        None => {
            info!("no input file given, generating synthetic scenario");
            synthetic_scenario(&config.synthetic, args.seed.or(config.seed))?
        }
    };
    let (n_frames, rows, cols) = history.dim();
    info!(n_frames, rows, cols, "input fields loaded");

    // 3. Nowcast
    let nowcast = forecast(&history, &motion, &timesteps, &steps_cfg)
        .context("nowcast failed")?;
    let summary = summarise(&nowcast, steps_cfg.precip_thr());

    // 4. Write summary
    let json = serde_json::to_string_pretty(&summary).context("failed to serialise summary")?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write summary: {}", path.display()))?;
            info!(path = %path.display(), "summary written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn read_input(path: &Path) -> Result<(Array3<f64>, Array3<f64>)> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input file: {}", path.display()))?;
    let input: InputFile = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse input JSON: {}", path.display()))?;
    let history = to_array3(&input.history, |v| v.unwrap_or(f64::NAN))
        .context("invalid history array")?;
    let motion = to_array3(&input.motion, |v| v).context("invalid motion array")?;
    Ok((history, motion))
}

fn to_array3<T: Copy>(data: &[Vec<Vec<T>>], map: impl Fn(T) -> f64) -> Result<Array3<f64>> {
    let n = data.len();
    let rows = data.first().map_or(0, Vec::len);
    let cols = data.first().and_then(|f| f.first()).map_or(0, Vec::len);
    if n == 0 || rows == 0 || cols == 0 {
        bail!("empty array");
    }
    let mut out = Array3::zeros((n, rows, cols));
    for (k, frame) in data.iter().enumerate() {
        if frame.len() != rows {
            bail!("ragged array: slice {k} has {} rows, expected {rows}", frame.len());
        }
        for (i, row) in frame.iter().enumerate() {
            if row.len() != cols {
                bail!(
                    "ragged array: slice {k} row {i} has {} columns, expected {cols}",
                    row.len()
                );
            }
            for (j, &v) in row.iter().enumerate() {
                out[[k, i, j]] = map(v);
            }
        }
    }
    Ok(out)
}

/// Frames of a Gaussian rain cell translated by `velocity` each step, plus
/// Gaussian measurement noise, and the matching uniform motion field.
fn synthetic_scenario(
    synthetic: &SyntheticToml,
    seed: Option<u64>,
) -> Result<(Array3<f64>, Array3<f64>)> {
    let [rows, cols] = synthetic.size;
    if rows == 0 || cols == 0 || synthetic.n_frames == 0 {
        bail!("synthetic scenario needs a non-empty grid and at least one frame");
    }
    if synthetic.radius.is_nan() || synthetic.radius <= 0.0 {
        bail!("synthetic cell radius must be positive, got {}", synthetic.radius);
    }
    let noise = Normal::new(0.0, synthetic.noise_sd)
        .with_context(|| format!("invalid synthetic noise_sd: {}", synthetic.noise_sd))?;
    let mut rng = match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_os_rng(),
    };

    let [u, v] = synthetic.velocity;
    let n = synthetic.n_frames;
    let mut history = Array3::zeros((n, rows, cols));
    for (k, mut frame) in history.axis_iter_mut(Axis(0)).enumerate() {
        // The last frame has the cell centred on the grid.
        let lag = (n - 1 - k) as f64;
        let ci = rows as f64 / 2.0 - v * lag;
        let cj = cols as f64 / 2.0 - u * lag;
        for ((i, j), px) in frame.indexed_iter_mut() {
            let d2 = (i as f64 - ci).powi(2) + (j as f64 - cj).powi(2);
            let cell = synthetic.amplitude * (-d2 / (2.0 * synthetic.radius.powi(2))).exp();
            *px = synthetic.background + cell + noise.sample(&mut rng);
        }
    }

    let mut motion = Array3::zeros((2, rows, cols));
    motion.index_axis_mut(Axis(0), 0).fill(u);
    motion.index_axis_mut(Axis(0), 1).fill(v);
    Ok((history, motion))
}

fn summarise(nowcast: &Nowcast, threshold: Option<f64>) -> Summary {
    let lead_times = nowcast.lead_times().to_vec();
    let members = match nowcast.ensemble() {
        Some(ensemble) => ensemble
            .axis_iter(Axis(0))
            .enumerate()
            .map(|(member, fields)| MemberSummary {
                member,
                steps: fields
                    .axis_iter(Axis(0))
                    .zip(&lead_times)
                    .map(|(field, &lead_time)| field_summary(field, lead_time, threshold))
                    .collect(),
            })
            .collect(),
        None => Vec::new(),
    };
    let timing = nowcast.timing().map(|t| TimingSummary {
        init_ms: t.init().as_secs_f64() * 1e3,
        main_loop_ms: t.main_loop().as_secs_f64() * 1e3,
    });
    Summary {
        lead_times,
        members,
        timing,
    }
}

fn field_summary(field: ArrayView2<'_, f64>, lead_time: f64, threshold: Option<f64>) -> FieldSummary {
    let valid: Vec<f64> = field.iter().copied().filter(|v| v.is_finite()).collect();
    if valid.is_empty() {
        return FieldSummary {
            lead_time,
            mean: None,
            max: None,
            wet_area_ratio: None,
        };
    }
    let wet_area_ratio = threshold.map(|thr| {
        valid.iter().filter(|&&v| v >= thr).count() as f64 / valid.len() as f64
    });
    FieldSummary {
        lead_time,
        mean: Some(nimbus_stats::mean(&valid)),
        max: nimbus_stats::finite_max(&valid),
        wet_area_ratio,
    }
}
