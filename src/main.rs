use std::{env, io};

use boltzmann::{ModelKind, RbmConfig};
use log::info;
use ndarray::{Array1, Array2};

const DEFAULT_MODEL: &str = "rbm";
const DEFAULT_ROWS: usize = 2560;
const DEFAULT_LOG_NAME: &str = "rbm";

fn main() -> io::Result<()> {
    env_logger::init();

    let config = match env::var("RBM_CONFIG") {
        Ok(path) => RbmConfig::from_path(&path)?,
        Err(_) => RbmConfig::default(),
    };

    let model = env::var("MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let log_name = env::var("LOG_NAME").unwrap_or_else(|_| DEFAULT_LOG_NAME.to_string());
    let rows = match env::var("ROWS") {
        Ok(rows) => rows.parse().map_err(io::Error::other)?,
        Err(_) => DEFAULT_ROWS,
    };

    let n_visible = config.n_visible.get();
    let epoch_count = config.epoch_count;
    let batch_size = config.batch_size;
    let mut model = model.parse::<ModelKind>()?.build(config)?;

    let x_train = stripes(rows, n_visible);
    let x_val = stripes(rows / 10, n_visible);
    let y_train = Array1::zeros(x_train.nrows());
    let y_val = Array1::zeros(x_val.nrows());

    info!(run = log_name.as_str(); "training on {rows} rows of {n_visible} units");

    let reports = model.fit(
        x_train.view(),
        y_train.view(),
        x_val.view(),
        y_val.view(),
        epoch_count,
        batch_size,
        &log_name,
    )?;

    if let Some(last) = reports.last() {
        info!(run = log_name.as_str(); "final training loss: {:.6}", last.loss);
    }

    Ok(())
}

/// A toy dataset alternating between two binary patterns: even units on, and the first half on.
fn stripes(rows: usize, n_visible: usize) -> Array2<f32> {
    Array2::from_shape_fn((rows, n_visible), |(i, j)| {
        let on = if i % 2 == 0 { j % 2 == 0 } else { j < n_visible / 2 };
        if on { 1. } else { 0. }
    })
}
