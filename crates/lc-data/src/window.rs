use lc_types::{DataError, LcResult};

/// A windowed dataset split into training and validation halves.
///
/// Time order is preserved: the validation tail is strictly later than the
/// training head, and nothing is shuffled.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitDataset {
    pub x_train: Vec<Vec<f64>>,
    pub y_train: Vec<f64>,
    pub x_val: Vec<Vec<f64>>,
    pub y_val: Vec<f64>,
}

impl SplitDataset {
    /// Window a raw series and split it in one step.
    pub fn prepare(series: &[f64], window_size: usize, val_fraction: f64) -> LcResult<Self> {
        let (x, y) = make_windows(series, window_size)?;
        split_train_val(x, y, val_fraction)
    }

    pub fn train_len(&self) -> usize {
        self.y_train.len()
    }

    pub fn val_len(&self) -> usize {
        self.y_val.len()
    }
}

/// Slide a window of `window_size` readings over the series; each window
/// predicts the reading immediately after it.
pub fn make_windows(series: &[f64], window_size: usize) -> LcResult<(Vec<Vec<f64>>, Vec<f64>)> {
    if window_size == 0 {
        return Err(DataError::ParseError {
            message: "window size must be at least 1".to_string(),
        }
        .into());
    }
    if series.len() <= window_size {
        return Err(DataError::InsufficientData {
            needed: window_size + 1,
            available: series.len(),
        }
        .into());
    }

    let count = series.len() - window_size;
    let mut x = Vec::with_capacity(count);
    let mut y = Vec::with_capacity(count);
    for start in 0..count {
        x.push(series[start..start + window_size].to_vec());
        y.push(series[start + window_size]);
    }
    Ok((x, y))
}

/// Ordered train/validation split: the last `val_fraction` of the windows
/// become the validation set.
pub fn split_train_val(
    x: Vec<Vec<f64>>,
    y: Vec<f64>,
    val_fraction: f64,
) -> LcResult<SplitDataset> {
    if !(0.0..1.0).contains(&val_fraction) {
        return Err(DataError::ParseError {
            message: format!("val_fraction {val_fraction} outside [0, 1)"),
        }
        .into());
    }

    let total = y.len();
    let val_len = ((total as f64) * val_fraction).round() as usize;
    if val_len == 0 || val_len >= total {
        return Err(DataError::InsufficientData {
            needed: 2,
            available: total,
        }
        .into());
    }
    let split_at = total - val_len;

    let mut x = x;
    let mut y = y;
    let x_val = x.split_off(split_at);
    let y_val = y.split_off(split_at);

    Ok(SplitDataset {
        x_train: x,
        y_train: y,
        x_val,
        y_val,
    })
}
