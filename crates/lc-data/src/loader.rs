use std::path::Path;

use lc_types::{DataError, LcResult};

/// Load one series' split CSV and return the load readings in file order.
///
/// Expected layout is the preprocessing pipeline's output: a header row with
/// a `timestamp` column and a `load` column. Rows whose load value fails to
/// parse are skipped with a warning rather than aborting the series.
pub fn load_series_csv<P: AsRef<Path>>(path: P) -> LcResult<Vec<f64>> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DataError::SplitNotFound {
            path: path.display().to_string(),
        }
        .into());
    }

    tracing::debug!("Loading series data from {}", path.display());

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| DataError::ParseError {
            message: format!("failed to open {}: {}", path.display(), e),
        })?;

    let headers = rdr
        .headers()
        .map_err(|e| DataError::ParseError {
            message: format!("failed to read CSV headers: {e}"),
        })?
        .clone();

    let load_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("load"))
        .ok_or_else(|| DataError::MissingColumn {
            column: "load".to_string(),
            path: path.display().to_string(),
        })?;

    let mut values = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| DataError::ParseError {
            message: format!("failed to read record at line {}: {}", line + 2, e),
        })?;

        match record.get(load_idx).map(str::trim).map(str::parse::<f64>) {
            Some(Ok(v)) if v.is_finite() => values.push(v),
            _ => {
                tracing::warn!(
                    "Skipping unparseable load value at {} line {}",
                    path.display(),
                    line + 2
                );
            }
        }
    }

    if values.is_empty() {
        return Err(DataError::EmptySeries {
            series: path.display().to_string(),
        }
        .into());
    }

    tracing::debug!("Loaded {} readings from {}", values.len(), path.display());
    Ok(values)
}
