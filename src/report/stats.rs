use std::fmt;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Error {
    Empty,
    Bounds,
}

/// Summary statistics over one group's latencies, in milliseconds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Stats {
    pub count:  usize,
    pub mean:   f64,
    pub median: f64,
    pub p95:    f64,
    pub p99:    f64,
    pub min:    f64,
    pub max:    f64,
}

impl Stats {
    pub fn compute(samples: &[f64]) -> Result<Self, Error> {
        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        Ok(Self {
            count:  sorted.len(),
            mean:   mean(&sorted)?,
            median: median(&sorted)?,
            p95:    percentile(&sorted, 95.0)?,
            p99:    percentile(&sorted, 99.0)?,
            min:    *sorted.first().ok_or(Error::Empty)?,
            max:    *sorted.last().ok_or(Error::Empty)?,
        })
    }
}

pub fn mean(samples: &[f64]) -> Result<f64, Error> {
    match samples.len() {
        0 => Err(Error::Empty),
        n => Ok(samples.iter().sum::<f64>() / n as f64),
    }
}

/// Median of sorted samples; the mean of the middle pair for even counts.
pub fn median(sorted: &[f64]) -> Result<f64, Error> {
    let n = sorted.len();
    match n {
        0              => Err(Error::Empty),
        _ if n % 2 == 0 => Ok((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
        _              => Ok(sorted[n / 2]),
    }
}

/// Nearest-rank percentile of sorted samples. A fractional rank averages
/// the two samples around it; a rank below one is out of bounds.
pub fn percentile(sorted: &[f64], p: f64) -> Result<f64, Error> {
    let n = sorted.len();

    if n == 0 {
        return Err(Error::Empty);
    }

    if n == 1 {
        return Ok(sorted[0]);
    }

    if p <= 0.0 || p > 100.0 {
        return Err(Error::Bounds);
    }

    let index = p / 100.0 * n as f64;

    if index == index.trunc() {
        let i = index as usize;
        return Ok(sorted[i - 1]);
    }

    if index > 1.0 {
        let i = index as usize;
        return Ok((sorted[i - 1] + sorted[i]) / 2.0);
    }

    Err(Error::Bounds)
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Empty  => write!(f, "input must not be empty"),
            Error::Bounds => write!(f, "input is outside of range"),
        }
    }
}

impl std::error::Error for Error {}
