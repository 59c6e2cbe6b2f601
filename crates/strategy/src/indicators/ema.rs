/// Exponential Moving Average over a series that may start with undefined values.
///
/// The first output is the simple average of the first `period` defined inputs;
/// every later defined input is smoothed with `k = 2 / (period + 1)`.
/// Positions before the seed, and positions whose input is undefined, are `None`.
pub fn ema_series(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let mut seed_sum = 0.0;
    let mut seed_len = 0usize;
    let mut prev: Option<f64> = None;

    for (i, value) in values.iter().enumerate() {
        let Some(value) = *value else { continue };
        match prev {
            Some(ema) => {
                let next = value * k + ema * (1.0 - k);
                out[i] = Some(next);
                prev = Some(next);
            }
            None => {
                seed_sum += value;
                seed_len += 1;
                if seed_len == period {
                    let seed = seed_sum / period as f64;
                    out[i] = Some(seed);
                    prev = Some(seed);
                }
            }
        }
    }
    out
}

/// EMA over fully-defined closes.
pub fn ema_of_closes(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let values: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
    ema_series(&values, period)
}
