//! Descriptive and inferential statistics over the experiment logs.

use serde::Serialize;
use serde_json::Value;
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Coerce a judged or reviewed score to a float. Numbers pass through;
/// strings are reduced to their digit characters ("8" in "8/10" context
/// keeps all digits, as the source data pipeline always did); anything
/// else is NaN.
pub fn to_score(value: Option<&Value>) -> f64 {
    match value {
        None | Some(Value::Null) => f64::NAN,
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(other) => {
            let text = match other {
                Value::String(s) => s.clone(),
                v => v.to_string(),
            };
            let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse::<f64>().unwrap_or(f64::NAN)
        }
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (ddof = 1). Zero for a single observation, NaN for none.
pub fn sample_variance(values: &[f64]) -> f64 {
    match values.len() {
        0 => f64::NAN,
        1 => 0.0,
        n => {
            let m = mean(values);
            values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n as f64 - 1.0)
        }
    }
}

pub fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Paired two-sided t-test over aligned observations. Returns (t, p);
/// both NaN with fewer than two pairs.
pub fn paired_t_test(a: &[f64], b: &[f64]) -> (f64, f64) {
    debug_assert_eq!(a.len(), b.len());
    let diffs: Vec<f64> = a.iter().zip(b).map(|(x, y)| x - y).collect();
    let n = diffs.len();
    if n < 2 {
        return (f64::NAN, f64::NAN);
    }

    let d_mean = mean(&diffs);
    let d_std = sample_std(&diffs);
    let t = d_mean / (d_std / (n as f64).sqrt());

    let p = if t.is_nan() {
        f64::NAN
    } else if t.is_infinite() {
        0.0
    } else {
        match StudentsT::new(0.0, 1.0, (n - 1) as f64) {
            Ok(dist) => 2.0 * (1.0 - dist.cdf(t.abs())),
            Err(_) => f64::NAN,
        }
    };

    (t, p)
}

/// Cohen's d for paired samples: mean of the differences over their sample
/// standard deviation. NaN with fewer than two pairs.
pub fn cohens_d_paired(diffs: &[f64]) -> f64 {
    if diffs.len() < 2 {
        return f64::NAN;
    }
    mean(diffs) / sample_std(diffs)
}

/// Five-number summary used for the metrics JSON. Non-finite fields
/// serialize as null.
#[derive(Debug, Clone, Serialize)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> Describe {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    Describe {
        count: finite.len(),
        mean: mean(&finite),
        std: sample_std(&finite),
        min: finite.iter().copied().fold(f64::NAN, f64::min),
        max: finite.iter().copied().fold(f64::NAN, f64::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_score_coercions() {
        assert_eq!(to_score(Some(&json!(8))), 8.0);
        assert_eq!(to_score(Some(&json!(7.5))), 7.5);
        assert_eq!(to_score(Some(&json!("9"))), 9.0);
        // Digit concatenation, faithful to the source pipeline
        assert_eq!(to_score(Some(&json!("8/10"))), 810.0);
        assert!(to_score(Some(&json!("none"))).is_nan());
        assert!(to_score(Some(&json!(null))).is_nan());
        assert!(to_score(None).is_nan());
    }

    #[test]
    fn test_variance_properties() {
        // >= 0 always, 0 exactly when identical
        assert_eq!(sample_variance(&[5.0, 5.0, 5.0]), 0.0);
        assert_eq!(sample_variance(&[7.0]), 0.0);
        let v = sample_variance(&[4.0, 6.0]);
        assert!(v > 0.0);
        assert!((v - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_mean_empty_is_nan() {
        assert!(mean(&[]).is_nan());
    }

    #[test]
    fn test_paired_t_test_symmetric_case() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [1.5, 1.5, 3.5, 3.5];
        let (t, p) = paired_t_test(&a, &b);
        assert!(t.is_finite());
        assert!((0.0..=1.0).contains(&p));

        // Swapping the sides flips the sign but not the p-value
        let (t2, p2) = paired_t_test(&b, &a);
        assert!((t + t2).abs() < 1e-12);
        assert!((p - p2).abs() < 1e-12);
    }

    #[test]
    fn test_paired_t_test_known_value() {
        // d = [1, 1, 1, 1] minus noise-free pairing: t = mean/ (sd/sqrt n)
        let a = [2.0, 3.0, 4.0, 5.0];
        let b = [1.0, 1.0, 2.0, 4.0];
        let (t, p) = paired_t_test(&a, &b);
        // diffs = [1, 2, 2, 1]; mean 1.5, sd 0.57735; t = 5.196
        assert!((t - 5.196152422706632).abs() < 1e-9);
        assert!(p < 0.05);
    }

    #[test]
    fn test_paired_t_test_insufficient_pairs() {
        let (t, p) = paired_t_test(&[1.0], &[2.0]);
        assert!(t.is_nan());
        assert!(p.is_nan());
    }

    #[test]
    fn test_cohens_d() {
        let diffs = [1.0, 2.0, 2.0, 1.0];
        let d = cohens_d_paired(&diffs);
        assert!((d - 1.5 / 0.5773502691896257).abs() < 1e-9);
        assert!(cohens_d_paired(&[1.0]).is_nan());
    }

    #[test]
    fn test_describe_skips_nan() {
        let d = describe(&[1.0, f64::NAN, 3.0]);
        assert_eq!(d.count, 2);
        assert_eq!(d.mean, 2.0);
        assert_eq!(d.min, 1.0);
        assert_eq!(d.max, 3.0);
    }
}
