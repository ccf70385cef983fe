use crate::error::ApiError;

/// Per-session aggregate scores derived from the individual responses at
/// submission time. They are deliberately not recomputed by the admin
/// update path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSummary {
    pub accuracy: f64,
    pub relevancy: f64,
    pub performance: f64,
    pub total: f64,
}

/// Arithmetic mean of each score column, plus the mean of the three means.
/// An empty submission is rejected here so the division can never hit zero.
pub fn aggregate(scores: &[(i32, i32, i32)]) -> Result<ScoreSummary, ApiError> {
    if scores.is_empty() {
        return Err(ApiError::validation("responses must not be empty"));
    }

    let n = scores.len() as f64;
    let accuracy = scores.iter().map(|s| s.0 as f64).sum::<f64>() / n;
    let relevancy = scores.iter().map(|s| s.1 as f64).sum::<f64>() / n;
    let performance = scores.iter().map(|s| s.2 as f64).sum::<f64>() / n;
    let total = (accuracy + relevancy + performance) / 3.0;

    Ok(ScoreSummary {
        accuracy,
        relevancy,
        performance,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_two_responses() {
        let summary = aggregate(&[(4, 5, 3), (2, 3, 5)]).unwrap();

        assert_eq!(summary.accuracy, 3.0);
        assert_eq!(summary.relevancy, 4.0);
        assert_eq!(summary.performance, 4.0);
        assert!((summary.total - 11.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_total_is_mean_of_means() {
        let summary = aggregate(&[(5, 1, 3), (2, 2, 2), (4, 4, 1), (1, 5, 5)]).unwrap();

        let expected = (summary.accuracy + summary.relevancy + summary.performance) / 3.0;
        assert!((summary.total - expected).abs() < 1e-9);
    }

    #[test]
    fn test_single_response() {
        let summary = aggregate(&[(5, 5, 5)]).unwrap();
        assert_eq!(summary.total, 5.0);
    }

    #[test]
    fn test_empty_responses_rejected() {
        let err = aggregate(&[]).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }
}
