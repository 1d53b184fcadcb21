/// 모표준편차 (분모 = 표본 수, N-1 아님)
/// 빈 입력이면 None
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;

    Some(variance.sqrt())
}

/// 소수점 둘째 자리에서 반올림
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_std_dev_known_values() {
        let deviation = population_std_dev(&[10.0, 20.0, 30.0]).unwrap();
        assert!((deviation - 8.164_965_8).abs() < 1e-6);
        assert_eq!(round2(deviation), 8.16);
    }

    #[test]
    fn test_not_sample_std_dev() {
        // 표본표준편차라면 10.0
        let deviation = population_std_dev(&[10.0, 20.0, 30.0]).unwrap();
        assert!(round2(deviation) != 10.0);
    }

    #[test]
    fn test_empty_and_single() {
        assert_eq!(population_std_dev(&[]), None);
        assert_eq!(population_std_dev(&[42.0]), Some(0.0));
        assert_eq!(population_std_dev(&[5.0, 5.0, 5.0]), Some(0.0));
    }

    #[test]
    fn test_order_invariant() {
        let a = population_std_dev(&[67000.0, 66500.25, 68012.5, 65999.0]).unwrap();
        let b = population_std_dev(&[65999.0, 68012.5, 67000.0, 66500.25]).unwrap();
        assert_eq!(round2(a), round2(b));
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(1234.5678), 1234.57);
        assert_eq!(round2(0.004), 0.0);
        assert_eq!(round2(-2.345_1), -2.35);
    }
}
