#[cfg(test)]
mod tests {
    use crate::config::ScoringConfig;
    use crate::types::{PaginationOptions, PaginationResult, YearMonth};
    use chrono::NaiveDate;

    #[test]
    fn test_scoring_config_default_sums_to_100() {
        let cfg = ScoringConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_scoring_config_rejects_bad_sum() {
        let mut cfg = ScoringConfig::default();
        cfg.margin_max = 31;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_scoring_config_rejects_gate_above_max() {
        let mut cfg = ScoringConfig::default();
        cfg.time_pressure_gate = cfg.time_pressure_max + 1;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_year_month_formatting() {
        let ym = YearMonth::from_date(NaiveDate::from_ymd_opt(2026, 7, 31).unwrap());
        assert_eq!(ym.as_str(), "2026-07");
    }

    #[test]
    fn test_pagination_total_pages() {
        let result = PaginationResult::new(vec![1, 2, 3], 23, PaginationOptions { page: 1, limit: 10 });
        assert_eq!(result.total_pages, 3);
    }
}
