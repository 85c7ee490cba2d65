//! Test registry: how many checks each suite will run, known before any request is sent.

use serde::Serialize;

use crate::models::TestOptions;
use crate::suites::{plan_probes, PERFORMANCE_CHECKS, SECURITY_CHECKS};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlannedCounts {
    pub data_driven: usize,
    pub security: usize,
    pub performance: usize,
}

impl PlannedCounts {
    pub fn total(&self) -> usize {
        self.data_driven + self.security + self.performance
    }
}

/// Count the checks of every suite for a baseline.
pub fn count_checks(options: &TestOptions) -> PlannedCounts {
    PlannedCounts {
        data_driven: plan_probes(options).len(),
        security: SECURITY_CHECKS.len(),
        performance: PERFORMANCE_CHECKS.len(),
    }
}

/// Check names of the fixed-table suites, in execution order.
pub fn security_check_names() -> Vec<&'static str> {
    SECURITY_CHECKS.iter().map(|c| c.name).collect()
}

pub fn performance_check_names() -> Vec<&'static str> {
    PERFORMANCE_CHECKS.iter().map(|c| c.name).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Method, Request};

    #[test]
    fn get_without_body_or_query_counts_baseline_only() {
        let options = TestOptions::from_request(Request::new(Method::GET, "https://api.example.com/orders"));
        let counts = count_checks(&options);
        assert_eq!(counts.data_driven, 1);
        assert_eq!(counts.security, 14);
        assert_eq!(counts.performance, 4);
        assert_eq!(counts.total(), 19);
    }

    #[test]
    fn names_follow_table_order() {
        let names = security_check_names();
        assert_eq!(names.first(), Some(&"Sensitive server header"));
        assert_eq!(names.last(), Some(&"Large payload"));
        assert_eq!(performance_check_names()[0], "Median response time");
    }
}
