//! Suite orchestration.
//!
//! Data-driven and security suites run side by side (each sequential inside);
//! performance insights run afterwards on the data-driven samples.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::engine::HttpTransport;
use crate::models::{TestOptions, TestResult};
use crate::suites::{
    no_progress, DataDrivenRunner, PerformanceInsights, ProbeHook, SecuritySuite, Suite,
    DATA_DRIVEN_SUITE, PERFORMANCE_SUITE, SECURITY_SUITE,
};

/// `{suite name: callback}` progress hooks.
#[derive(Default, Clone)]
pub struct ProgressHooks {
    hooks: HashMap<String, Arc<ProbeHook>>,
}

impl ProgressHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, suite: &str, hook: Arc<ProbeHook>) -> Self {
        self.hooks.insert(suite.to_string(), hook);
        self
    }

    fn hook_for(&self, suite: &str) -> Arc<ProbeHook> {
        self.hooks
            .get(suite)
            .cloned()
            .unwrap_or_else(|| Arc::new(no_progress))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuiteSelection {
    pub data_driven: bool,
    pub security: bool,
    pub performance: bool,
}

impl SuiteSelection {
    pub fn all() -> Self {
        Self {
            data_driven: true,
            security: true,
            performance: true,
        }
    }

    pub fn only(suite: &str) -> Option<Self> {
        let none = Self {
            data_driven: false,
            security: false,
            performance: false,
        };
        match suite {
            "all" => Some(Self::all()),
            DATA_DRIVEN_SUITE | "data" => Some(Self { data_driven: true, ..none }),
            SECURITY_SUITE => Some(Self { security: true, ..none }),
            PERFORMANCE_SUITE => Some(Self { performance: true, ..none }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub data_driven: Vec<TestResult>,
    pub security: Vec<TestResult>,
    pub performance: Vec<TestResult>,
}

impl RunReport {
    /// Results of every suite that ran, labelled by suite.
    pub fn by_suite(&self) -> Vec<(&'static str, &[TestResult])> {
        vec![
            (DATA_DRIVEN_SUITE, self.data_driven.as_slice()),
            (SECURITY_SUITE, self.security.as_slice()),
            (PERFORMANCE_SUITE, self.performance.as_slice()),
        ]
        .into_iter()
        .filter(|(_, results)| !results.is_empty())
        .collect()
    }

    pub fn all_results(&self) -> Vec<TestResult> {
        self.data_driven
            .iter()
            .chain(self.security.iter())
            .chain(self.performance.iter())
            .cloned()
            .collect()
    }
}

/// Run the selected suites against one baseline.
///
/// Performance insights need data-driven samples, so selecting them also runs
/// the data-driven suite.
pub async fn run_suites(
    transport: Arc<dyn HttpTransport>,
    options: &TestOptions,
    selection: SuiteSelection,
    hooks: &ProgressHooks,
) -> RunReport {
    let data_runner = DataDrivenRunner::new(Arc::clone(&transport));
    let security = SecuritySuite::new(Arc::clone(&transport));
    let data_hook = hooks.hook_for(DATA_DRIVEN_SUITE);
    let security_hook = hooks.hook_for(SECURITY_SUITE);

    let run_data = selection.data_driven || selection.performance;
    let (data_driven, security_results) = tokio::join!(
        async {
            if run_data {
                data_runner.run(options, data_hook.as_ref()).await
            } else {
                Vec::new()
            }
        },
        async {
            if selection.security {
                security.run(options, security_hook.as_ref()).await
            } else {
                Vec::new()
            }
        }
    );

    let performance = if selection.performance {
        let insights = PerformanceInsights::from_results(Arc::clone(&transport), &data_driven);
        insights
            .run(options, hooks.hook_for(PERFORMANCE_SUITE).as_ref())
            .await
    } else {
        Vec::new()
    };

    let report = RunReport {
        data_driven,
        security: security_results,
        performance,
    };
    info!(results = report.all_results().len(), "run finished");
    report
}
