// Data-driven field testing for Gauntlet
//
// For each mapped field: one whitespace-normalization probe (string-like
// fields only), then one probe per dataset entry of the field's type. Body
// fields come first, then query parameters. A baseline probe opens the run.
//
// The plan is computed up front and shared by `planned_checks` and `run`,
// so the progress total always matches the number of probes sent.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use super::{exchange, ProbeHook, Suite};
use crate::dataset::dataset_for;
use crate::engine::HttpTransport;
use crate::models::{FieldMapping, ProbeValue, Request, TestOptions, TestResult, Verdict};
use crate::mutator::{mutate_body, mutate_query, pad_whitespace, set_structured};
use crate::parameters::{get_path, query_pairs, with_query_pairs, StructuredBody};
use crate::response_analysis::body_echoes;
use crate::verdict::{dataset_rule, decide_verdict, Rule};

pub const DATA_DRIVEN_SUITE: &str = "data-driven";
pub const BASELINE_CHECK: &str = "Baseline request";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLocation {
    Body,
    Query,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeKind {
    Baseline,
    Normalization { location: FieldLocation, path: String, padded: String },
    Dataset { location: FieldLocation, path: String, probe: ProbeValue },
}

/// One probe of the run, named as it will appear in the results.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedProbe {
    pub name: String,
    pub kind: ProbeKind,
}

/// Every probe a data-driven run sends, in order.
pub fn plan_probes(options: &TestOptions) -> Vec<PlannedProbe> {
    let mut plan = vec![PlannedProbe {
        name: BASELINE_CHECK.to_string(),
        kind: ProbeKind::Baseline,
    }];

    let request = &options.request;
    let body = StructuredBody::from_request(&request.body, &request.headers);
    let body_value = |path: &str| -> Option<Value> {
        match body.as_ref()? {
            StructuredBody::Json(json) => get_path(json, path).cloned(),
            StructuredBody::Form(pairs) => pairs
                .iter()
                .find(|(k, _)| k == path)
                .map(|(_, v)| Value::String(v.clone())),
        }
    };
    if body.is_some() {
        plan_location(&mut plan, FieldLocation::Body, &options.body_fields, body_value);
    }

    let query = query_pairs(&request.url);
    let query_value = |path: &str| -> Option<Value> {
        query
            .iter()
            .find(|(k, _)| k == path)
            .map(|(_, v)| Value::String(v.clone()))
    };
    plan_location(&mut plan, FieldLocation::Query, &options.query_fields, query_value);

    plan
}

fn plan_location(
    plan: &mut Vec<PlannedProbe>,
    location: FieldLocation,
    mapping: &FieldMapping,
    current_value: impl Fn(&str) -> Option<Value>,
) {
    let prefix = match location {
        FieldLocation::Body => "",
        FieldLocation::Query => "query ",
    };

    for (path, field_type) in mapping.iter() {
        if !field_type.is_string_like() {
            continue;
        }
        if let Some(Value::String(current)) = current_value(path) {
            plan.push(PlannedProbe {
                name: format!("{}{}: whitespace normalization", prefix, path),
                kind: ProbeKind::Normalization {
                    location,
                    path: path.to_string(),
                    padded: pad_whitespace(&current),
                },
            });
        }
    }

    for (path, field_type) in mapping.iter() {
        if current_value(path).is_none() {
            continue;
        }
        for probe in dataset_for(field_type) {
            plan.push(PlannedProbe {
                name: format!("{}{} = {}", prefix, path, display_value(&probe.value)),
                kind: ProbeKind::Dataset {
                    location,
                    path: path.to_string(),
                    probe: probe.clone(),
                },
            });
        }
    }
}

/// JSON rendering of a probe value, shortened for result names.
fn display_value(value: &Value) -> String {
    const MAX_CHARS: usize = 40;
    let rendered = value.to_string();
    if rendered.chars().count() <= MAX_CHARS {
        return rendered;
    }
    let head: String = rendered.chars().take(MAX_CHARS).collect();
    format!("{}... ({} chars)", head, rendered.chars().count())
}

pub struct DataDrivenRunner {
    transport: Arc<dyn HttpTransport>,
}

impl DataDrivenRunner {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Build the request a planned probe sends.
    fn build_request(options: &TestOptions, kind: &ProbeKind) -> Request {
        let baseline = &options.request;
        let mut request = baseline.clone();
        match kind {
            ProbeKind::Baseline => {}
            ProbeKind::Normalization { location, path, padded } => match location {
                FieldLocation::Body => {
                    if let Some(mut body) =
                        StructuredBody::from_request(&baseline.body, &baseline.headers)
                    {
                        set_structured(&mut body, path, Value::String(padded.clone()));
                        request.body = body.into_body();
                    }
                }
                FieldLocation::Query => {
                    let mut pairs = query_pairs(&baseline.url);
                    if let Some(pair) = pairs.iter_mut().find(|(k, _)| k == path) {
                        pair.1 = padded.clone();
                    }
                    request.url = with_query_pairs(&baseline.url, &pairs);
                }
            },
            ProbeKind::Dataset { location, path, probe } => match location {
                FieldLocation::Body => {
                    if let Some(body) =
                        StructuredBody::from_request(&baseline.body, &baseline.headers)
                    {
                        request.body =
                            mutate_body(&body, &options.body_fields, Some(path.as_str()), Some(&probe.value))
                                .into_body();
                    }
                }
                FieldLocation::Query => {
                    request.url = mutate_query(
                        &baseline.url,
                        &options.query_fields,
                        Some(path.as_str()),
                        Some(&probe.value),
                    );
                }
            },
        }
        request
    }

    async fn execute(&self, options: &TestOptions, planned: &PlannedProbe) -> TestResult {
        let request = Self::build_request(options, &planned.kind);
        let ex = exchange(self.transport.as_ref(), &request).await;

        let (expected, rule, value) = match &planned.kind {
            ProbeKind::Baseline => (Rule::Success.describe(), Rule::Success, None),
            ProbeKind::Normalization { padded, .. } => {
                let echoed = ex
                    .response()
                    .map(|resp| resp.is_success() && body_echoes(resp, padded))
                    .unwrap_or(false);
                (
                    "4xx or value not echoed untrimmed".to_string(),
                    Rule::Condition { holds: !echoed, otherwise: Verdict::Fail },
                    Some(Value::String(padded.clone())),
                )
            }
            ProbeKind::Dataset { probe, .. } => {
                let rule = dataset_rule(probe.is_valid);
                (rule.describe(), rule, Some(probe.value.clone()))
            }
        };

        let status = decide_verdict(ex.response(), &rule);
        let mut result = ex.to_result(planned.name.clone(), expected, ex.actual(), status, request);
        if let Some(value) = value {
            result = result.with_value(value);
        }
        result
    }
}

#[async_trait]
impl Suite for DataDrivenRunner {
    fn name(&self) -> &'static str {
        DATA_DRIVEN_SUITE
    }

    fn planned_checks(&self, options: &TestOptions) -> usize {
        plan_probes(options).len()
    }

    async fn run(&self, options: &TestOptions, on_probe: &ProbeHook) -> Vec<TestResult> {
        let plan = plan_probes(options);
        let mut results = Vec::with_capacity(plan.len());

        for planned in &plan {
            let result = self.execute(options, planned).await;
            tracing::debug!(
                check = %result.name,
                verdict = %result.status,
                value = %result.value.as_ref().map(display_value).unwrap_or_default(),
                "data-driven probe finished"
            );
            on_probe(&result);
            results.push(result);
        }

        let bugs = results.iter().filter(|r| r.status == Verdict::Bug).count();
        let failed = results.iter().filter(|r| r.status == Verdict::Fail).count();
        info!(probes = results.len(), failed, bugs, "data-driven suite finished");
        results
    }
}
