// Verdict policy for Gauntlet
// Maps a probe outcome plus a per-check rule onto a Verdict

use crate::models::{Response, Verdict};

/// What a specific check expects from its probe.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// Any 2xx or 3xx.
    Success,
    /// Any 4xx.
    ClientError,
    /// One of the listed status codes.
    StatusIn(Vec<u16>),
    /// The check already evaluated its own condition on the response.
    Condition { holds: bool, otherwise: Verdict },
    /// Observation only; never fails.
    Informational,
}

impl Rule {
    /// Human-readable expectation for the result's `expected` column.
    pub fn describe(&self) -> String {
        match self {
            Rule::Success => "2xx-3xx".to_string(),
            Rule::ClientError => "4xx".to_string(),
            Rule::StatusIn(codes) => codes
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" or "),
            Rule::Condition { .. } => "condition holds".to_string(),
            Rule::Informational => "informational".to_string(),
        }
    }
}

/// Decide the verdict for a probe.
///
/// `response` is None when the transport failed; that outcome is `Bug`.
/// Any 5xx is `Bug` regardless of `rule`.
pub fn decide_verdict(response: Option<&Response>, rule: &Rule) -> Verdict {
    decide_verdict_or(response, rule, Verdict::Bug)
}

/// Like [`decide_verdict`] with a caller-chosen verdict for transport failures.
pub fn decide_verdict_or(response: Option<&Response>, rule: &Rule, no_response: Verdict) -> Verdict {
    let response = match response {
        Some(r) => r,
        None => return no_response,
    };

    if response.is_server_error() {
        return Verdict::Bug;
    }

    match rule {
        Rule::Success => pass_if(response.is_success(), Verdict::Fail),
        Rule::ClientError => pass_if(response.is_client_error(), Verdict::Fail),
        Rule::StatusIn(codes) => pass_if(codes.contains(&response.status), Verdict::Fail),
        Rule::Condition { holds, otherwise } => pass_if(*holds, *otherwise),
        Rule::Informational => Verdict::Info,
    }
}

fn pass_if(holds: bool, otherwise: Verdict) -> Verdict {
    if holds {
        Verdict::Pass
    } else {
        otherwise
    }
}

/// Rule for a dataset probe: valid values should succeed, invalid ones be rejected.
pub fn dataset_rule(is_valid: bool) -> Rule {
    if is_valid {
        Rule::Success
    } else {
        Rule::ClientError
    }
}
