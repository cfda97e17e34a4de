use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::analysis::keywords::KeywordBudget;
use crate::analysis::report::ReportAssembler;
use crate::analysis::rules::RuleBook;
use crate::llm_client::ProviderChain;
use crate::models::report::{CandidateReport, Narrative, ReportResponse};
use crate::models::snapshot::AnalysisSnapshot;
use crate::reports::prompts::{narrative_prompt, narrative_system};

pub const TEMPLATE_PROVIDER: &str = "template";
pub const FULL_REPORT: &str = "full";

/// Builds the deterministic report and asks the provider chain for a narrative.
/// Never fails: with no usable provider the response is the report alone.
#[derive(Clone)]
pub struct ReportGenerator {
    rules: Arc<RuleBook>,
    budget: KeywordBudget,
    providers: ProviderChain,
}

impl ReportGenerator {
    pub fn new(rules: Arc<RuleBook>, budget: KeywordBudget, providers: ProviderChain) -> Self {
        Self {
            rules,
            budget,
            providers,
        }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.providers.names()
    }

    pub fn assemble(&self, snapshot: &AnalysisSnapshot) -> CandidateReport {
        ReportAssembler::new(&self.rules, self.budget).assemble(snapshot)
    }

    pub async fn generate(&self, snapshot: &AnalysisSnapshot, from_snapshot: bool) -> ReportResponse {
        let report = self.assemble(snapshot);

        let outcome = self
            .providers
            .generate_json::<Narrative>(&narrative_system(), &narrative_prompt(&report))
            .await;

        let (provider, model, narrative) = match outcome.generated {
            Some(g) => (g.provider, Some(g.model), Some(g.value)),
            None => {
                info!("Template report for {}", report.username);
                (TEMPLATE_PROVIDER.to_string(), None, None)
            }
        };

        ReportResponse {
            report_type: FULL_REPORT.to_string(),
            provider,
            model,
            from_snapshot,
            generated_at: Utc::now(),
            report,
            narrative,
            provider_failures: outcome.failures,
        }
    }
}
