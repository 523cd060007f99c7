use crate::analysis::risk::screen_keywords;
use crate::pipeline::StageInputs;

pub const SYSTEM_PROMPT: &str = r#"You are an expert IT contract analyst supporting procurement and legal teams.
You read contract text and earlier analysis results and answer precisely.

When asked for JSON, respond with a single valid JSON object and nothing else.
Only report facts supported by the contract text; use null for anything the contract does not state."#;

pub const CONTRACT_DETAILS: &str = "contract_details";
pub const COMPLIANCE_ANALYSIS: &str = "compliance_analysis";
pub const RISK_ASSESSMENT: &str = "risk_assessment";

pub fn contract_extraction_prompt(inputs: &StageInputs<'_>) -> String {
    format!(
        r#"Analyze the following IT contract and extract key information:

{}

Extract and organize the following elements:
1. Contract parties (names of all organizations involved)
2. Contract effective date and termination date
3. Contract type (e.g., SaaS, software license, maintenance, consulting)
4. Contract value and payment terms
5. Key deliverables or services
6. SLAs or performance metrics
7. Termination conditions
8. Intellectual property clauses
9. Data handling and privacy clauses
10. Any unique or unusual clauses

Respond with a JSON object using these categories as keys:
"#,
        inputs.document()
    )
}

pub fn compliance_analysis_prompt(inputs: &StageInputs<'_>) -> String {
    let details = section(inputs, CONTRACT_DETAILS);

    format!(
        r#"Analyze the parsed contract information below for legal compliance issues.

PARSED CONTRACT INFORMATION:
{}

Evaluate:
1. GDPR and data privacy compliance
2. Intellectual property protections
3. Liability and indemnification clauses
4. Service level agreement enforceability
5. Termination and exit provisions
6. Regulatory compliance specific to IT services
7. Security and data breach provisions
8. Force majeure clauses
9. Jurisdictional issues
10. Vague or ambiguous language

For each issue give the problematic clause or gap, the legal risk, and a recommendation.
Respond with a JSON object keyed by compliance area:
"#,
        details
    )
}

pub fn risk_assessment_prompt(inputs: &StageInputs<'_>) -> String {
    let details = section(inputs, CONTRACT_DETAILS);
    let compliance = section(inputs, COMPLIANCE_ANALYSIS);
    let screen = keyword_screen(inputs.document());

    format!(
        r#"Conduct a risk assessment of the IT contract based on the information below.

PARSED CONTRACT INFORMATION:
{}

LEGAL COMPLIANCE ANALYSIS:
{}

KEYWORD SCREEN OF THE CONTRACT TEXT (indicative only):
{}

Cover financial, operational, strategic, reputational, security and data, vendor,
and exit/transition risks. For each risk assign a level (High, Medium, Low), the
business impact, mitigation strategies and negotiation recommendations.

Finish with an overall risk score (1-10) and the 3-5 most critical risk areas.
Respond with a JSON object keyed by risk area plus a "summary" key:
"#,
        details, compliance, screen
    )
}

fn keyword_screen(document: &str) -> String {
    let risks = screen_keywords(document);
    if risks.is_empty() {
        return "(no risk keywords found)".to_string();
    }

    risks
        .iter()
        .map(|risk| {
            format!(
                "- {}: {} ({})",
                risk.category,
                risk.level,
                risk.keywords_found.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn section(inputs: &StageInputs<'_>, stage_id: &str) -> String {
    inputs
        .get(stage_id)
        .map(|value| value.to_string())
        .unwrap_or_else(|| "(not available)".to_string())
}
