use crate::error::Result;
use crate::llm::prompts::{
    compliance_analysis_prompt, contract_extraction_prompt, risk_assessment_prompt,
    COMPLIANCE_ANALYSIS, CONTRACT_DETAILS, RISK_ASSESSMENT,
};
use crate::pipeline::{Pipeline, Stage};

/// Contract details feed the compliance review; both feed the risk assessment.
pub fn contract_pipeline() -> Result<Pipeline> {
    Pipeline::builder()
        .stage(Stage::new(CONTRACT_DETAILS, contract_extraction_prompt))
        .stage(Stage::new(COMPLIANCE_ANALYSIS, compliance_analysis_prompt).depends_on(CONTRACT_DETAILS))
        .stage(
            Stage::new(RISK_ASSESSMENT, risk_assessment_prompt)
                .depends_on(CONTRACT_DETAILS)
                .depends_on(COMPLIANCE_ANALYSIS),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::OutputKind;

    #[test]
    fn test_contract_pipeline_shape() {
        let pipeline = contract_pipeline().unwrap();
        let ids: Vec<_> = pipeline.stages().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![CONTRACT_DETAILS, COMPLIANCE_ANALYSIS, RISK_ASSESSMENT]);

        let risk = pipeline.get(RISK_ASSESSMENT).unwrap();
        assert_eq!(risk.dependencies, vec![CONTRACT_DETAILS, COMPLIANCE_ANALYSIS]);
        assert!(pipeline
            .stages()
            .iter()
            .all(|s| s.output_kind == OutputKind::Structured));
    }
}
