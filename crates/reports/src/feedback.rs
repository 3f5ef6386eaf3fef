//! Client-feedback artifact: one JSON record per completed project with
//! scaled satisfaction answers and empty free-text fields.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use sim_core::{ProjectStatus, SimRng};
use sim_projects::ProjectStore;

const SCALE_VALUES: [u8; 5] = [1, 2, 3, 4, 5];
const SCALE_WEIGHTS: [f64; 5] = [0.05, 0.05, 0.2, 0.4, 0.3];

/// One answer inside a feedback record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    #[serde(rename = "questionID")]
    pub question_id: String,
    pub question_text: String,
    pub response_type: String,
    pub response_value: String,
}

/// One survey record for a completed project.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRecord {
    #[serde(rename = "responseID")]
    pub response_id: String,
    #[serde(rename = "projectID")]
    pub project_id: u32,
    #[serde(rename = "clientID")]
    pub client_id: u32,
    pub survey_date: String,
    pub responses: Vec<FeedbackResponse>,
    pub overall_satisfaction: String,
}

/// Build feedback records for every Completed project.
pub fn generate_client_feedback(projects: &ProjectStore, rng: &mut SimRng) -> Vec<FeedbackRecord> {
    let mut records = Vec::new();
    for p in projects.projects() {
        if p.status != ProjectStatus::Completed {
            continue;
        }
        let Some(survey_date) = p.actual_end else {
            continue;
        };
        let outcome = *rng.weighted_choice(&SCALE_VALUES, &SCALE_WEIGHTS);
        let communication = *rng.weighted_choice(&SCALE_VALUES, &SCALE_WEIGHTS);
        let overall = (outcome as f64 + communication as f64) / 2.0;
        records.push(FeedbackRecord {
            response_id: format!("{}", rng.int_in_range(10_000, 99_999)),
            project_id: p.id.0,
            client_id: p.client.0,
            survey_date: survey_date.format("%Y-%m-%d").to_string(),
            responses: vec![
                FeedbackResponse {
                    question_id: "Q1".into(),
                    question_text: "How satisfied are you with the project outcome?".into(),
                    response_type: "scale".into(),
                    response_value: outcome.to_string(),
                },
                FeedbackResponse {
                    question_id: "Q2".into(),
                    question_text: "Please rate the communication from our team.".into(),
                    response_type: "scale".into(),
                    response_value: communication.to_string(),
                },
                FeedbackResponse {
                    question_id: "Q3".into(),
                    question_text: "What did you like best about working with us?".into(),
                    response_type: "text".into(),
                    response_value: String::new(),
                },
                FeedbackResponse {
                    question_id: "Q4".into(),
                    question_text: "What could we improve on?".into(),
                    response_type: "text".into(),
                    response_value: String::new(),
                },
            ],
            overall_satisfaction: format!("{overall:.1}"),
        });
    }
    records
}

/// Write the records as a pretty-printed JSON array.
pub fn write_client_feedback<P: AsRef<Path>>(path: P, records: &[FeedbackRecord]) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, serde_json::to_string_pretty(records)?)?;
    info!(records = records.len(), "client-feedback JSON written");
    Ok(())
}
