use crate::{
    config::GenerationConfig,
    generation::{Question, QuestionCounts, QuestionKind},
    rag::DocumentStats,
};
use serde::{Deserialize, Serialize};

/// Body of `POST /generate`, sent either as JSON or as a urlencoded form.
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub text_content: String,
    pub num_open_questions: Option<u32>,
    pub num_yes_no_questions: Option<u32>,
}

pub fn counts_or_defaults(
    config: &GenerationConfig,
    num_open_questions: Option<u32>,
    num_yes_no_questions: Option<u32>,
) -> QuestionCounts {
    QuestionCounts {
        open: num_open_questions.unwrap_or(config.default_open_questions),
        yes_no: num_yes_no_questions.unwrap_or(config.default_yes_no_questions),
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub status: &'static str,
    pub questions: Vec<Question>,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Serialize)]
pub struct ResponseMetadata {
    pub open_questions: usize,
    pub yes_no_questions: usize,
    pub total_questions: usize,
    pub requested_open_questions: u32,
    pub requested_yes_no_questions: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub document_stats: Option<DocumentStats>,
}

impl GenerateResponse {
    pub fn success(
        questions: Vec<Question>,
        requested: QuestionCounts,
        filename: Option<String>,
        document_stats: Option<DocumentStats>,
    ) -> Self {
        let open_questions = questions
            .iter()
            .filter(|q| q.kind() == QuestionKind::Open)
            .count();
        let total_questions = questions.len();
        Self {
            status: "success",
            metadata: ResponseMetadata {
                open_questions,
                yes_no_questions: total_questions - open_questions,
                total_questions,
                requested_open_questions: requested.open,
                requested_yes_no_questions: requested.yes_no,
                filename,
                document_stats,
            },
            questions,
        }
    }
}
