//! Question orchestration: retrieve context per question kind, prompt the
//! model, and parse whatever comes back.

use super::{
    Completer, parse, prompts,
    types::{Question, QuestionCounts, QuestionKind},
};
use crate::{
    config::GenerationConfig,
    error::{ServiceError, ServiceResult},
    rag::{DocumentMetadata, RagService},
};
use std::path::Path;
use std::sync::Arc;

pub struct QuestionService {
    rag: RagService,
    completer: Arc<dyn Completer>,
    max_questions_per_type: u32,
}

impl QuestionService {
    pub fn new(rag: RagService, completer: Arc<dyn Completer>, config: &GenerationConfig) -> Self {
        Self {
            rag,
            completer,
            max_questions_per_type: config.max_questions_per_type,
        }
    }

    pub fn rag(&self) -> &RagService {
        &self.rag
    }

    pub fn validate_counts(&self, counts: QuestionCounts) -> ServiceResult<()> {
        for kind in [QuestionKind::Open, QuestionKind::YesNo] {
            if counts.get(kind) > self.max_questions_per_type {
                return Err(ServiceError::MissingInput(format!(
                    "At most {} {} questions can be requested",
                    self.max_questions_per_type,
                    kind.label()
                )));
            }
        }
        if counts.total() == 0 {
            return Err(ServiceError::MissingInput(
                "At least one open or yes/no question must be requested".to_string(),
            ));
        }
        Ok(())
    }

    /// Ingests `text` and generates questions from it. Input is validated
    /// before anything is sent to the embedding or completion services.
    pub async fn generate_from_text(
        &mut self,
        text: &str,
        counts: QuestionCounts,
    ) -> ServiceResult<(DocumentMetadata, Vec<Question>)> {
        if text.trim().is_empty() {
            return Err(ServiceError::MissingInput("Text content is required".to_string()));
        }
        self.validate_counts(counts)?;

        let metadata = self.rag.process_text(text).await?;
        let questions = self.generate(counts).await?;
        Ok((metadata, questions))
    }

    pub async fn generate_from_pdf(
        &mut self,
        pdf_path: &Path,
        counts: QuestionCounts,
    ) -> ServiceResult<(DocumentMetadata, Vec<Question>)> {
        self.validate_counts(counts)?;

        let metadata = self.rag.process_pdf(pdf_path).await?;
        let questions = self.generate(counts).await?;
        Ok((metadata, questions))
    }

    /// Generates questions from the current document: open questions first, then yes/no.
    pub async fn generate(&self, counts: QuestionCounts) -> ServiceResult<Vec<Question>> {
        self.validate_counts(counts)?;
        if !self.rag.has_document() {
            return Err(ServiceError::NoDocument);
        }

        let mut questions = Vec::with_capacity(counts.total() as usize);
        for kind in [QuestionKind::Open, QuestionKind::YesNo] {
            let requested = counts.get(kind) as usize;
            if requested > 0 {
                questions.extend(self.generate_kind(kind, requested).await);
            }
        }

        log::info!(
            "Generated {} of {} requested questions",
            questions.len(),
            counts.total()
        );
        Ok(questions)
    }

    /// Never fails: retrieval or model errors are logged and give an empty list.
    async fn generate_kind(&self, kind: QuestionKind, requested: usize) -> Vec<Question> {
        let chunks = match self.rag.context_for(kind, requested).await {
            Ok(chunks) => chunks,
            Err(e) => {
                log::error!("Error retrieving context for {} questions: {:#}", kind.label(), e);
                return Vec::new();
            }
        };

        let prompt = prompts::build_prompt(kind, requested, &prompts::join_context(&chunks));
        let reply = match self.completer.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("Error generating {} questions: {:#}", kind.label(), e);
                return Vec::new();
            }
        };

        let mut questions = parse::parse_questions(kind, &reply);
        if questions.len() > requested {
            log::debug!(
                "Model returned {} {} questions, keeping {}",
                questions.len(),
                kind.label(),
                requested
            );
            questions.truncate(requested);
        }
        questions
    }
}
