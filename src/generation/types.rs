use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    Open,
    YesNo,
}

impl QuestionKind {
    /// Similarity query used to pick context passages for this kind.
    pub fn retrieval_query(self) -> &'static str {
        match self {
            QuestionKind::Open => "Find sections that contain detailed explanations or definitions",
            QuestionKind::YesNo => "Find sections that contain factual statements or clear assertions",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            QuestionKind::Open => "open",
            QuestionKind::YesNo => "yes_no",
        }
    }
}

/// A generated question as returned to clients, tagged by `"type"`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Question {
    Open {
        question: String,
        reference_answer: String,
    },
    YesNo {
        question: String,
        answer: String,
        justification: String,
    },
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        match self {
            Question::Open { .. } => QuestionKind::Open,
            Question::YesNo { .. } => QuestionKind::YesNo,
        }
    }
}

/// How many questions of each kind a caller wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionCounts {
    pub open: u32,
    pub yes_no: u32,
}

impl QuestionCounts {
    /// Widened so client-supplied counts near `u32::MAX` cannot overflow.
    pub fn total(&self) -> u64 {
        u64::from(self.open) + u64::from(self.yes_no)
    }

    pub fn get(&self, kind: QuestionKind) -> u32 {
        match kind {
            QuestionKind::Open => self.open,
            QuestionKind::YesNo => self.yes_no,
        }
    }
}
