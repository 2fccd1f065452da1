//! Pulls question lists out of free-text model replies.

use super::types::{Question, QuestionKind};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
struct OpenEntry {
    question: String,
    reference_answer: String,
}

#[derive(Deserialize)]
struct YesNoEntry {
    question: String,
    answer: AnswerRepr,
    justification: String,
}

/// Models answer yes/no questions with either a word or a JSON boolean.
#[derive(Deserialize)]
#[serde(untagged)]
enum AnswerRepr {
    Flag(bool),
    Text(String),
}

impl From<AnswerRepr> for String {
    fn from(repr: AnswerRepr) -> Self {
        match repr {
            AnswerRepr::Flag(true) => "Yes".to_string(),
            AnswerRepr::Flag(false) => "No".to_string(),
            AnswerRepr::Text(s) => s.trim().to_string(),
        }
    }
}

/// The span from the first `{` to the last `}`, inclusive.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Every well-formed entry under `questions`. Anything unparsable yields an empty list.
pub fn parse_questions(kind: QuestionKind, reply: &str) -> Vec<Question> {
    let Some(json_str) = extract_json_object(reply) else {
        log::warn!("Could not find JSON in response content");
        return Vec::new();
    };

    let parsed: Value = match serde_json::from_str(json_str) {
        Ok(value) => value,
        Err(e) => {
            log::warn!(
                "Error parsing JSON: {}. Content: {}...",
                e,
                json_str.chars().take(200).collect::<String>()
            );
            return Vec::new();
        }
    };

    let Some(entries) = parsed.get("questions").and_then(Value::as_array) else {
        log::warn!("No questions found in parsed data");
        return Vec::new();
    };

    let questions: Vec<Question> = entries
        .iter()
        .filter_map(|entry| match parse_entry(kind, entry.clone()) {
            Ok(question) => Some(question),
            Err(e) => {
                log::warn!("Skipping malformed {} question: {}", kind.label(), e);
                None
            }
        })
        .collect();

    log::info!(
        "Successfully extracted {} {} questions",
        questions.len(),
        kind.label()
    );
    questions
}

fn parse_entry(kind: QuestionKind, entry: Value) -> Result<Question, serde_json::Error> {
    match kind {
        QuestionKind::Open => {
            let OpenEntry {
                question,
                reference_answer,
            } = serde_json::from_value(entry)?;
            Ok(Question::Open {
                question,
                reference_answer,
            })
        }
        QuestionKind::YesNo => {
            let YesNoEntry {
                question,
                answer,
                justification,
            } = serde_json::from_value(entry)?;
            Ok(Question::YesNo {
                question,
                answer: answer.into(),
                justification,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_object_from_surrounding_prose() {
        let reply = "Sure! Here you go:\n```json\n{\"questions\": []}\n```\nHope it helps.";
        assert_eq!(extract_json_object(reply), Some("{\"questions\": []}"));
    }

    #[test]
    fn no_braces_means_no_object() {
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("} backwards {"), None);
        assert_eq!(extract_json_object(""), None);
    }

    #[test]
    fn open_questions_are_parsed_regardless_of_prose() {
        let reply = r#"Here are the questions you asked for:
{
  "questions": [
    {"question": "What is ownership?", "reference_answer": "A set of rules for memory."},
    {"question": "What does the borrow checker do?", "reference_answer": "It validates references."}
  ]
}
Let me know if you need more."#;

        let questions = parse_questions(QuestionKind::Open, reply);

        assert_eq!(questions.len(), 2);
        assert_eq!(
            questions[0],
            Question::Open {
                question: "What is ownership?".to_string(),
                reference_answer: "A set of rules for memory.".to_string(),
            }
        );
    }

    #[test]
    fn yes_no_answers_accept_words_and_booleans() {
        let reply = r#"{"questions": [
            {"question": "Is Rust garbage collected?", "answer": false, "justification": "It uses ownership."},
            {"question": "Est-ce compilé ?", "answer": " Oui ", "justification": "Le texte le dit."}
        ]}"#;

        let questions = parse_questions(QuestionKind::YesNo, reply);

        assert_eq!(questions.len(), 2);
        match &questions[0] {
            Question::YesNo { answer, .. } => assert_eq!(answer, "No"),
            other => panic!("unexpected {:?}", other),
        }
        match &questions[1] {
            Question::YesNo { answer, .. } => assert_eq!(answer, "Oui"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn malformed_or_json_free_replies_give_empty_list() {
        assert!(parse_questions(QuestionKind::Open, "I cannot help with that.").is_empty());
        assert!(
            parse_questions(QuestionKind::Open, "{\"questions\": [ {\"question\": }").is_empty()
        );
        assert!(parse_questions(QuestionKind::Open, "{\"items\": []}").is_empty());
        assert!(parse_questions(QuestionKind::Open, "{\"questions\": \"none\"}").is_empty());
    }

    #[test]
    fn entries_missing_fields_are_skipped() {
        let reply = r#"{"questions": [
            {"question": "Complete?", "reference_answer": "Yes."},
            {"question": "No answer here"},
            {"reference_answer": "Orphan answer"}
        ]}"#;

        let questions = parse_questions(QuestionKind::Open, reply);

        assert_eq!(questions.len(), 1);
    }

    #[test]
    fn open_entries_do_not_satisfy_yes_no_schema() {
        let reply = r#"{"questions": [{"question": "Q?", "reference_answer": "A."}]}"#;
        assert!(parse_questions(QuestionKind::YesNo, reply).is_empty());
    }
}
