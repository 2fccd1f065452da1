use super::types::QuestionKind;

const LANGUAGE_RULES: &str = r#"IMPORTANT INSTRUCTIONS:
1. Create questions that are strictly based ONLY on the information contained in the text above.
2. Do not use any external knowledge or information not present in the provided text.
3. The questions and answers MUST be in the SAME LANGUAGE as the input text.
   - If the text is in French, generate questions and answers in French.
   - If the text is in Arabic, generate questions and answers in Arabic.
   - Always match the exact language of the original text."#;

pub fn build_prompt(kind: QuestionKind, num_questions: usize, context: &str) -> String {
    match kind {
        QuestionKind::Open => open_questions_prompt(num_questions, context),
        QuestionKind::YesNo => yes_no_questions_prompt(num_questions, context),
    }
}

pub fn open_questions_prompt(num_questions: usize, context: &str) -> String {
    format!(
        r#"Generate {num_questions} open-ended questions about the following text:

{context}

{LANGUAGE_RULES}

Each question should:
1. Be an open-ended question (not multiple choice)
2. Include a comprehensive reference answer that can be directly verified from the text
3. Encourage thoughtful responses rather than simple yes/no or one-word answers

Format the response as JSON:
{{
  "questions": [
    {{
      "question": "...",
      "reference_answer": "..."
    }}
  ]
}}

Provide ONLY the JSON with no additional text.
"#
    )
}

pub fn yes_no_questions_prompt(num_questions: usize, context: &str) -> String {
    format!(
        r#"Generate {num_questions} yes/no questions about the following text:

{context}

{LANGUAGE_RULES}

Each question should:
1. Be answerable with a clear "Yes" or "No" using only the text
2. Mix questions whose correct answer is "Yes" with questions whose correct answer is "No"
3. Include a short justification quoting or paraphrasing the part of the text that settles the answer

Format the response as JSON:
{{
  "questions": [
    {{
      "question": "...",
      "answer": "Yes",
      "justification": "..."
    }}
  ]
}}

The "answer" field must be "Yes" or "No" written in the language of the text.
Provide ONLY the JSON with no additional text.
"#
    )
}

/// Joins retrieved chunks into one context block.
pub fn join_context(chunks: &[String]) -> String {
    chunks
        .iter()
        .map(|c| c.trim())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompts_embed_count_and_context() {
        let prompt = build_prompt(QuestionKind::Open, 3, "Rust has no garbage collector.");
        assert!(prompt.contains("Generate 3 open-ended questions"));
        assert!(prompt.contains("Rust has no garbage collector."));
        assert!(prompt.contains("\"reference_answer\""));
        assert!(prompt.contains("SAME LANGUAGE"));

        let prompt = build_prompt(QuestionKind::YesNo, 2, "ctx");
        assert!(prompt.contains("Generate 2 yes/no questions"));
        assert!(prompt.contains("\"justification\""));
        assert!(!prompt.contains("reference_answer"));
    }

    #[test]
    fn template_braces_render_as_json() {
        let prompt = open_questions_prompt(1, "ctx");
        assert!(prompt.contains("{\n  \"questions\": ["));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn context_chunks_are_separated_by_blank_lines() {
        let joined = join_context(&["first \n".to_string(), " second".to_string()]);
        assert_eq!(joined, "first\n\nsecond");
    }
}
