//! Text preparation for feedback retrieval, driven by the
//! `embedding_preprocessor` resource.
//!
//! Index texts and search queries are built from the same parts so that a
//! query embeds close to the feedback it should find:
//!
//! | flag                          | index text | search query |
//! |-------------------------------|------------|--------------|
//! | `include_essay_text`          | yes        | yes          |
//! | `include_teacher_instruction` |            | yes          |
//! | `include_essay_context`       | prepended  | prepended    |
//! | `include_teacher_feedback`    | appended   |              |

use tracing::warn;

use crate::config::EmbeddingPreprocessorConfig;

fn essay_context_block(essay_context: &[&str]) -> String {
    let mut block = String::from("ESSAY CONTEXT:\n");
    for content in essay_context {
        block.push_str(content);
        block.push_str("\n\n");
    }
    block
}

/// Texts to embed for one feedback item, one per highlighted chunk.
///
/// With essay text excluded there is a single text for the whole item.
/// Returns `None` when essay context is required but none was supplied.
pub fn build_index_text(
    config: &EmbeddingPreprocessorConfig,
    highlighted_chunks: &[&str],
    feedback_text: &str,
    essay_context: &[&str],
) -> Option<Vec<String>> {
    let mut texts: Vec<String> = if config.include_essay_text {
        highlighted_chunks
            .iter()
            .map(|chunk| format!("STUDENT ESSAY TEXT:\n{chunk}\n\n"))
            .collect()
    } else {
        vec![String::new()]
    };

    if config.include_essay_context {
        if essay_context.is_empty() {
            warn!("[retrieval] no essay context for feedback; skipping index text");
            return None;
        }
        let context = essay_context_block(essay_context);
        texts = texts.into_iter().map(|t| format!("{context}{t}")).collect();
    }

    if config.include_teacher_feedback {
        for text in &mut texts {
            text.push_str("TEACHER FEEDBACK:\n");
            text.push_str(feedback_text);
        }
    }

    Some(texts)
}

/// Text to embed for one feedback request.
///
/// Returns `None` when essay context is required but none was supplied.
pub fn build_search_query(
    config: &EmbeddingPreprocessorConfig,
    text_selection: &str,
    instruction: &str,
    essay_context: &[&str],
) -> Option<String> {
    let mut query = String::new();
    if config.include_essay_text {
        query.push_str("STUDENT ESSAY TEXT:\n");
        query.push_str(text_selection);
        query.push_str("\n\n");
    }
    if config.include_teacher_instruction {
        query.push_str("TEACHER INSTRUCTION TO CREATE FEEDBACK:\n");
        query.push_str(instruction);
        query.push_str("\n\n");
    }
    if config.include_essay_context {
        if essay_context.is_empty() {
            warn!("[retrieval] no essay context for request; skipping search query");
            return None;
        }
        query.insert_str(0, &essay_context_block(essay_context));
    }
    Some(query)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_flags() -> EmbeddingPreprocessorConfig {
        EmbeddingPreprocessorConfig {
            include_essay_text: true,
            include_essay_context: true,
            include_teacher_feedback: true,
            include_teacher_instruction: true,
        }
    }

    #[test]
    fn default_index_text_is_one_per_chunk() {
        let texts = build_index_text(
            &EmbeddingPreprocessorConfig::default(),
            &["first", "second"],
            "Nice.",
            &[],
        )
        .unwrap();
        assert_eq!(
            texts,
            vec![
                "STUDENT ESSAY TEXT:\nfirst\n\n".to_string(),
                "STUDENT ESSAY TEXT:\nsecond\n\n".to_string(),
            ]
        );
    }

    #[test]
    fn full_index_text_wraps_context_and_feedback() {
        let texts = build_index_text(&all_flags(), &["chunk"], "Nice.", &["Prompt A", "Rubric"]).unwrap();
        assert_eq!(
            texts,
            vec!["ESSAY CONTEXT:\nPrompt A\n\nRubric\n\nSTUDENT ESSAY TEXT:\nchunk\n\nTEACHER FEEDBACK:\nNice.".to_string()]
        );
    }

    #[test]
    fn index_text_without_essay_text_is_single() {
        let config = EmbeddingPreprocessorConfig {
            include_essay_text: false,
            include_teacher_feedback: true,
            ..EmbeddingPreprocessorConfig::default()
        };
        let texts = build_index_text(&config, &["a", "b"], "Nice.", &[]).unwrap();
        assert_eq!(texts, vec!["TEACHER FEEDBACK:\nNice.".to_string()]);
    }

    #[test]
    fn search_query_orders_context_first() {
        let query = build_search_query(&all_flags(), "Homework is bad.", "Be kind.", &["Prompt A"]).unwrap();
        assert_eq!(
            query,
            "ESSAY CONTEXT:\nPrompt A\n\nSTUDENT ESSAY TEXT:\nHomework is bad.\n\nTEACHER INSTRUCTION TO CREATE FEEDBACK:\nBe kind.\n\n"
        );
    }

    #[test]
    fn missing_essay_context_skips() {
        assert!(build_search_query(&all_flags(), "t", "i", &[]).is_none());
        assert!(build_index_text(&all_flags(), &["t"], "f", &[]).is_none());
    }
}
