use crate::SearchHit;

pub const FALLBACK_ANSWER: &str = "The answer is not available in the context.";

const CONTEXT_SEPARATOR: &str = "\n\n";

pub fn assemble_prompt(question: &str, hits: &[SearchHit]) -> String {
    let context = hits
        .iter()
        .map(|hit| hit.metadata.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR);

    format!(
        "Answer the question as detailed as possible from the provided context. \
Read and use the relevant content from every passage, not only one source.\n\
Answer only from the context below. If the answer is not in the provided context, \
just say, \"{FALLBACK_ANSWER}\"\n\n\
Context:\n{context}\n\n\
Question:\n{question}\n\n\
Answer:\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntryMetadata;

    fn hit(id: u64, text: &str) -> SearchHit {
        SearchHit {
            id,
            score: 0.5,
            metadata: EntryMetadata {
                source_id: Some(format!("{id}.txt")),
                text: text.to_string(),
            },
        }
    }

    #[test]
    fn prompt_carries_fallback_contract() {
        let prompt = assemble_prompt("What color is the sky?", &[]);
        assert!(prompt.contains("\"The answer is not available in the context.\""));
        assert!(prompt.contains("Question:\nWhat color is the sky?"));
    }

    #[test]
    fn context_keeps_rank_order() {
        let prompt = assemble_prompt(
            "Who drove the chariot?",
            &[hit(3, "Krishna drove the chariot."), hit(1, "Arjuna held the bow.")],
        );
        let first = prompt.find("Krishna drove");
        let second = prompt.find("Arjuna held");
        assert!(first.is_some() && second.is_some());
        assert!(first < second);
        assert!(prompt.contains("Krishna drove the chariot.\n\nArjuna held the bow."));
    }
}
