use lexdb_core::config::KeywordMatch;
use lexdb_core::traits::Scorer;
use lexdb_core::types::{Chunk, IndexEntry};
use lexdb_text::KeywordScorer;

fn entry(id: usize, text: &str) -> IndexEntry {
    IndexEntry {
        chunk_id: id,
        chunk: Chunk {
            title: format!("doc{id}"),
            source_file: None,
            seq: 0,
            start: 0,
            text: text.into(),
        },
        content_hash: String::new(),
        vector: None,
    }
}

#[test]
fn cheating_query_scores_penal_code_above_contract_act() {
    let ipc =
        entry(0, "Whoever cheats and dishonestly induces delivery of property shall be punished");
    let ica = entry(1, "All agreements are contracts if made by free consent of parties");
    let scorer = KeywordScorer::new("what is cheating punishment", KeywordMatch::Substring);

    let a = scorer.score(&ipc).unwrap();
    let b = scorer.score(&ica).unwrap();
    assert!(scorer.is_relevant(a), "\"is\" occurs inside \"dishonestly\"");
    assert!(!scorer.is_relevant(b));
}

#[test]
fn word_mode_drops_partial_word_hits() {
    let ica = entry(0, "The Indian Contract Act defines a contract");
    let substring = KeywordScorer::new("act", KeywordMatch::Substring).score(&ica).unwrap();
    let word = KeywordScorer::new("act", KeywordMatch::Word).score(&ica).unwrap();
    assert_eq!(substring, 3.0);
    assert_eq!(word, 1.0);
}
