//! Retrieval-core integration tests against a small annual-report fixture.
//!
//! Everything here is offline: ranking, page search, prompt formatting and
//! citation parsing through the public API only.

use pdfchat::prompts::{build_system_prompt, format_grounding};
use pdfchat::{
    extract_citations, rank, search_document, Citation, Document, MatchStrategy, Paragraph,
    Ranker, RankerConfig,
};
use std::path::PathBuf;

// ── Test helpers ─────────────────────────────────────────────────────────────

fn fixture() -> Document {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/annual_report.txt");
    Document::load(&path).expect("fixture loads")
}

fn indexes(ps: &[Paragraph]) -> Vec<usize> {
    ps.iter().map(|p| p.index).collect()
}

/// Size bound, ascending order and uniqueness, for any ranking result.
fn assert_well_formed(result: &[Paragraph], max: usize, context: &str) {
    assert!(result.len() <= max, "[{context}] {} > {max}", result.len());
    for pair in result.windows(2) {
        assert!(
            pair[0].index < pair[1].index,
            "[{context}] not strictly ascending: {:?}",
            indexes(result)
        );
    }
}

// ── Document ─────────────────────────────────────────────────────────────────

#[test]
fn test_fixture_segmentation() {
    let doc = fixture();
    assert_eq!(doc.len(), 10);
    assert_eq!(doc.page_count(), 4);
    assert_eq!(doc.paragraphs()[0].text, "Northwind Traders Annual Report 2023");
    assert_eq!(doc.paragraphs()[9].page, 4);
}

#[test]
fn test_json_document_round_trip() {
    let doc = fixture();
    let json = serde_json::to_string(doc.paragraphs()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    std::fs::write(&path, json).unwrap();

    let reloaded = Document::load(&path).unwrap();
    assert_eq!(reloaded, doc);
}

// ── Ranking ──────────────────────────────────────────────────────────────────

#[test]
fn test_revenue_question_selects_page_two() {
    let doc = fixture();
    let picked = rank("How did revenue change?", doc.paragraphs(), 5);
    assert_eq!(indexes(&picked), vec![2, 3, 4]);
    assert!(picked.iter().all(|p| p.page == 2));
}

#[test]
fn test_two_matches_share_neighbours() {
    let doc = fixture();
    let picked = rank("currency risk", doc.paragraphs(), 5);
    assert_eq!(indexes(&picked), vec![4, 5, 6, 7]);
}

#[test]
fn test_accented_paragraph_found_without_accents() {
    let doc = fixture();
    let picked = rank("augmente chiffre", doc.paragraphs(), 5);
    assert_eq!(indexes(&picked), vec![8, 9]);
}

#[test]
fn test_unrelated_question_falls_back_to_start() {
    let doc = fixture();
    assert_eq!(indexes(&rank("zeppelin", doc.paragraphs(), 5)), vec![0, 1, 2]);
    assert_eq!(indexes(&rank("zeppelin", doc.paragraphs(), 1)), vec![0]);
}

#[test]
fn test_results_well_formed_for_many_queries() {
    let doc = fixture();
    let queries = [
        "",
        "?",
        "revenue",
        "2023",
        "year growth risk revenue costs",
        "the board",
        "résumé",
        "zzz",
    ];
    for max in 1..=6 {
        for q in queries {
            let result = rank(q, doc.paragraphs(), max);
            assert!(!result.is_empty(), "[{q:?} max={max}] empty result");
            assert_well_formed(&result, max, &format!("{q:?} max={max}"));
        }
    }
}

#[test]
fn test_rank_is_deterministic() {
    let doc = fixture();
    let ranker = Ranker::new(RankerConfig {
        strategy: MatchStrategy::Fuzzy,
        ..RankerConfig::default()
    });
    let a = ranker.rank("revenu growht", doc.paragraphs());
    let b = ranker.rank("revenu growht", doc.paragraphs());
    assert_eq!(a, b);
}

#[test]
fn test_fuzzy_recovers_from_typos() {
    let doc = fixture();
    let exact = Ranker::new(RankerConfig {
        context_window: 0,
        ..RankerConfig::default()
    });
    let fuzzy = Ranker::new(RankerConfig {
        context_window: 0,
        strategy: MatchStrategy::Fuzzy,
        ..RankerConfig::default()
    });

    // "currancy" is one substitution away from "currency".
    assert_eq!(indexes(&exact.rank("currancy", doc.paragraphs())), vec![0, 1, 2]);
    assert_eq!(indexes(&fuzzy.rank("currancy", doc.paragraphs())), vec![6]);
}

#[test]
fn test_empty_document() {
    assert!(rank("revenue", &[], 5).is_empty());
    assert!(rank("revenue", Document::default().paragraphs(), 5).is_empty());
}

// ── Search ───────────────────────────────────────────────────────────────────

#[test]
fn test_search_requires_all_terms() {
    let doc = fixture();
    let hits = search_document("revenue percent", &doc);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].page, 2);
    assert!(hits[0].excerpt.contains("Revenue increased"));
}

#[test]
fn test_search_multiple_pages() {
    let doc = fixture();
    let pages: Vec<u32> = search_document("2023", &doc).iter().map(|h| h.page).collect();
    assert_eq!(pages, vec![1, 4]);
}

// ── Prompt and citations ─────────────────────────────────────────────────────

#[test]
fn test_grounding_tags_pages() {
    let doc = fixture();
    let picked = rank("revenue", doc.paragraphs(), 5);
    let grounding = format_grounding(&picked);
    assert!(grounding.starts_with("[Page 2] : Financial highlights\n\n[Page 2] : Revenue"));

    let prompt = build_system_prompt(None, &picked);
    assert!(prompt.contains(&grounding));
}

#[test]
fn test_citations_from_typical_answer() {
    let answer = "Revenue grew by 12 percent.\n\n\
                  page 2: \"Revenue increased by 12 percent to 48 million euros\"\n\
                  Page 3: \"The board expects moderate growth in 2024.\"";
    let citations = extract_citations(answer);
    assert_eq!(
        citations,
        vec![
            Citation::new(2, "\"Revenue increased by 12 percent to 48 million euros\""),
            Citation::new(3, "\"The board expects moderate growth in 2024.\""),
        ]
    );
}

#[test]
fn test_answer_without_citations() {
    assert!(extract_citations("The document does not mention dividends.").is_empty());
}
