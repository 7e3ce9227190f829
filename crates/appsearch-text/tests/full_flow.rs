use appsearch_core::document::InputDocument;
use appsearch_core::error::Error;
use appsearch_core::traits::FulltextEngine;
use appsearch_core::types::SearchType;
use appsearch_text::TantivyIndex;

fn doc(r: &str, name: &str, description: &str) -> InputDocument {
    InputDocument {
        application_ref: r.to_string(),
        chain_id: 1,
        round_id: "0xround".into(),
        round_application_id: r.rsplit(':').next().unwrap_or_default().to_string(),
        project_id: None,
        name: name.to_string(),
        website_url: format!("https://{}.example", name.to_lowercase().replace(' ', "-")),
        payout_wallet_address: "0xpayout".into(),
        banner_image_cid: None,
        logo_image_cid: None,
        description_markdown: description.to_string(),
        summary_text: description.to_string(),
    }
}

fn corpus() -> Vec<InputDocument> {
    vec![
        doc("1:0xround:2", "Forest Keepers", "We plant trees and protect forests in the Amazon."),
        doc("1:0xround:0", "Open Source Tooling", "Developer tools for open source maintainers."),
        doc("1:0xround:1", "Clean Water", "Wells and filters for villages. Trees nearby are irrelevant."),
        doc("1:0xround:3", "Zero Knowledge Library", "Cryptography primitives for the ecosystem."),
    ]
}

#[test]
fn search_ranks_name_matches_first() {
    let index = TantivyIndex::build(&corpus()).expect("build");
    assert_eq!(index.num_documents(), 4);

    let results = index.search("trees").expect("search");
    assert!(results.iter().all(|r| r.search_type == SearchType::Fulltext));
    let refs: Vec<_> = results.iter().map(|r| r.application_ref.as_str()).collect();
    assert_eq!(refs.len(), 2, "only documents mentioning trees match: {refs:?}");
    assert!(refs.contains(&"1:0xround:2") && refs.contains(&"1:0xround:1"));
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));

    // "Forest" is in the name of :2 only; the boost makes it win clearly.
    let results = index.search("forest").expect("search");
    assert_eq!(results[0].application_ref, "1:0xround:2");
}

#[test]
fn stemming_and_stop_words() {
    let index = TantivyIndex::build(&corpus()).expect("build");
    let planted = index.search("planting").expect("search");
    assert_eq!(planted.first().map(|r| r.application_ref.as_str()), Some("1:0xround:2"));
    assert!(index.search("the and of").expect("search").is_empty());
}

#[test]
fn malformed_syntax_is_tolerated() {
    let index = TantivyIndex::build(&corpus()).expect("build");
    let results = index.search("open AND (source").expect("lenient parse");
    assert_eq!(results.first().map(|r| r.application_ref.as_str()), Some("1:0xround:0"));
}

#[test]
fn empty_index_returns_nothing() {
    let index = TantivyIndex::build(&[]).expect("build empty");
    assert_eq!(index.num_documents(), 0);
    assert!(index.search("anything").expect("search").is_empty());

    let restored = TantivyIndex::deserialize(&index.serialize().expect("serialize")).expect("deserialize");
    assert_eq!(restored.num_documents(), 0);
}

#[test]
fn serialization_is_deterministic_and_lossless() {
    let mut reversed = corpus();
    reversed.reverse();
    let a = TantivyIndex::build(&corpus()).expect("build").serialize().expect("serialize");
    let b = TantivyIndex::build(&reversed).expect("build").serialize().expect("serialize");
    assert_eq!(a, b, "input order must not leak into the artifact");

    let original = TantivyIndex::build(&corpus()).expect("build");
    let restored = TantivyIndex::deserialize(&a).expect("deserialize");
    for q in ["trees", "open source", "cryptography ecosystem", "villages"] {
        assert_eq!(original.search(q).expect("search"), restored.search(q).expect("search"), "query {q:?}");
    }
}

#[test]
fn corrupt_bytes_are_rejected() {
    let bytes = TantivyIndex::build(&corpus()).expect("build").serialize().expect("serialize");

    let err = TantivyIndex::deserialize(b"not json").err().expect("garbage must fail");
    assert!(matches!(Error::from(err), Error::CorruptIndex(_)));

    let tampered = String::from_utf8(bytes).expect("utf8").replace("Forest Keepers", "Forest Sleepers");
    let err = TantivyIndex::deserialize(tampered.as_bytes()).err().expect("checksum must fail");
    assert!(matches!(Error::from(err), Error::CorruptIndex(_)));

    let err = TantivyIndex::deserialize(br#"{"format":"other/9","checksum":"","documents":[]}"#).err().expect("format must fail");
    assert!(matches!(Error::from(err), Error::CorruptIndex(_)));
}
