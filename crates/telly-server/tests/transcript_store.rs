mod common;

use chrono::Duration;

use telly::{DomainError, SearchMode};
use telly_server::application::SaveTranscript;

use common::{harness, t0};

fn transcript(url: &str, title: &str, text: &str) -> SaveTranscript {
    SaveTranscript {
        url: url.to_string(),
        title: title.to_string(),
        transcript: text.to_string(),
        action_plan: format!("Try: {}", title),
        summary: None,
    }
}

#[tokio::test]
async fn test_resave_same_url_overwrites_in_place() {
    let h = harness().await;
    let url = "https://youtu.be/abc";
    let first = h
        .state
        .transcripts
        .save(transcript(url, "Sourdough basics", "mix flour and water"))
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(10));
    let second = h
        .state
        .transcripts
        .save(transcript(url, "Sourdough, revised", "feed the starter daily"))
        .await
        .unwrap();
    assert_eq!(first, second);

    let record = h.state.transcripts.get(first).await.unwrap().unwrap();
    assert_eq!(record.title, "Sourdough, revised");
    assert_eq!(record.transcript_text, "feed the starter daily");
    assert_eq!(record.created_at, t0());
    assert_eq!(record.updated_at, t0() + Duration::minutes(10));

    let by_url = h.state.transcripts.get_by_url(url).await.unwrap().unwrap();
    assert_eq!(by_url.id, first);
    assert_eq!(h.state.transcripts.recent(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_summary_defaults_to_transcript_prefix() {
    let h = harness().await;
    let long = "word ".repeat(200);
    let id = h
        .state
        .transcripts
        .save(transcript("https://youtu.be/long", "Long talk", &long))
        .await
        .unwrap();
    let record = h.state.transcripts.get(id).await.unwrap().unwrap();
    assert!(record.summary.ends_with("..."));
    assert!(record.summary.chars().count() < long.chars().count());
}

#[tokio::test]
async fn test_save_requires_url_and_text() {
    let h = harness().await;
    let err = h
        .state
        .transcripts
        .save(transcript("  ", "t", "text"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));

    let err = h
        .state
        .transcripts
        .save(transcript("https://youtu.be/x", "t", ""))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation(_)));
}

#[tokio::test]
async fn test_semantic_search_then_keyword_fallback() {
    let h = harness().await;
    h.state
        .transcripts
        .save(transcript(
            "https://youtu.be/1",
            "Rust async deep dive",
            "futures pinning and the tokio executor",
        ))
        .await
        .unwrap();
    h.state
        .transcripts
        .save(transcript(
            "https://youtu.be/2",
            "Knife skills",
            "dicing onions quickly and safely",
        ))
        .await
        .unwrap();

    let semantic = h.state.transcripts.search("tokio executor", 5).await.unwrap();
    assert_eq!(semantic.mode, SearchMode::Semantic);
    assert_eq!(semantic.hits[0].record.title, "Rust async deep dive");

    h.embedder.set_available(false);
    let keyword = h.state.transcripts.search("onions", 5).await.unwrap();
    assert_eq!(keyword.mode, SearchMode::Keyword);
    assert!(keyword.degraded_reason.is_some());
    assert_eq!(keyword.hits.len(), 1);
    assert_eq!(keyword.hits[0].record.title, "Knife skills");
}

#[tokio::test]
async fn test_related_excludes_self() {
    let h = harness().await;
    let mut ids = Vec::new();
    for (i, title) in ["Rust ownership", "Rust borrowing", "Bread baking"]
        .iter()
        .enumerate()
    {
        let id = h
            .state
            .transcripts
            .save(transcript(
                &format!("https://youtu.be/{}", i),
                title,
                &format!("{} explained", title),
            ))
            .await
            .unwrap();
        ids.push(id);
    }

    let related = h.state.transcripts.related(ids[0], 5).await.unwrap();
    assert_eq!(related.len(), 2);
    assert!(related.iter().all(|hit| hit.record.id != ids[0]));
    assert_eq!(related[0].record.id, ids[1]);

    let err = h
        .state
        .transcripts
        .related(uuid::Uuid::new_v4(), 5)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_save_without_embedding_backend_keeps_record() {
    let h = harness().await;
    let url = "https://youtu.be/offline";
    let id = h
        .state
        .transcripts
        .save(transcript(url, "Offline notes", "written while the provider was down"))
        .await
        .unwrap();
    let before = h.state.transcripts.stats().await.unwrap();
    assert_eq!(before.vectors, 1);

    h.embedder.set_available(false);
    let again = h
        .state
        .transcripts
        .save(transcript(url, "Offline notes v2", "edited while the provider was down"))
        .await
        .unwrap();
    assert_eq!(again, id);

    let record = h.state.transcripts.get(id).await.unwrap().unwrap();
    assert_eq!(record.title, "Offline notes v2");
    assert!(record.embedding.is_empty());

    let stats = h.state.transcripts.stats().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.embedded, 0);
    assert_eq!(stats.vectors, 0);

    h.embedder.set_available(true);
    let err = h.state.transcripts.related(id, 3).await.unwrap_err();
    assert!(matches!(err, DomainError::DegradedSearch(_)));
}
