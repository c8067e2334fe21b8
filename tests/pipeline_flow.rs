// tests/pipeline_flow.rs
//
// End-to-end pipeline runs against in-memory collaborators.

mod common;

use std::sync::Arc;

use wiremock::matchers::{method, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{
    harness, harness_with_model, pipeline, FakeFetcher, FakePublisher, RecordingNotifier,
    RejectingStore, Sent, APP_URL,
};
use link_saver::config::ReaderConfig;
use link_saver::llm::provider::MockProvider;
use link_saver::pipeline::Stage;
use link_saver::reader::JinaReader;
use link_saver::store::Store;

const URL: &str = "https://blog.test/post";

#[tokio::test]
async fn happy_path_stores_publishes_and_edits_status() {
    let h = harness(
        FakeFetcher::article("# Fake Article\n\nSome **content**."),
        FakePublisher::default(),
        RecordingNotifier::default(),
    );

    let report = h.pipeline.run(7, URL).await;
    assert_eq!(report.state, Stage::Notified);
    assert_eq!(
        report.archive_url.as_deref(),
        Some("https://telegra.ph/Fake-Article-02-04")
    );

    let entries = h.store.list(None).await.unwrap();
    assert_eq!(entries.len(), 1);
    let e = &entries[0];
    assert_eq!(Some(&e.id), report.entry_id.as_ref());
    assert_eq!(e.title, "Fake Article");
    assert_eq!(e.url, URL);
    assert_eq!(e.summary, "Mock summary.");
    assert_eq!(e.insight, "Mock insight.");
    assert_eq!(e.tags, vec!["mock", "testing"]);
    assert_eq!(e.archive_url, report.archive_url);

    let published = h.publisher.published.lock().unwrap().clone();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].source_url, URL);
    assert_eq!(published[0].title, "Fake Article");

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(
        sent[0],
        Sent::Send {
            chat_id: 7,
            text: format!("⏳ 正在处理: {URL}")
        }
    );
    match &sent[1] {
        Sent::Edit {
            chat_id,
            message_id,
            text,
        } => {
            assert_eq!((*chat_id, *message_id), (7, 101));
            assert!(text.starts_with("✅ <b>已保存!</b>"));
            assert!(text.contains("<a href=\"https://telegra.ph/Fake-Article-02-04\">🔗 原文</a>"));
            assert!(text.contains(&format!("<a href=\"{APP_URL}\">🌌 知识库</a>")));
            assert!(text.contains("#mock #testing"));
        }
        other => panic!("expected an edit, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_content_fails_once_without_store_write() {
    let h = harness(
        FakeFetcher::article("   \n"),
        FakePublisher::default(),
        RecordingNotifier::default(),
    );

    let report = h.pipeline.run(7, URL).await;
    assert_eq!(report.state, Stage::Failed);
    assert!(report.entry_id.is_none());
    assert!(h.store.snapshot().is_empty());
    assert!(h.publisher.published.lock().unwrap().is_empty());

    let failures: Vec<_> = h
        .notifier
        .sent()
        .into_iter()
        .filter(|s| s.text().starts_with("❌ Error: "))
        .collect();
    assert_eq!(failures.len(), 1);
}

fn failure_texts(notifier: &RecordingNotifier) -> Vec<String> {
    notifier
        .sent()
        .into_iter()
        .map(|s| s.text().to_string())
        .filter(|t| t.starts_with("❌ Error: "))
        .collect()
}

#[tokio::test]
async fn empty_reader_envelope_aborts_before_the_model() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/https:/+blog\.test/post$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"code":200,"data":{"title":"T","content":""}}"#),
        )
        .mount(&server)
        .await;
    let reader = JinaReader::new(&ReaderConfig {
        base_url: server.uri(),
        api_key: None,
        timeout_secs: 5,
    })
    .unwrap();

    let store = Arc::new(link_saver::store::MemoryStore::default());
    let publisher = Arc::new(FakePublisher::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let p = pipeline(
        Arc::new(reader),
        MockProvider::default(),
        store.clone(),
        publisher.clone(),
        notifier.clone(),
    );

    let report = p.run(7, URL).await;
    assert_eq!(report.state, Stage::Failed);
    assert!(store.snapshot().is_empty());
    assert!(publisher.published.lock().unwrap().is_empty());

    let failures = failure_texts(&notifier);
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("No content could be extracted"), "{failures:?}");
}

#[tokio::test]
async fn prose_from_the_model_aborts_the_save() {
    let h = harness_with_model(
        FakeFetcher::article("Body."),
        MockProvider {
            json: "Sure! Here is a summary of the article.".into(),
            text: "Mock insight.".into(),
        },
        FakePublisher::default(),
        RecordingNotifier::default(),
    );

    let report = h.pipeline.run(7, URL).await;
    assert_eq!(report.state, Stage::Failed);
    assert!(report.entry_id.is_none());
    assert!(h.store.snapshot().is_empty());
    assert!(h.publisher.published.lock().unwrap().is_empty());

    let failures = failure_texts(&h.notifier);
    assert_eq!(failures.len(), 1);
    assert!(
        failures[0].starts_with("❌ Error: Malformed model response"),
        "{failures:?}"
    );
}

#[tokio::test]
async fn store_rejection_aborts_before_publishing() {
    let store = Arc::new(RejectingStore::default());
    let publisher = Arc::new(FakePublisher::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let p = pipeline(
        Arc::new(FakeFetcher::article("Body.")),
        MockProvider::default(),
        store.clone(),
        publisher.clone(),
        notifier.clone(),
    );

    let report = p.run(7, URL).await;
    assert_eq!(report.state, Stage::Failed);
    assert!(report.entry_id.is_none());
    assert!(report.archive_url.is_none());
    assert!(publisher.published.lock().unwrap().is_empty());

    let failures = failure_texts(&notifier);
    assert_eq!(
        failures,
        vec!["❌ Error: Store error: notion pages: 400 validation_error".to_string()]
    );
}

#[tokio::test]
async fn fetch_error_text_reaches_the_chat() {
    let h = harness(
        FakeFetcher::failing("reader non-2xx: 404 Not Found"),
        FakePublisher::default(),
        RecordingNotifier::default(),
    );

    let report = h.pipeline.run(9, URL).await;
    assert_eq!(report.state, Stage::Failed);
    assert_eq!(report.error.as_deref(), Some("reader non-2xx: 404 Not Found"));
    assert!(h.store.snapshot().is_empty());

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].text(), "❌ Error: reader non-2xx: 404 Not Found");
}

#[tokio::test]
async fn publish_failure_is_soft_and_links_the_source() {
    let h = harness(
        FakeFetcher::article("Just a paragraph."),
        FakePublisher::failing(),
        RecordingNotifier::default(),
    );

    let report = h.pipeline.run(7, URL).await;
    assert_eq!(report.state, Stage::Notified);
    assert!(report.archive_url.is_none());

    let entries = h.store.list(None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].archive_url.is_none());

    let last = h.notifier.sent().pop().unwrap();
    assert!(last.text().starts_with("✅"));
    assert!(last
        .text()
        .contains(&format!("<a href=\"{URL}\">🔗 原文</a>")));
}

#[tokio::test]
async fn failed_edit_falls_back_to_new_message() {
    let h = harness(
        FakeFetcher::article("Body."),
        FakePublisher::default(),
        RecordingNotifier {
            fail_edits: true,
            ..RecordingNotifier::default()
        },
    );

    let report = h.pipeline.run(7, URL).await;
    assert_eq!(report.state, Stage::Notified);

    let sent = h.notifier.sent();
    assert_eq!(sent.len(), 2);
    assert!(matches!(&sent[1], Sent::Send { text, .. } if text.starts_with("✅")));
}

#[tokio::test]
async fn later_saves_see_earlier_ones_as_related() {
    let h = harness(
        FakeFetcher::article("Body."),
        FakePublisher::default(),
        RecordingNotifier::default(),
    );
    h.pipeline.run(7, "https://a.test/1").await;
    h.pipeline.run(7, "https://a.test/2").await;

    let related = h
        .store
        .related(&["mock".to_string()], 5)
        .await
        .unwrap();
    let urls: Vec<_> = related.iter().map(|e| e.url.as_str()).collect();
    assert_eq!(urls, vec!["https://a.test/2", "https://a.test/1"]);
}
