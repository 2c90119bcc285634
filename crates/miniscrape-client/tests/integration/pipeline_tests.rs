use miniscrape_core::models::{CachePolicy, ResolverKind, RunSelector, RunStatus};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{WEEKLY_MENU, image_page, page, service, tuesday, windows_1250};

async fn menu_server(expected_calls: u64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/menu"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(windows_1250(WEEKLY_MENU)))
        .expect(expected_calls)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn content_page_end_to_end() -> anyhow::Result<()> {
    let server = menu_server(1).await;
    let cache_dir = tempfile::tempdir()?;

    let mut bistro = page("bistro", format!("{}/menu", server.uri()));
    bistro.filters.html.text_only = true;
    bistro.filters.day.enabled = true;

    let svc = service(vec![bistro], cache_dir.path(), &tuesday());
    let results = svc
        .scrape(&CancellationToken::new(), &RunSelector::new())
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status(), RunStatus::Ok);
    assert_eq!(results[0].kind(), "content");
    assert_eq!(results[0].content(), "Svíčková na smetaně");

    let cached = cache_dir
        .path()
        .join("2024-05-07")
        .join("food")
        .join("bistro")
        .join("content.txt");
    assert_eq!(std::fs::read_to_string(cached)?, "Svíčková na smetaně");
    Ok(())
}

#[tokio::test]
async fn markdown_page_with_line_filters() {
    let server = menu_server(1).await;
    let cache_dir = tempfile::tempdir().unwrap();

    let mut bistro = page("bistro", format!("{}/menu", server.uri()));
    bistro.filters.day.enabled = true;
    bistro.filters.cut_line.starts_with = "#".into();

    let svc = service(vec![bistro], cache_dir.path(), &tuesday());
    let results = svc
        .scrape(&CancellationToken::new(), &RunSelector::new())
        .await;

    assert_eq!(results[0].status(), RunStatus::Ok);
    assert!(results[0].content().contains("Svíčková na smetaně"));
    assert!(!results[0].content().contains("Guláš"));
    assert!(!results[0].content().contains("Rizoto"));
}

#[tokio::test]
async fn second_run_is_served_from_cache() {
    // The mock verifies on drop that the page was fetched exactly once.
    let server = menu_server(1).await;
    let cache_dir = tempfile::tempdir().unwrap();
    let svc = service(
        vec![page("bistro", format!("{}/menu", server.uri()))],
        cache_dir.path(),
        &tuesday(),
    );
    let cancel = CancellationToken::new();

    let first = svc.scrape(&cancel, &RunSelector::new()).await;
    let second = svc.scrape(&cancel, &RunSelector::new()).await;

    assert_eq!(first[0].status(), RunStatus::Ok);
    assert_eq!(second[0].status(), RunStatus::Ok);
    assert_eq!(first[0].content(), second[0].content());
    assert_eq!(second[0].kind(), "content");
}

#[tokio::test]
async fn next_day_refetches() {
    let server = menu_server(2).await;
    let cache_dir = tempfile::tempdir().unwrap();
    let clock = tuesday();
    let svc = service(
        vec![page("bistro", format!("{}/menu", server.uri()))],
        cache_dir.path(),
        &clock,
    );
    let cancel = CancellationToken::new();

    svc.scrape(&cancel, &RunSelector::new()).await;
    clock.advance_days(1);
    svc.scrape(&cancel, &RunSelector::new()).await;

    assert!(cache_dir.path().join("2024-05-08").exists());
}

#[tokio::test]
async fn no_cache_pages_are_fetched_every_time() {
    let server = menu_server(2).await;
    let cache_dir = tempfile::tempdir().unwrap();
    let mut bistro = page("bistro", format!("{}/menu", server.uri()));
    bistro.cache_policy = CachePolicy::NoCache;
    let svc = service(vec![bistro], cache_dir.path(), &tuesday());
    let cancel = CancellationToken::new();

    svc.scrape(&cancel, &RunSelector::new()).await;
    svc.scrape(&cancel, &RunSelector::new()).await;

    assert!(!cache_dir.path().join("2024-05-07").exists());
}

#[tokio::test]
async fn image_page_via_xpath() {
    let server = menu_server(1).await;
    let cache_dir = tempfile::tempdir().unwrap();
    let svc = service(
        vec![image_page("photo", format!("{}/menu", server.uri()))],
        cache_dir.path(),
        &tuesday(),
    );

    let results = svc
        .scrape(&CancellationToken::new(), &RunSelector::new())
        .await;

    assert_eq!(results[0].status(), RunStatus::Ok);
    assert_eq!(results[0].kind(), "img");
    assert_eq!(results[0].content(), "https://cdn.example/tuesday.jpg");
}

#[tokio::test]
async fn link_pages_never_touch_the_network() {
    let server = menu_server(0).await;
    let cache_dir = tempfile::tempdir().unwrap();
    let mut pdf = page("weekly-pdf", format!("{}/menu.pdf", server.uri()));
    pdf.resolver = ResolverKind::Pdf;
    let mut iframe = page("embed", format!("{}/menu", server.uri()));
    iframe.resolver = ResolverKind::Iframe;

    let svc = service(vec![pdf, iframe], cache_dir.path(), &tuesday());
    let results = svc
        .scrape(&CancellationToken::new(), &RunSelector::new())
        .await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.is_ok()));
    let pdf = results
        .iter()
        .find(|r| r.page().codename == "weekly-pdf")
        .unwrap();
    assert_eq!(pdf.kind(), "pdf");
    assert!(pdf.content().ends_with("/menu.pdf"));
}

#[tokio::test]
async fn server_errors_become_error_results_and_are_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;
    let cache_dir = tempfile::tempdir().unwrap();
    let svc = service(
        vec![page("bistro", format!("{}/menu", server.uri()))],
        cache_dir.path(),
        &tuesday(),
    );
    let cancel = CancellationToken::new();

    for _ in 0..2 {
        let results = svc.scrape(&cancel, &RunSelector::new()).await;
        assert_eq!(results[0].status(), RunStatus::Error);
        assert_eq!(results[0].kind(), "error");
        assert!(results[0].content().starts_with("Error: HTTP error: HTTP 500"));
    }
}

#[tokio::test]
async fn batch_returns_one_result_per_page() {
    // The broken page is fetched before its selector fails to parse.
    let server = menu_server(6).await;
    let cache_dir = tempfile::tempdir().unwrap();
    let mut pages: Vec<_> = (0..5)
        .map(|i| page(&format!("bistro{i}"), format!("{}/menu", server.uri())))
        .collect();
    let mut broken = page("broken", format!("{}/menu", server.uri()));
    broken.query = "div[[".into();
    pages.push(broken);

    let svc = service(pages, cache_dir.path(), &tuesday());
    let results = svc
        .scrape(&CancellationToken::new(), &RunSelector::new())
        .await;

    assert_eq!(results.len(), 6);
    let broken = results
        .iter()
        .find(|r| r.page().codename == "broken")
        .unwrap();
    assert_eq!(broken.status(), RunStatus::Error);
    assert!(broken.content().contains("Parse error"));
}

#[tokio::test]
async fn invalidate_forces_a_refetch() {
    let server = menu_server(2).await;
    let cache_dir = tempfile::tempdir().unwrap();
    let svc = service(
        vec![page("bistro", format!("{}/menu", server.uri()))],
        cache_dir.path(),
        &tuesday(),
    );
    let cancel = CancellationToken::new();

    svc.scrape(&cancel, &RunSelector::new()).await;
    svc.invalidate_cache(&RunSelector::new().with_category("food"))
        .await;
    svc.scrape(&cancel, &RunSelector::new()).await;
}
