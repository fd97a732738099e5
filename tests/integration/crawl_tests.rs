//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, from the seed URL to shard files and
//! the run ledger.

use std::path::{Path, PathBuf};
use std::time::Duration;
use sumi_trawl::config::{
    Config, CrawlerConfig, OutputConfig, RankingConfig, RobotsFailurePolicy, UserAgentConfig,
};
use sumi_trawl::crawler::{run_crawl, Coordinator};
use sumi_trawl::output::{graph_from_shards, read_shard, read_shards};
use sumi_trawl::state::{CrawlPhase, StopReason};
use sumi_trawl::storage::{RunStatus, SqliteStorage, Storage};
use sumi_trawl::TrawlError;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling the mock server
fn create_test_config(server: &MockServer, dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            start_url: format!("{}/", server.uri()),
            restricted_domain: None,
            max_pages: 100,
            batch_size: 3000,
            request_delay: 0,
            request_timeout: 2000,
            content_max_chars: 2000,
            content_selector: "div.article-content".to_string(),
            robots_failure_policy: RobotsFailurePolicy::Open,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            output_dir: shard_dir(dir).to_string_lossy().into_owned(),
            ledger_path: None,
        },
        ranking: RankingConfig::default(),
    }
}

fn shard_dir(dir: &Path) -> PathBuf {
    dir.join("shards")
}

/// HTML page with a title and one anchor per link
fn html_page(title: &str, links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">{}</a>"#, link, link.trim_start_matches('/')))
        .collect();

    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body><p>About {}</p>{}</body></html>",
            title, title, anchors
        ),
        "text/html; charset=utf-8",
    )
}

async fn mount_page(server: &MockServer, page_path: &str, title: &str, links: &[&str]) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(html_page(title, links))
        .mount(server)
        .await;
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .expect(1)
        .mount(server)
        .await;
}

/// Number of page requests the server saw (robots.txt excluded)
async fn page_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|request| request.url.path() != "/robots.txt")
        .count()
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let server = MockServer::start().await;
    let base_url = server.uri();
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nDisallow:").await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                format!(
                    r##"<html><head><title>Home</title></head><body>
                    <div class="article-content">Welcome home</div>
                    <a href="/page1">Page 1</a>
                    <a href="{}/page2#top">Page 2</a>
                    <a href="/files/guide.pdf">Guide</a>
                    <a href="https://elsewhere.org/">Elsewhere</a>
                    <a href="#main">Skip</a>
                    </body></html>"##,
                    base_url
                ),
                "text/html",
            ),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/page1", "Page 1", &["/", "/page2"]).await;
    mount_page(&server, "/page2", "Page 2", &[]).await;

    Mock::given(method("GET"))
        .and(path("/files/guide.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path());
    let mut coordinator = Coordinator::new(config, "test-hash").expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.phase, CrawlPhase::Done);
    assert_eq!(report.stop_reason, Some(StopReason::FrontierExhausted));
    assert_eq!(report.pages_fetched, 3);
    assert_eq!(report.fetch_failures, 0);
    assert_eq!(report.shards.len(), 1);

    let records = read_shard(&shard_dir(dir.path()).join("data_1.json")).unwrap();
    let urls: Vec<&str> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/", base_url),
            format!("{}/page1", base_url),
            format!("{}/page2", base_url),
        ]
    );

    let home = &records[0];
    assert_eq!(home.title, "Home");
    assert_eq!(home.content, "Welcome home");
    assert!(home.outlinks.contains(&format!("{}/page1", base_url)));
    assert!(home.outlinks.contains(&format!("{}/page2", base_url)));
    assert!(!home.outlinks.contains(&format!("{}/", base_url)));
    assert_eq!(home.outlinks.len(), 2);
    assert!(home.attachments.contains(&format!("{}/files/guide.pdf", base_url)));
    assert!(home.anchor_texts.contains("Elsewhere"));
    assert!(home.raw_html.contains("<title>Home</title>"));

    let storage = SqliteStorage::new(&shard_dir(dir.path()).join("crawl.db")).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.pages_fetched, 3);
    assert_eq!(run.shards_written, 1);
}

#[tokio::test]
async fn test_respects_robots_disallow() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nDisallow: /private # staff only\n").await;
    mount_page(&server, "/", "Home", &["/private/x", "/public"]).await;
    mount_page(&server, "/public", "Public", &[]).await;

    Mock::given(method("GET"))
        .and(path("/private/x"))
        .respond_with(html_page("Secret", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config, "hash")
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.skipped_disallowed, 1);

    let records = read_shards(&shard_dir(dir.path())).unwrap();
    assert!(records.iter().all(|r| !r.url.contains("/private")));
}

#[tokio::test]
async fn test_seed_disallowed_aborts() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_robots(&server, "User-agent: *\nDisallow: /").await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Home", &[]))
        .expect(0)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path());
    let mut coordinator = Coordinator::new(config, "hash").unwrap();
    let result = coordinator.run().await;

    assert!(matches!(result, Err(TrawlError::SeedDisallowed { .. })));
    assert!(read_shards(&shard_dir(dir.path())).unwrap().is_empty());

    let storage = SqliteStorage::new(&shard_dir(dir.path()).join("crawl.db")).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_batches_flush_to_numbered_shards() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    let children = ["/p1", "/p2", "/p3", "/p4", "/p5", "/p6"];
    mount_page(&server, "/", "Home", &children).await;
    for child in children {
        mount_page(&server, child, child, &[]).await;
    }

    let mut config = create_test_config(&server, dir.path());
    config.crawler.batch_size = 3;

    let report = Coordinator::new(config, "hash")
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 7);
    let sizes: Vec<(u64, usize)> = report.shards.iter().map(|s| (s.index, s.records)).collect();
    assert_eq!(sizes, vec![(1, 3), (2, 3), (3, 1)]);

    for (index, expected) in [(1, 3), (2, 3), (3, 1)] {
        let shard = shard_dir(dir.path()).join(format!("data_{}.json", index));
        assert_eq!(read_shard(&shard).unwrap().len(), expected);
    }
    assert!(!shard_dir(dir.path()).join("data_4.json").exists());

    let storage = SqliteStorage::new(&shard_dir(dir.path()).join("crawl.db")).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(storage.get_shards(run.id).unwrap().len(), 3);
}

#[tokio::test]
async fn test_page_ceiling_enforced() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", "Home", &["/a", "/b", "/c", "/d", "/e"]).await;
    for child in ["/a", "/b", "/c", "/d", "/e"] {
        mount_page(&server, child, child, &["/", "/a", "/b", "/c"]).await;
    }

    let mut config = create_test_config(&server, dir.path());
    config.crawler.max_pages = 2;

    let report = Coordinator::new(config, "hash")
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.stop_reason, Some(StopReason::PageLimitReached));
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(page_requests(&server).await, 2);
    assert_eq!(read_shards(&shard_dir(dir.path())).unwrap().len(), 2);
}

#[tokio::test]
async fn test_fetch_failure_continues() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", "Home", &["/broken", "/missing", "/ok"]).await;
    mount_page(&server, "/ok", "Ok", &[]).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config, "hash")
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.fetch_failures, 2);

    let storage = SqliteStorage::new(&shard_dir(dir.path()).join("crawl.db")).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    let failures = storage.get_failures(run.id, 10).unwrap();
    let messages: Vec<_> = failures.iter().filter_map(|f| f.message.as_deref()).collect();
    assert!(messages.contains(&"HTTP 500"));
    assert!(messages.contains(&"HTTP 404"));
}

#[tokio::test]
async fn test_redirect_target_fetched_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", "Home", &["/moved", "/target"]).await;
    Mock::given(method("GET"))
        .and(path("/moved"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/target", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/target"))
        .respond_with(html_page("Target", &["/"]))
        .expect(1)
        .mount(&server)
        .await;

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config, "hash")
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.skipped_duplicates, 1);

    let records = read_shards(&shard_dir(dir.path())).unwrap();
    assert_eq!(records[1].url, format!("{}/moved", server.uri()));
    assert_eq!(records[1].title, "Target");
}

#[tokio::test]
async fn test_redirected_page_does_not_link_to_itself() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", "Home", &["/a"]).await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/a/", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    mount_page(&server, "/a/", "Section A", &["/a", "/"]).await;

    let config = create_test_config(&server, dir.path());
    let report = Coordinator::new(config, "hash")
        .unwrap()
        .run()
        .await
        .unwrap();
    assert_eq!(report.pages_fetched, 2);

    let records = read_shards(&shard_dir(dir.path())).unwrap();
    let section = records
        .iter()
        .find(|r| r.url == format!("{}/a", server.uri()))
        .expect("redirected page recorded under the requested URL");
    assert_eq!(section.title, "Section A");
    assert!(!section.outlinks.contains(&section.url));
    assert!(section.outlinks.contains(&format!("{}/", server.uri())));

    for record in &records {
        assert!(!record.outlinks.contains(&record.url), "{} links to itself", record.url);
    }

    let graph = graph_from_shards(&shard_dir(dir.path())).unwrap();
    let own = format!("{}/a", server.uri());
    assert!(!graph.contains_edge(&own, &own));
}

#[tokio::test]
async fn test_ledger_failure_still_flushes_fetched_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", "Home", &["/slow"]).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html_page("Slow", &[]).set_delay(Duration::from_millis(1500)))
        .mount(&server)
        .await;

    let mut config = create_test_config(&server, dir.path());
    config.crawler.batch_size = 10;
    config.crawler.request_timeout = 5000;
    let ledger = config.output.ledger_path();

    let mut coordinator = Coordinator::new(config, "hash").unwrap();
    let ledger_for_task = ledger.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let conn = rusqlite::Connection::open(&ledger_for_task).unwrap();
        conn.busy_timeout(Duration::from_secs(5)).unwrap();
        conn.execute_batch("DROP TABLE fetch_log;").unwrap();
    });

    let result = coordinator.run().await;
    assert!(matches!(result, Err(TrawlError::Database(_)) | Err(TrawlError::StorageError(_))));

    let records = read_shards(&shard_dir(dir.path())).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].url, format!("{}/", server.uri()));
    assert!(shard_dir(dir.path()).join("data_1.json").exists());

    let storage = SqliteStorage::new(&ledger).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
}

#[tokio::test]
async fn test_abort_flushes_in_progress_batch() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", "Home", &["/a", "/b"]).await;
    mount_page(&server, "/a", "A", &[]).await;
    mount_page(&server, "/b", "B", &[]).await;

    let mut config = create_test_config(&server, dir.path());
    config.crawler.batch_size = 10;
    config.crawler.request_delay = 60_000;

    let mut coordinator = Coordinator::new(config, "hash").unwrap();
    let abort = coordinator.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        abort.abort();
    });

    let report = tokio::time::timeout(Duration::from_secs(10), coordinator.run())
        .await
        .expect("abort did not interrupt the request delay")
        .unwrap();

    assert_eq!(report.stop_reason, Some(StopReason::Aborted));
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.shards.len(), 1);

    let records = read_shard(&shard_dir(dir.path()).join("data_1.json")).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].title, "Home");

    let storage = SqliteStorage::new(&shard_dir(dir.path()).join("crawl.db")).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Interrupted);
}

#[tokio::test]
async fn test_second_run_continues_shard_numbering() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", "Home", &[]).await;

    for _ in 0..2 {
        let config = create_test_config(&server, dir.path());
        Coordinator::new(config, "hash")
            .unwrap()
            .run()
            .await
            .unwrap();
    }

    let config = create_test_config(&server, dir.path());
    let report = run_crawl(config, "hash".to_string()).await.unwrap();
    assert_eq!(report.shards.len(), 1);
    assert_eq!(report.shards[0].index, 3);

    assert!(shard_dir(dir.path()).join("data_1.json").exists());
    assert!(shard_dir(dir.path()).join("data_2.json").exists());
    assert!(shard_dir(dir.path()).join("data_3.json").exists());

    let storage = SqliteStorage::new(&shard_dir(dir.path()).join("crawl.db")).unwrap();
    assert_eq!(storage.count_runs().unwrap(), 3);
}

#[tokio::test]
async fn test_link_graph_from_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    mount_page(&server, "/", "Home", &["/a", "/b"]).await;
    mount_page(&server, "/a", "A", &["/b", "/a"]).await;
    mount_page(&server, "/b", "B", &["/"]).await;

    let config = create_test_config(&server, dir.path());
    Coordinator::new(config, "hash")
        .unwrap()
        .run()
        .await
        .unwrap();

    let graph = graph_from_shards(&shard_dir(dir.path())).unwrap();
    let home = format!("{}/", server.uri());
    let a = format!("{}/a", server.uri());
    let b = format!("{}/b", server.uri());

    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.edge_count(), 4);
    assert!(graph.contains_edge(&a, &b));
    assert!(graph.contains_edge(&b, &home));
    assert!(!graph.contains_edge(&a, &a));

    let export = dir.path().join("graph.json");
    graph.export_edges(&export).unwrap();
    assert!(export.exists());
}
