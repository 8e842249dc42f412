//! Integration tests for the harvester
//!
//! These tests use wiremock to stand in for the listing site and its
//! metadata and vote endpoints, and run full harvests end-to-end.

use reel_harvest::config::{
    Config, CrawlDefaults, CrawlerConfig, OutputConfig, SiteConfig, UserAgentConfig,
};
use reel_harvest::crawler::{
    build_http_client, Coordinator, CrawlRequest, LinkCollectionPool, PaginationPlanner,
    ResumeMode, SelectorExtractor,
};
use reel_harvest::queue::QueueSnapshotStore;
use reel_harvest::storage::{RunStatus, RunStore};
use reel_harvest::PageUrlCodec;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const ITEMS_PER_PAGE: u32 = 20;
const LAST_PAGE: u32 = 5;

/// Creates a test configuration pointing at the mock server
fn create_test_config(server: &MockServer, dir: &TempDir) -> Config {
    Config {
        crawler: CrawlerConfig {
            worker_count: 4,
            items_per_page: ITEMS_PER_PAGE,
            request_timeout: 10,
            debug: false,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        site: SiteConfig {
            detail_encoding: "utf-8".to_string(),
            metadata_url: format!("{}/videolist", server.uri()),
            vote_url: format!("{}/digg/get.do", server.uri()),
            ..SiteConfig::default()
        },
        crawl: CrawlDefaults {
            start_url: Some(listing_url(server, 1)),
            limit: 0,
        },
        output: OutputConfig {
            database_path: dir.path().join("harvest.db").display().to_string(),
            snapshot_path: dir.path().join("queue.snapshot.json").display().to_string(),
        },
    }
}

fn listing_url(server: &MockServer, page: u32) -> String {
    format!("{}/list_p10{}_p20.html", server.uri(), page)
}

fn item_url(server: &MockServer, id: u32) -> String {
    format!("{}/item/{}.shtml", server.uri(), id)
}

fn items_on_page(page: u32) -> impl Iterator<Item = u32> {
    (page - 1) * ITEMS_PER_PAGE + 1..=page * ITEMS_PER_PAGE
}

fn query_value(request: &Request, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// Mounts a five-page listing with twenty items per page
async fn mount_listing(server: &MockServer) {
    let widget: String = (1..=LAST_PAGE)
        .map(|p| format!(r#"<a href="/list_p10{}_p20.html">{}</a>"#, p, p))
        .collect();

    for page in 1..=LAST_PAGE {
        let cards: String = items_on_page(page)
            .map(|id| {
                format!(
                    r#"<li><div class="info"><a href="/item/{}.shtml">Item {}</a></div></li>"#,
                    id, id
                )
            })
            .collect();
        let next = if page < LAST_PAGE {
            format!(r#"<a class="next" href="/list_p10{}_p20.html">next</a>"#, page + 1)
        } else {
            String::new()
        };

        Mock::given(method("GET"))
            .and(path(format!("/list_p10{}_p20.html", page)))
            .respond_with(ResponseTemplate::new(200).set_body_string(format!(
                r#"<html><body><ul>{}</ul><div class="num">{}</div>{}</body></html>"#,
                cards, widget, next
            )))
            .mount(server)
            .await;
    }
}

/// Mounts detail pages, metadata and votes for every item
///
/// Items listed in `without_vid` get a detail page without a video id.
async fn mount_items(server: &MockServer, without_vid: &[u32], detail_delay: Duration) {
    let without_vid: HashSet<u32> = without_vid.iter().copied().collect();

    Mock::given(method("GET"))
        .and(path_regex(r"^/item/\d+\.shtml$"))
        .respond_with(move |request: &Request| {
            let id = request
                .url
                .path()
                .trim_start_matches("/item/")
                .trim_end_matches(".shtml")
                .parse::<u32>()
                .unwrap();
            let script = if without_vid.contains(&id) {
                r#"var playlistId="900";"#.to_string()
            } else {
                format!(r#"var vid="{}"; var playlistId="900";"#, id)
            };
            ResponseTemplate::new(200)
                .set_body_string(format!("<html><script>{}</script></html>", script))
                .set_delay(detail_delay)
        })
        .mount(server)
        .await;

    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/videolist"))
        .respond_with(move |request: &Request| {
            let vid = query_value(request, "vid").unwrap_or_default();
            ResponseTemplate::new(200).set_body_string(format!(
                r#"{{"albumName":"Harbor Nights","albumDesc":"A long drama.","pid":12,
                    "tvEnglishName":"Harbor Nights","publishYear":2013,"area":"Mainland",
                    "actors":["Li Wei","Chen Yu"],"directors":["Zhang Min"],"categories":["Drama"],
                    "videos":[
                      {{"name":"Episode {vid}","pageUrl":"{base}/item/{vid}.shtml",
                        "playLength":2700,"largePicUrl":"http://img.example/{vid}.jpg",
                        "publishTime":"2013-12-01"}},
                      {{"name":"Trailer","pageUrl":"{base}/trailer.shtml"}}
                    ]}}"#,
                vid = vid,
                base = base
            ))
        })
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/digg/get.do"))
        .respond_with(|request: &Request| {
            let vid: u64 = query_value(request, "vid")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0);
            ResponseTemplate::new(200).set_body_string(format!(
                "({{\"downCount\":3,\"upCount\":{}}})\n",
                vid + 10
            ))
        })
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_plan_and_collect_limit_25() {
    let server = MockServer::start().await;
    mount_listing(&server).await;

    let client = build_http_client(
        &UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        Duration::from_secs(5),
    )
    .unwrap();
    let extractor = Arc::new(SelectorExtractor::new(&SiteConfig::default()).unwrap());

    let planner = PaginationPlanner::new(
        client.clone(),
        extractor.clone(),
        PageUrlCodec::default(),
        ITEMS_PER_PAGE,
    );
    let plan = planner.plan(&listing_url(&server, 1), 25).await;
    assert_eq!(
        plan.pages(),
        &[listing_url(&server, 1), listing_url(&server, 2)]
    );

    let collector = LinkCollectionPool::new(client, extractor, 4);
    let links = collector.collect(&plan, 25, &CancellationToken::new()).await;

    let expected: Vec<String> = (1..=25).map(|id| item_url(&server, id)).collect();
    assert_eq!(links, expected);
}

#[tokio::test]
async fn test_full_harvest_into_sqlite() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_items(&server, &[], Duration::ZERO).await;

    let dir = tempfile::tempdir().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, &dir), "hash").unwrap();

    let summary = coordinator
        .run(
            CrawlRequest {
                start_url: None,
                limit: 25,
                resume: ResumeMode::Resume,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!summary.interrupted);
    assert!(!summary.resumed);
    assert_eq!(summary.planned_pages, 2);
    assert_eq!(summary.collected_links, 25);
    assert_eq!(summary.inserted, 25);
    assert_eq!(summary.skipped, 0);

    let store = coordinator.store();
    assert_eq!(store.get_run(summary.run_id).unwrap().status, RunStatus::Completed);

    let records = store.records_for_run(summary.run_id).unwrap();
    assert_eq!(records.len(), 25);

    let urls: HashSet<String> = records.iter().map(|r| r.page_url.clone()).collect();
    let expected: HashSet<String> = (1..=25).map(|id| item_url(&server, id)).collect();
    assert_eq!(urls, expected);

    let record = records
        .iter()
        .find(|r| r.page_url == item_url(&server, 7))
        .unwrap();
    assert_eq!(record.name, "Episode 7");
    assert_eq!(record.vid, "7");
    assert_eq!(record.playlist_id, "900");
    assert_eq!(record.pid.as_deref(), Some("12"));
    assert_eq!(record.album_name.as_deref(), Some("Harbor Nights"));
    assert_eq!(record.actors, vec!["Li Wei", "Chen Yu"]);
    assert_eq!(record.play_length.as_deref(), Some("2700"));
    assert_eq!(record.up_vote, 17);
    assert_eq!(record.down_vote, 3);

    // Nothing pending after a clean run
    assert!(!QueueSnapshotStore::new(dir.path().join("queue.snapshot.json")).exists());
}

#[tokio::test]
async fn test_item_without_vid_is_skipped() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_items(&server, &[4], Duration::ZERO).await;

    let dir = tempfile::tempdir().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, &dir), "hash").unwrap();

    let summary = coordinator
        .run(
            CrawlRequest {
                start_url: Some(listing_url(&server, 1)),
                limit: 10,
                resume: ResumeMode::Resume,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.collected_links, 10);
    assert_eq!(summary.inserted, 9);
    assert_eq!(summary.skipped, 1);

    let records = coordinator.store().records_for_run(summary.run_id).unwrap();
    assert!(records.iter().all(|r| r.page_url != item_url(&server, 4)));
}

#[tokio::test]
async fn test_unpaginated_start_url_collects_one_page() {
    let server = MockServer::start().await;
    mount_items(&server, &[], Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path("/featured.html"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="info"><a href="/item/1.shtml">1</a></div>
               <div class="info"><a href="/item/2.shtml">2</a></div>"#,
        ))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, &dir), "hash").unwrap();

    let summary = coordinator
        .run(
            CrawlRequest {
                start_url: Some(format!("{}/featured.html", server.uri())),
                limit: 0,
                resume: ResumeMode::Fresh,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.planned_pages, 1);
    assert_eq!(summary.inserted, 2);
}

#[tokio::test]
async fn test_resume_from_snapshot() {
    let server = MockServer::start().await;
    mount_items(&server, &[], Duration::ZERO).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);
    let snapshots = QueueSnapshotStore::new(&config.output.snapshot_path);
    let pending: Vec<String> = (40..45).map(|id| item_url(&server, id)).collect();
    snapshots.save(&pending).unwrap();

    let coordinator = Coordinator::new(config, "hash").unwrap();
    let summary = coordinator
        .run(CrawlRequest::default(), CancellationToken::new())
        .await
        .unwrap();

    assert!(summary.resumed);
    assert_eq!(summary.inserted, 5);
    assert!(!snapshots.exists());

    let urls: HashSet<String> = coordinator
        .store()
        .records_for_run(summary.run_id)
        .unwrap()
        .into_iter()
        .map(|r| r.page_url)
        .collect();
    assert_eq!(urls, pending.into_iter().collect());
}

#[tokio::test]
async fn test_fresh_ignores_snapshot() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_items(&server, &[], Duration::ZERO).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&server, &dir);
    let snapshots = QueueSnapshotStore::new(&config.output.snapshot_path);
    snapshots.save(&[item_url(&server, 99)]).unwrap();

    let coordinator = Coordinator::new(config, "hash").unwrap();
    let summary = coordinator
        .run(
            CrawlRequest {
                start_url: None,
                limit: 3,
                resume: ResumeMode::Fresh,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert!(!summary.resumed);
    assert_eq!(summary.inserted, 3);
    assert!(!snapshots.exists());
}

#[tokio::test]
async fn test_interrupt_then_resume_completes_the_work() {
    let server = MockServer::start().await;
    mount_listing(&server).await;
    mount_items(&server, &[], Duration::from_millis(200)).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&server, &dir);
    config.crawler.worker_count = 2;
    let coordinator = Coordinator::new(config, "hash").unwrap();

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            cancel.cancel();
        });
    }

    let request = CrawlRequest {
        start_url: None,
        limit: 25,
        resume: ResumeMode::Resume,
    };
    let first = coordinator.run(request.clone(), cancel).await.unwrap();

    assert!(first.interrupted);
    assert!(first.remaining > 0);
    assert_eq!(
        first.inserted + first.skipped + first.remaining as u64,
        first.collected_links as u64
    );
    assert!(coordinator.snapshots().exists());
    assert_eq!(
        coordinator.store().get_run(first.run_id).unwrap().status,
        RunStatus::Interrupted
    );

    let second = coordinator
        .run(request, CancellationToken::new())
        .await
        .unwrap();

    assert!(second.resumed);
    assert!(!second.interrupted);
    assert_eq!(second.inserted, first.remaining as u64);
    assert!(!coordinator.snapshots().exists());

    let mut all = HashSet::new();
    for run_id in [first.run_id, second.run_id] {
        for record in coordinator.store().records_for_run(run_id).unwrap() {
            assert!(all.insert(record.page_url), "link harvested twice");
        }
    }
    assert_eq!(all.len(), 25);
}

#[tokio::test]
async fn test_failing_listing_page_is_skipped() {
    let server = MockServer::start().await;
    mount_items(&server, &[], Duration::ZERO).await;

    // Page 1 advertises three pages; page 2 is down
    let widget = r#"<div class="num"><a href="/list_p101_p20.html">1</a>
                    <a href="/list_p103_p20.html">3</a></div>"#;
    for (page, ids) in [(1u32, [1u32, 2]), (3, [5, 6])] {
        let cards: String = ids
            .iter()
            .map(|id| format!(r#"<div class="info"><a href="/item/{}.shtml">x</a></div>"#, id))
            .collect();
        Mock::given(method("GET"))
            .and(path(format!("/list_p10{}_p20.html", page)))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(format!("{}{}", cards, widget)),
            )
            .mount(&server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/list_p102_p20.html"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let coordinator = Coordinator::new(create_test_config(&server, &dir), "hash").unwrap();
    let summary = coordinator
        .run(CrawlRequest::default(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.planned_pages, 3);
    assert_eq!(summary.collected_links, 4);
    assert_eq!(summary.inserted, 4);
}
