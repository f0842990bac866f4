//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small catalog and run the full
//! category → sub-category → listing traversal end-to-end.

use shelf_crawler::config::{Config, CrawlerConfig, GatewayConfig, OutputConfig, SiteSchema};
use shelf_crawler::crawler::{run_crawl, Coordinator, HttpRenderSession, SessionPool};
use shelf_crawler::sink::{MemorySink, RunStatus, SqliteSink};
use shelf_crawler::{CrawlError, ProductRecord};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration crawling from `start_url`
fn create_test_config(start_url: &str, db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            start_url: start_url.to_string(),
            max_concurrent_sessions: 2,
            deduplicate: true,
        },
        gateway: GatewayConfig {
            user_agent: "TestCrawler/1.0".to_string(),
            timeout_secs: 5,
            max_retries: 0,
            retry_backoff_ms: 10,
            render_endpoint: None,
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
        schema: SiteSchema::default(),
    }
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

fn start_page() -> String {
    r#"
    <div ng-class="::aisleClass">
        <a href="/fruit-veg"><span class="categoryList-aisleLabelNameLine"> Fruit &amp; Veg </span></a>
    </div>
    <div ng-class="::aisleClass">
        <a href="/bakery"><span class="categoryList-aisleLabelNameLine">Bakery</span></a>
    </div>
    <div ng-class="::aisleClass">
        <span class="categoryList-aisleLabelNameLine">Specials</span>
    </div>
    "#
    .to_string()
}

fn card(name: &str, size: &str, price: &str, cup: Option<&str>) -> String {
    let cup = cup
        .map(|cup| format!(r#"<span class="pricingContainer-priceCup">{}</span>"#, cup))
        .unwrap_or_default();
    format!(
        r#"<wow-card card="card">
            <a class="shelfProductStamp-imageLinkInnerDes" href="/product/{name}">image</a>
            <div class="shelfProductStamp-productName"><span>{name}</span><span>{size}</span></div>
            <span class="pricingContainer-priceAmount">{price}</span>
            {cup}
        </wow-card>"#,
        name = name,
        size = size,
        price = price,
        cup = cup
    )
}

fn pager(active: u32, pages: u32) -> String {
    let controls: String = (1..=pages)
        .map(|page| {
            if page == active {
                format!(r#"<a class="paging-pageNumber page">{}</a>"#, page)
            } else {
                format!(
                    r#"<a class="paging-pageNumber page" href="?page={}">{}</a>"#,
                    page, page
                )
            }
        })
        .collect();
    format!(r#"<div class="paging _pagingControl">{}</div>"#, controls)
}

/// Mounts a catalog with one working and one broken branch
async fn mount_catalog(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/browse"))
        .respond_with(html(&start_page()))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fruit-veg"))
        .respond_with(html(
            r#"<wow-categories-spinner-category-mf>
                <a href="/fruit-veg/apples"><span>Apples</span></a>
            </wow-categories-spinner-category-mf>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/bakery"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;

    // Page 2 is mounted first so it wins over the bare listing path
    Mock::given(method("GET"))
        .and(path("/fruit-veg/apples"))
        .and(query_param("page", "2"))
        .respond_with(html(&format!(
            "{}{}",
            card("Granny Smith", "6 pack", "$5.00", Some("$0.83 / 1EA")),
            pager(2, 2)
        )))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fruit-veg/apples"))
        .respond_with(html(&format!(
            "{}{}{}",
            card("Gala", "1kg", "$4.50", Some("$4.50 / 1KG")),
            card("Pink Lady", "1kg", "$6.00", None),
            pager(1, 2)
        )))
        .mount(server)
        .await;
}

fn sorted(mut records: Vec<ProductRecord>) -> Vec<ProductRecord> {
    records.sort_by(|a, b| (a.page_number, &a.name).cmp(&(b.page_number, &b.name)));
    records
}

#[tokio::test]
async fn test_full_crawl_stores_every_listing_page() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("crawl.db");
    let config = create_test_config(
        &format!("{}/browse", server.uri()),
        db_path.to_str().unwrap(),
    );

    let report = run_crawl(config, "test-hash").await.unwrap();
    assert_eq!(report.records_stored, 3);
    assert_eq!(report.gateway_failures, 1, "the bakery branch 404s");
    assert_eq!(report.branches_pruned, 1, "Specials has no link");
    assert_eq!(report.sink_failures, 0);

    let sink = SqliteSink::new(&db_path).unwrap();
    let run = sink.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");

    let records = sorted(sink.load_products(run.id).unwrap());
    assert_eq!(records.len(), 3);

    let listing = format!("{}/fruit-veg/apples", server.uri());
    for record in &records {
        assert_eq!(record.category, "Fruit & Veg");
        assert_eq!(record.sub_category, "Apples");
    }

    assert_eq!(records[0].name.as_deref(), Some("Gala"));
    assert_eq!(records[0].page_number, 1);
    assert_eq!(records[0].page_url, listing);
    assert_eq!(records[0].price_cup.as_deref(), Some("$4.50 / 1KG"));
    assert_eq!(records[0].url.as_deref(), Some("/product/Gala"));

    assert_eq!(records[1].name.as_deref(), Some("Pink Lady"));
    assert_eq!(records[1].price_cup, None);
    assert_eq!(records[1].price_amount.as_deref(), Some("$6.00"));

    assert_eq!(records[2].name.as_deref(), Some("Granny Smith"));
    assert_eq!(records[2].size.as_deref(), Some("6 pack"));
    assert_eq!(records[2].page_number, 2);
    assert_eq!(records[2].page_url, format!("{}?page=2", listing));
}

#[tokio::test]
async fn test_empty_start_page_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/browse"))
        .respond_with(html("<p>Down for maintenance</p>"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("crawl.db");
    let config = create_test_config(
        &format!("{}/browse", server.uri()),
        db_path.to_str().unwrap(),
    );

    let result = run_crawl(config, "test-hash").await;
    assert!(matches!(result, Err(CrawlError::Bootstrap { .. })));

    let sink = SqliteSink::new(Path::new(&db_path)).unwrap();
    let run = sink.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(sink.count_products(Some(run.id)).unwrap(), 0);

    // Only the start page was ever requested
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn test_unreachable_start_page_fails_run() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/browse"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("crawl.db");
    let config = create_test_config(
        &format!("{}/browse", server.uri()),
        db_path.to_str().unwrap(),
    );

    match run_crawl(config, "test-hash").await {
        Err(CrawlError::Bootstrap { reason, .. }) => assert!(reason.contains("503")),
        other => panic!("expected bootstrap failure, got {:?}", other.map(|r| r.records_stored)),
    }
}

#[tokio::test]
async fn test_crawl_through_render_endpoint() {
    let server = MockServer::start().await;
    let site = "http://shop.test";

    Mock::given(method("GET"))
        .and(path("/render"))
        .and(query_param("url", format!("{}/browse", site)))
        .respond_with(html(
            r#"<div ng-class="::aisleClass">
                <a href="/dairy"><span class="categoryList-aisleLabelNameLine">Dairy</span></a>
            </div>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/render"))
        .and(query_param("url", format!("{}/dairy", site)))
        .respond_with(html(
            r#"<wow-categories-spinner-category-mf>
                <a href="/dairy/milk"><span>Milk</span></a>
            </wow-categories-spinner-category-mf>"#,
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/render"))
        .and(query_param("url", format!("{}/dairy/milk", site)))
        .respond_with(html(&card("Full Cream", "2L", "$3.10", None)))
        .mount(&server)
        .await;

    let mut config = create_test_config(&format!("{}/browse", site), ":memory:");
    config.gateway.render_endpoint = Some(format!("{}/render", server.uri()));

    let sessions = vec![
        HttpRenderSession::new(&config.gateway).unwrap(),
        HttpRenderSession::new(&config.gateway).unwrap(),
    ];
    let sink = Arc::new(MemorySink::new());
    let mut coordinator =
        Coordinator::new(&config, SessionPool::new(sessions), sink.clone()).unwrap();

    let report = coordinator.run().await.unwrap();
    assert_eq!(report.pages_fetched, 3);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name.as_deref(), Some("Full Cream"));
    assert_eq!(records[0].category, "Dairy");
    assert_eq!(records[0].sub_category, "Milk");
    assert_eq!(records[0].page_number, 1);
    assert_eq!(records[0].page_url, "http://shop.test/dairy/milk");
}
