//! Pagination planning
//!
//! Turns a start listing URL and an item limit into the ordered list of
//! listing pages to visit. The site's page-number widget tells us where the
//! listing ends; the limit tells us how far we need to go.

use crate::crawler::extract::ListingLinkExtractor;
use crate::crawler::fetcher::fetch_text;
use crate::url::{PageUrl, PageUrlCodec};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Ordered listing pages to collect from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationPlan {
    pages: Vec<String>,
}

impl PaginationPlan {
    /// A plan that visits only `url`
    pub fn single(url: impl Into<String>) -> Self {
        Self {
            pages: vec![url.into()],
        }
    }

    pub fn pages(&self) -> &[String] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn into_pages(self) -> Vec<String> {
        self.pages
    }

    /// A plan over explicit pages, in visiting order
    pub fn from_pages(pages: Vec<String>) -> Self {
        Self { pages }
    }
}

/// Computes the page URLs from `start` up to the page needed for `limit` items
///
/// A limit of 0 means "everything" and runs to `last_page`. The range always
/// contains at least the start page.
///
/// # Example
///
/// ```
/// use reel_harvest::crawler::plan_page_range;
/// use reel_harvest::PageUrlCodec;
///
/// let start = PageUrlCodec::default()
///     .parse("http://so.tv.example/list_p101_p20.html")
///     .unwrap();
/// let pages = plan_page_range(&start, 5, 25, 20);
/// assert_eq!(
///     pages,
///     vec![
///         "http://so.tv.example/list_p101_p20.html",
///         "http://so.tv.example/list_p102_p20.html",
///     ]
/// );
/// ```
pub fn plan_page_range(
    start: &PageUrl,
    last_page: u32,
    limit: usize,
    items_per_page: u32,
) -> Vec<String> {
    let first = start.page();
    let last_page = last_page.max(first);

    let end = if limit == 0 {
        last_page
    } else {
        let per_page = items_per_page.max(1) as u64;
        let needed = (limit as u64).div_ceil(per_page);
        let wanted = (first as u64).saturating_add(needed - 1);
        wanted.min(last_page as u64) as u32
    };

    (first..=end).map(|page| start.render(page)).collect()
}

/// Discovers the page range of a listing
pub struct PaginationPlanner {
    client: Client,
    extractor: Arc<dyn ListingLinkExtractor>,
    codec: PageUrlCodec,
    items_per_page: u32,
}

impl PaginationPlanner {
    pub fn new(
        client: Client,
        extractor: Arc<dyn ListingLinkExtractor>,
        codec: PageUrlCodec,
        items_per_page: u32,
    ) -> Self {
        Self {
            client,
            extractor,
            codec,
            items_per_page,
        }
    }

    /// Plans the listing pages to visit for at most `limit` items (0 = all)
    ///
    /// Never fails: when the start URL carries no page number, the start page
    /// cannot be fetched, or no later page is advertised, the plan is just the
    /// start URL.
    pub async fn plan(&self, start_url: &str, limit: usize) -> PaginationPlan {
        let start = match self.codec.parse(start_url) {
            Ok(start) => start,
            Err(e) => {
                debug!("{}; collecting the start page only", e);
                return PaginationPlan::single(start_url);
            }
        };

        let Some(last_page) = self.discover_last_page(start_url).await else {
            return PaginationPlan::single(start_url);
        };

        if last_page <= start.page() {
            debug!(
                "Listing ends at page {} (start page {}); nothing beyond the start page",
                last_page,
                start.page()
            );
            return PaginationPlan::single(start_url);
        }

        let pages = plan_page_range(&start, last_page, limit, self.items_per_page);
        info!(
            "Planned {} listing pages ({} to {}, listing ends at {})",
            pages.len(),
            start.page(),
            start.page() as usize + pages.len() - 1,
            last_page
        );
        PaginationPlan { pages }
    }

    /// Reads the last page number off the start page
    ///
    /// Uses the page-number widget, falling back to the next-page control
    /// when the widget is missing.
    async fn discover_last_page(&self, start_url: &str) -> Option<u32> {
        let base = match Url::parse(start_url) {
            Ok(base) => base,
            Err(e) => {
                warn!("Invalid start URL {}: {}", start_url, e);
                return None;
            }
        };

        let body = match fetch_text(&self.client, start_url, &[], None).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Could not fetch start page for planning: {}", e);
                return None;
            }
        };

        let listing = self.extractor.scan(&body, &base);
        let last_url = match (listing.last_page_url, listing.next_page_url) {
            (Some(last), _) => last,
            (None, Some(next)) => {
                debug!("No page-number widget on {}; using the next-page control", start_url);
                next
            }
            (None, None) => {
                debug!("No pagination controls on {}", start_url);
                return None;
            }
        };

        match self.codec.parse(&last_url) {
            Ok(last) => Some(last.page()),
            Err(e) => {
                debug!("Last page link is unusable: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SiteConfig, UserAgentConfig};
    use crate::crawler::extract::SelectorExtractor;
    use crate::crawler::fetcher::build_http_client;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn start() -> PageUrl {
        PageUrlCodec::default()
            .parse("http://so.tv.example/list_p101_p20.html")
            .unwrap()
    }

    fn planner() -> PaginationPlanner {
        let client = build_http_client(
            &UserAgentConfig {
                crawler_name: "TestHarvester".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: "https://example.com/about".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap();
        let extractor = Arc::new(SelectorExtractor::new(&SiteConfig::default()).unwrap());
        PaginationPlanner::new(client, extractor, PageUrlCodec::default(), 20)
    }

    #[test]
    fn test_range_stops_at_limit() {
        let pages = plan_page_range(&start(), 5, 25, 20);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], "http://so.tv.example/list_p101_p20.html");
        assert_eq!(pages[1], "http://so.tv.example/list_p102_p20.html");
    }

    #[test]
    fn test_range_exact_multiple() {
        assert_eq!(plan_page_range(&start(), 5, 40, 20).len(), 2);
        assert_eq!(plan_page_range(&start(), 5, 41, 20).len(), 3);
        assert_eq!(plan_page_range(&start(), 5, 1, 20).len(), 1);
    }

    #[test]
    fn test_range_capped_by_last_page() {
        let pages = plan_page_range(&start(), 3, 1_000, 20);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2], "http://so.tv.example/list_p103_p20.html");
    }

    #[test]
    fn test_unlimited_runs_to_last_page() {
        assert_eq!(plan_page_range(&start(), 7, 0, 20).len(), 7);
    }

    #[test]
    fn test_range_from_later_start() {
        let start = PageUrlCodec::default()
            .parse("http://so.tv.example/list_p104_p20.html")
            .unwrap();
        let pages = plan_page_range(&start, 9, 50, 20);
        assert_eq!(
            pages,
            vec![
                "http://so.tv.example/list_p104_p20.html",
                "http://so.tv.example/list_p105_p20.html",
                "http://so.tv.example/list_p106_p20.html",
            ]
        );
    }

    #[test]
    fn test_range_never_empty() {
        assert_eq!(plan_page_range(&start(), 0, 10, 20).len(), 1);
    }

    #[tokio::test]
    async fn test_unpaginated_start_url() {
        let plan = planner().plan("http://so.tv.example/index.html", 100).await;
        assert_eq!(plan, PaginationPlan::single("http://so.tv.example/index.html"));
    }

    #[tokio::test]
    async fn test_plan_from_widget() {
        let server = MockServer::start().await;
        let html = r#"<div class="num"><a href="/list_p101_p20.html">1</a>
                      <a href="/list_p104_p20.html">4</a></div>"#;
        Mock::given(method("GET"))
            .and(path("/list_p101_p20.html"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&server)
            .await;

        let start_url = format!("{}/list_p101_p20.html", server.uri());
        let plan = planner().plan(&start_url, 0).await;

        assert_eq!(plan.len(), 4);
        assert_eq!(plan.pages()[0], start_url);
        assert_eq!(plan.pages()[3], format!("{}/list_p104_p20.html", server.uri()));
    }

    #[tokio::test]
    async fn test_plan_falls_back_to_next_control() {
        let server = MockServer::start().await;
        let html = r#"<a class="next" href="/list_p102_p20.html">next</a>"#;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&server)
            .await;

        let start_url = format!("{}/list_p101_p20.html", server.uri());
        let plan = planner().plan(&start_url, 100).await;
        assert_eq!(plan.len(), 2);
    }

    #[tokio::test]
    async fn test_plan_without_controls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>one page</p>"))
            .mount(&server)
            .await;

        let start_url = format!("{}/list_p101_p20.html", server.uri());
        assert_eq!(
            planner().plan(&start_url, 100).await,
            PaginationPlan::single(start_url)
        );
    }

    #[tokio::test]
    async fn test_plan_when_start_page_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let start_url = format!("{}/list_p101_p20.html", server.uri());
        assert_eq!(
            planner().plan(&start_url, 100).await,
            PaginationPlan::single(start_url)
        );
    }

    async fn widget_server(html: &'static str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_plan_when_start_is_last_page() {
        let server = widget_server(
            r#"<div class="num"><a href="/list_p101_p20.html">1</a>
               <a href="/list_p103_p20.html">3</a></div>"#,
        )
        .await;

        let start_url = format!("{}/list_p103_p20.html", server.uri());
        assert_eq!(
            planner().plan(&start_url, 0).await,
            PaginationPlan::single(start_url)
        );
    }

    #[tokio::test]
    async fn test_plan_when_start_is_past_last_page() {
        let server = widget_server(
            r#"<div class="num"><a href="/list_p101_p20.html">1</a>
               <a href="/list_p103_p20.html">3</a></div>"#,
        )
        .await;

        let start_url = format!("{}/list_p105_p20.html", server.uri());
        assert_eq!(
            planner().plan(&start_url, 100).await,
            PaginationPlan::single(start_url)
        );
    }
}
