//! Fetch every code, aggregate the results and write the report.
//!
//! A failure on one code never stops the run: it becomes a
//! [`FetchResult::Failed`] entry and the next code is fetched. Only a render or
//! write failure aborts the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use futures::{StreamExt, stream};

use crate::progress::Progress;
use crate::render::{DocumentRenderer, RenderError, build_html, write_document};
use crate::scraper::WebScraper;
use crate::types::{FetchResult, PopCode, RunReport, StatusMessage};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Render(#[from] RenderError),
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Pause after each code, whatever the outcome. Paces the progress feed.
    pub delay: Duration,
    /// Pages fetched at once. Results keep code order either way.
    pub concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(500),
            concurrency: 1,
        }
    }
}

async fn fetch_one(
    scraper: &WebScraper,
    code: PopCode,
    delay: Duration,
    progress: &dyn Progress,
) -> FetchResult {
    progress.report(StatusMessage::grabbing(&code));

    let result = match scraper.fetch_coordinates(&code).await {
        Ok(coordinates) => {
            log::debug!("{}: {}", code, coordinates);
            FetchResult::found(code, coordinates)
        }
        Err(e) => {
            log::warn!("Failed to fetch coordinates for {}: {}", code, e);
            progress.report(StatusMessage::failed(&code));
            FetchResult::failed(code, e.to_string())
        }
    };

    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    result
}

/// One result per code, in the order of `codes`.
pub async fn fetch_all(
    scraper: &WebScraper,
    codes: &[PopCode],
    options: &PipelineOptions,
    progress: &dyn Progress,
) -> Vec<FetchResult> {
    log::info!(
        "Fetching coordinates for {} PoPs ({} at a time)...",
        codes.len(),
        options.concurrency.max(1)
    );

    stream::iter(codes.iter().cloned())
        .map(|code| fetch_one(scraper, code, options.delay, progress))
        .buffered(options.concurrency.max(1))
        .collect()
        .await
}

async fn render_to(
    renderer: &dyn DocumentRenderer,
    html: &str,
    output: &Path,
) -> Result<PathBuf, RenderError> {
    let bytes = renderer.render(html).await?;
    write_document(output, bytes).await
}

/// Full run: fetch, build the markup, render it and atomically replace `output`.
pub async fn run(
    scraper: &WebScraper,
    codes: &[PopCode],
    renderer: &dyn DocumentRenderer,
    output: &Path,
    options: &PipelineOptions,
    progress: &dyn Progress,
) -> Result<RunReport, PipelineError> {
    let started_at = Utc::now();
    let results = fetch_all(scraper, codes, options, progress).await;
    let html = build_html(&results);

    match render_to(renderer, &html, output).await {
        Ok(path) => {
            progress.report(StatusMessage::finished());
            let report = RunReport::new(results, started_at, Some(path));
            log::info!(
                "Run finished: {} found, {} failed",
                report.found,
                report.failed
            );
            Ok(report)
        }
        Err(e) => {
            log::error!("Rendering with {} failed: {}", renderer.name(), e);
            progress.report(StatusMessage::render_failed(&e));
            Err(e.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{NullProgress, channel};
    use crate::render::HtmlRenderer;
    use crate::scraper::ScraperConfig;
    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn coordinates_page(coordinates: &str) -> String {
        format!(
            r#"<html><body><div><div><main>
            <section class="mx-auto max-w-4xl space-y-8"><div><div>
              <div>
                <div><p>Code</p></div>
                <div><p>City</p></div>
                <div><div><p>Coordinates</p><p> {coordinates} </p></div></div>
              </div>
            </div></div></section>
            </main></div></div></body></html>"#
        )
    }

    fn codes(list: &[&str]) -> Vec<PopCode> {
        list.iter().map(|c| c.parse().unwrap()).collect()
    }

    fn no_delay() -> PipelineOptions {
        PipelineOptions {
            delay: Duration::ZERO,
            concurrency: 1,
        }
    }

    async fn mount_page(server: &MockServer, slug: &str, coordinates: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/pops/{slug}/")))
            .respond_with(ResponseTemplate::new(200).set_body_string(coordinates_page(coordinates)))
            .mount(server)
            .await;
    }

    async fn mount_slow(server: &MockServer, slug: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/pops/{slug}/")))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(coordinates_page("9.9, 9.9"))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(server)
            .await;
    }

    fn scraper_for(server: &MockServer) -> WebScraper {
        WebScraper::with_config(ScraperConfig {
            base_url: format!("{}/pops/", server.uri()),
            timeout: Duration::from_millis(300),
            ..Default::default()
        })
        .unwrap()
    }

    struct FailingRenderer;

    #[async_trait]
    impl DocumentRenderer for FailingRenderer {
        async fn render(&self, _html: &str) -> Result<Vec<u8>, RenderError> {
            Err(RenderError::EmptyOutput(PathBuf::from("fake-engine")))
        }

        fn content_type(&self) -> &'static str {
            "application/pdf"
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_timeout_becomes_placeholder_entry() {
        let server = MockServer::start().await;
        mount_page(&server, "aaa", "1.0, 2.0").await;
        mount_slow(&server, "bbb").await;

        let results = fetch_all(
            &scraper_for(&server),
            &codes(&["AAA", "BBB"]),
            &no_delay(),
            &NullProgress,
        )
        .await;

        let lines: Vec<String> = results.iter().map(ToString::to_string).collect();
        assert_eq!(lines, ["AAA: 1.0, 2.0", "BBB: Error fetching data"]);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_from_neighbours() {
        let server = MockServer::start().await;
        mount_page(&server, "aaa", "1, 1").await;
        Mock::given(method("GET"))
            .and(path("/pops/bbb/"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        mount_page(&server, "ccc", "3, 3").await;

        let results = fetch_all(
            &scraper_for(&server),
            &codes(&["AAA", "BBB", "CCC"]),
            &no_delay(),
            &NullProgress,
        )
        .await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].coordinates(), Some("1, 1"));
        assert!(!results[1].is_found());
        assert_eq!(results[2].coordinates(), Some("3, 3"));
    }

    #[tokio::test]
    async fn test_concurrent_fetch_keeps_code_order() {
        let server = MockServer::start().await;
        let list = ["AAA", "BBB", "CCC", "DDD", "EEE", "FFF"];
        for (i, c) in list.iter().enumerate() {
            let slug = c.to_lowercase();
            Mock::given(method("GET"))
                .and(path(format!("/pops/{slug}/")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(coordinates_page(&format!("{i}, {i}")))
                        .set_delay(Duration::from_millis(((list.len() - i) * 20) as u64)),
                )
                .mount(&server)
                .await;
        }

        let options = PipelineOptions {
            delay: Duration::ZERO,
            concurrency: 4,
        };
        let results = fetch_all(
            &scraper_for(&server),
            &codes(&list),
            &options,
            &NullProgress,
        )
        .await;

        let order: Vec<&str> = results.iter().map(|r| r.code().as_str()).collect();
        assert_eq!(order, list);
        for (i, r) in results.iter().enumerate() {
            assert_eq!(r.coordinates(), Some(format!("{i}, {i}").as_str()));
        }
    }

    #[tokio::test]
    async fn test_empty_code_list_makes_no_requests() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.html");
        let report = run(
            &scraper_for(&server),
            &[],
            &HtmlRenderer,
            &output,
            &no_delay(),
            &NullProgress,
        )
        .await
        .unwrap();

        assert_eq!(report.total(), 0);
        let html = std::fs::read_to_string(&output).unwrap();
        assert!(html.contains("<h1>Cloudflare PoP Coordinates</h1><ul></ul>"));
    }

    #[tokio::test]
    async fn test_repeat_runs_produce_identical_documents() {
        let server = MockServer::start().await;
        mount_page(&server, "aaa", "1.0, 2.0").await;
        mount_page(&server, "ccc", "5.5, 6.6").await;
        let scraper = scraper_for(&server);
        let list = codes(&["AAA", "BBB", "CCC"]);

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.html");

        run(&scraper, &list, &HtmlRenderer, &output, &no_delay(), &NullProgress)
            .await
            .unwrap();
        let first = std::fs::read(&output).unwrap();
        run(&scraper, &list, &HtmlRenderer, &output, &no_delay(), &NullProgress)
            .await
            .unwrap();
        let second = std::fs::read(&output).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_progress_messages_in_order() {
        let server = MockServer::start().await;
        mount_page(&server, "aaa", "1.0, 2.0").await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.html");
        let (tx, mut rx) = channel();

        run(
            &scraper_for(&server),
            &codes(&["AAA", "BBB"]),
            &HtmlRenderer,
            &output,
            &no_delay(),
            &tx,
        )
        .await
        .unwrap();
        drop(tx);

        let mut messages = Vec::new();
        while let Some(m) = rx.recv().await {
            messages.push(m.to_string());
        }
        assert_eq!(
            messages,
            [
                "Grabbing coordinates for AAA...",
                "Grabbing coordinates for BBB...",
                "Failed to fetch coordinates for BBB.",
                "All coordinates have been fetched. PDF is ready for download!",
            ]
        );
    }

    #[tokio::test]
    async fn test_render_failure_keeps_previous_document() {
        let server = MockServer::start().await;
        mount_page(&server, "aaa", "1.0, 2.0").await;

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("report.pdf");
        std::fs::write(&output, b"previous").unwrap();
        let (tx, mut rx) = channel();

        let err = run(
            &scraper_for(&server),
            &codes(&["AAA"]),
            &FailingRenderer,
            &output,
            &no_delay(),
            &tx,
        )
        .await
        .unwrap_err();
        drop(tx);

        assert!(matches!(err, PipelineError::Render(RenderError::EmptyOutput(_))));
        assert_eq!(std::fs::read(&output).unwrap(), b"previous");

        let mut last = None;
        while let Some(m) = rx.recv().await {
            last = Some(m.to_string());
        }
        assert!(last.unwrap().starts_with("PDF generation failed:"));
    }

    #[tokio::test]
    async fn test_delay_applies_per_item() {
        let server = MockServer::start().await;
        mount_page(&server, "aaa", "1, 1").await;
        mount_page(&server, "bbb", "2, 2").await;

        let options = PipelineOptions {
            delay: Duration::from_millis(100),
            concurrency: 1,
        };
        let started = std::time::Instant::now();
        fetch_all(
            &scraper_for(&server),
            &codes(&["AAA", "BBB"]),
            &options,
            &NullProgress,
        )
        .await;
        assert!(started.elapsed() >= Duration::from_millis(200));
    }
}
