mod common;

use chrono::NaiveDate;
use common::{
    board_page, board_source, feed_source, init_tracing, job_card, test_config, Reply, ScriptedTransport, CREW_FEED,
};
use job_aggregator::{JobPipeline, Payload, Query, RawCandidate, SourceAdapter};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const INDEED_URL: &str = "https://indeed.test/jobs?q=cinematographer";
const LINKEDIN_URL: &str = "https://linkedin.test/jobs/search?keywords=cinematographer";
const FEED_URL: &str = "https://crew.example/jobs.rss";

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
}

#[tokio::test]
async fn test_duplicate_across_sources_and_geo_filter() -> anyhow::Result<()> {
    init_tracing();
    let indeed_page = board_page(&[
        job_card("Cinematographer", "Studio X", "London, UK", "/jobs/1"),
        job_card("Cinematographer", "Studio X", "Mumbai, India", "/jobs/2"),
        job_card("Barista", "Cafe", "London, UK", "/jobs/3"),
    ]);
    let linkedin_page = board_page(&[job_card("Cinematographer", "Studio X", "London, UK", "/jobs/9")]);
    let transport = Arc::new(
        ScriptedTransport::new()
            .ok(INDEED_URL, indeed_page)
            .ok(LINKEDIN_URL, linkedin_page),
    );
    let config = test_config(vec![
        board_source("Indeed", &[INDEED_URL]),
        board_source("LinkedIn", &[LINKEDIN_URL]),
    ]);
    let pipeline = JobPipeline::with_transport(config, transport.clone())?;

    let (listings, report) = pipeline.run_on(run_date()).await;

    info!("Run report: {:?}", report);
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].source(), "Indeed");
    assert_eq!(listings[0].location(), "London, UK");
    assert_eq!(listings[0].scraped_date(), run_date());
    assert_eq!(listings[0].url(), "https://board.example/jobs/1");

    assert_eq!(report.sources.len(), 2);
    assert_eq!(report.sources[0].candidates, 3);
    assert_eq!(report.sources[0].relevant, 2, "Barista never reaches the merge");
    assert_eq!(report.merged, 3);
    assert_eq!(report.returned, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_source_with_every_query_timing_out_contributes_nothing() -> anyhow::Result<()> {
    init_tracing();
    let slow_a = "https://slow.test/jobs?page=1";
    let slow_b = "https://slow.test/jobs?page=2";
    let transport = Arc::new(
        ScriptedTransport::new()
            .script(slow_a, vec![Reply::Hang])
            .script(slow_b, vec![Reply::Hang])
            .ok(FEED_URL, CREW_FEED),
    );
    let config = test_config(vec![
        board_source("Slow Board", &[slow_a, slow_b]),
        feed_source("Crew Calls", FEED_URL),
    ]);
    let pipeline = JobPipeline::with_transport(config, transport.clone())?;

    let (listings, report) = pipeline.run_on(run_date()).await;

    let slow = &report.sources[0];
    assert_eq!(slow.payloads, 0);
    assert_eq!(slow.failed_queries, 2);
    assert!(slow.error.as_deref().unwrap_or_default().contains("all 2 queries failed"));
    assert_eq!(transport.request_count(slow_a), 3, "Each query used its full attempt budget");

    // The feed's London DOP survives; the Berlin gaffer is a target too.
    let titles: Vec<&str> = listings.iter().map(|l| l.title()).collect();
    assert_eq!(titles, vec!["Director of Photography - Feature Film", "Gaffer"]);
    assert!(listings.iter().all(|l| l.source() == "Crew Calls"));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_only_source_failing_yields_empty_result() -> anyhow::Result<()> {
    init_tracing();
    let transport = Arc::new(ScriptedTransport::new().script(INDEED_URL, vec![Reply::Status(503, String::new())]));
    let config = test_config(vec![board_source("Indeed", &[INDEED_URL])]);
    let pipeline = JobPipeline::with_transport(config, transport)?;

    let (listings, report) = pipeline.run_on(run_date()).await;

    assert!(listings.is_empty());
    assert!(report.sources[0].error.is_some());
    assert_eq!(report.returned, 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stuck_source_is_cut_off_by_source_timeout() -> anyhow::Result<()> {
    init_tracing();
    let slow = "https://stuck.test/jobs";
    let transport = Arc::new(
        ScriptedTransport::new()
            .script(slow, vec![Reply::Delayed(Duration::from_millis(900), Box::new(Reply::Hang))])
            .ok(INDEED_URL, board_page(&[job_card("Camera Operator", "Studio Y", "Paris", "/jobs/4")])),
    );
    let mut config = test_config(vec![board_source("Stuck", &[slow]), board_source("Indeed", &[INDEED_URL])]);
    config.run.source_timeout_ms = 1_500;
    let pipeline = JobPipeline::with_transport(config, transport)?;

    let (listings, report) = pipeline.run_on(run_date()).await;

    let stuck = report.sources[0].error.as_deref().unwrap_or_default();
    assert!(stuck.contains("gave up after"), "Unexpected error: {}", stuck);
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].source(), "Indeed");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_source_timeout_keeps_candidates_from_finished_queries() -> anyhow::Result<()> {
    init_tracing();
    let hanging = "https://indeed.test/jobs?q=gaffer";
    let transport = Arc::new(
        ScriptedTransport::new()
            .ok(INDEED_URL, board_page(&[job_card("Cinematographer", "Studio X", "London, UK", "/jobs/1")]))
            .script(hanging, vec![Reply::Hang]),
    );
    let mut config = test_config(vec![board_source("Indeed", &[INDEED_URL, hanging])]);
    config.run.source_timeout_ms = 2_000;
    let pipeline = JobPipeline::with_transport(config, transport)?;

    let (listings, report) = pipeline.run_on(run_date()).await;

    let indeed = &report.sources[0];
    info!("Source report: {:?}", indeed);
    assert!(indeed.error.as_deref().unwrap_or_default().contains("gave up after"));
    assert_eq!(indeed.payloads, 1);
    assert_eq!(indeed.candidates, 1, "The first query finished before the cutoff");
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].title(), "Cinematographer");
    assert_eq!(listings[0].location(), "London, UK");
    Ok(())
}

#[tokio::test]
async fn test_partial_query_failure_keeps_successful_payloads() -> anyhow::Result<()> {
    init_tracing();
    let missing = "https://indeed.test/jobs?q=gaffer";
    let transport = Arc::new(ScriptedTransport::new().ok(
        INDEED_URL,
        board_page(&[job_card("Cinematographer", "Studio X", "New York", "/jobs/1")]),
    ));
    let config = test_config(vec![board_source("Indeed", &[missing, INDEED_URL])]);
    let pipeline = JobPipeline::with_transport(config, transport)?;

    let (listings, report) = pipeline.run_on(run_date()).await;

    assert_eq!(listings.len(), 1);
    assert_eq!(report.sources[0].failed_queries, 1);
    assert_eq!(report.sources[0].payloads, 1);
    assert!(report.sources[0].error.is_none());
    Ok(())
}

#[tokio::test]
async fn test_cap_applies_to_final_list() -> anyhow::Result<()> {
    init_tracing();
    let cards: Vec<String> = (0..30)
        .map(|i| {
            let title = if i % 3 == 0 {
                format!("Camera Operator {} - TV Series", i)
            } else {
                format!("Camera Operator {}", i)
            };
            job_card(&title, &format!("Studio {}", i), "London", "/jobs/x")
        })
        .collect();
    let transport = Arc::new(ScriptedTransport::new().ok(INDEED_URL, board_page(&cards)));
    let config = test_config(vec![board_source("Indeed", &[INDEED_URL])]);
    let pipeline = JobPipeline::with_transport(config, transport)?;

    let listings = pipeline.run().await;

    assert_eq!(listings.len(), 15);
    assert_eq!(listings.iter().filter(|l| l.priority()).count(), 10);
    assert!(listings[..10].iter().all(|l| l.priority()));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_sources_merge_in_configured_order() -> anyhow::Result<()> {
    init_tracing();
    let first = "https://first.test/jobs";
    let second = "https://second.test/jobs";
    let third = "https://third.test/jobs";
    let shared = || board_page(&[job_card("Gaffer", "Bright Sparks", "Atlanta", "/jobs/g")]);
    let transport = Arc::new(
        ScriptedTransport::new()
            .script(first, vec![Reply::Delayed(Duration::from_millis(60), Box::new(Reply::ok(shared())))])
            .script(second, vec![Reply::Delayed(Duration::from_millis(5), Box::new(Reply::ok(shared())))])
            .ok(third, shared()),
    );
    let mut config = test_config(vec![
        board_source("First", &[first]),
        board_source("Second", &[second]),
        board_source("Third", &[third]),
    ]);
    config.run.max_concurrent_sources = 3;
    let pipeline = JobPipeline::with_transport(config, transport)?;

    let (listings, report) = pipeline.run_on(run_date()).await;

    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].source(), "First", "The slowest source still wins the tie by order");
    let order: Vec<&str> = report.sources.iter().map(|s| s.source.as_str()).collect();
    assert_eq!(order, vec!["First", "Second", "Third"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sources_share_host_spacing() -> anyhow::Result<()> {
    init_tracing();
    let crew = "https://shared.test/jobs?q=camera";
    let grips = "https://shared.test/jobs?q=grip";
    let transport = Arc::new(
        ScriptedTransport::new()
            .ok(crew, board_page(&[job_card("Camera Operator", "Studio Y", "Paris", "/jobs/1")]))
            .ok(grips, board_page(&[job_card("Key Grip", "Grip House", "Paris", "/jobs/2")])),
    );
    let mut config = test_config(vec![board_source("Crew", &[crew]), board_source("Grips", &[grips])]);
    config.run.max_concurrent_sources = 2;
    config.fetch.politeness_delay_ms = (4_000, 4_000);
    let pipeline = JobPipeline::with_transport(config, transport.clone())?;

    let (_, report) = pipeline.run_on(run_date()).await;

    assert!(report.sources.iter().all(|s| s.error.is_none()));
    let crew_at = transport.request_times(crew)[0];
    let grips_at = transport.request_times(grips)[0];
    let gap = if grips_at > crew_at { grips_at - crew_at } else { crew_at - grips_at };
    assert!(gap >= Duration::from_millis(4_000), "Sources on one host must stay spaced: {:?}", gap);
    Ok(())
}

#[tokio::test]
async fn test_source_order_decides_which_duplicate_survives() -> anyhow::Result<()> {
    init_tracing();
    let page = || board_page(&[job_card("Camera Assistant", "Focus Co", "Madrid", "/jobs/a")]);
    let transport = Arc::new(ScriptedTransport::new().ok(INDEED_URL, page()).ok(LINKEDIN_URL, page()));

    let forward = JobPipeline::with_transport(
        test_config(vec![board_source("Indeed", &[INDEED_URL]), board_source("LinkedIn", &[LINKEDIN_URL])]),
        transport.clone(),
    )?;
    let reversed = JobPipeline::with_transport(
        test_config(vec![board_source("LinkedIn", &[LINKEDIN_URL]), board_source("Indeed", &[INDEED_URL])]),
        transport.clone(),
    )?;

    let forward_listings = forward.run_on(run_date()).await;
    let reversed_listings = reversed.run_on(run_date()).await;

    assert_eq!(forward_listings.0[0].source(), "Indeed");
    assert_eq!(reversed_listings.0[0].source(), "LinkedIn");
    Ok(())
}

struct StaticSource {
    queries: Vec<Query>,
}

impl SourceAdapter for StaticSource {
    fn name(&self) -> &str {
        "Static"
    }

    fn queries(&self) -> &[Query] {
        &self.queries
    }

    fn extract(&self, _payload: &Payload) -> Vec<RawCandidate> {
        vec![RawCandidate::new("Static", "Lighting Technician - Amazon Original")
            .with_company("Grip House")
            .with_location("Vancouver")]
    }
}

#[tokio::test]
async fn test_custom_adapter_runs_after_configured_sources() -> anyhow::Result<()> {
    init_tracing();
    let custom_url = "https://custom.test/jobs";
    let transport = Arc::new(
        ScriptedTransport::new()
            .ok(custom_url, "anything")
            .ok(INDEED_URL, board_page(&[job_card("Gaffer", "Bright Sparks", "Chicago", "/jobs/1")])),
    );
    let mut pipeline =
        JobPipeline::with_transport(test_config(vec![board_source("Indeed", &[INDEED_URL])]), transport)?;
    pipeline.add_source(Box::new(StaticSource {
        queries: vec![Query {
            url: custom_url.to_string(),
            location: None,
        }],
    }));

    assert_eq!(pipeline.source_names(), vec!["Indeed", "Static"]);
    let listings = pipeline.run().await;

    assert_eq!(listings.len(), 2);
    assert_eq!(listings[0].source(), "Static", "Priority listing ranks first");
    assert_eq!(listings[1].source(), "Indeed");
    Ok(())
}
