use std::sync::Arc;
use std::time::Duration;
use stock_research_orchestrator::{
    api::start_server,
    collector::EvidenceCollector,
    facts::{FactsProvider, StaticFactsProvider},
    registry::JobRegistry,
    runner::{JobRunner, DEFAULT_MAX_CONCURRENT_JOBS},
    search::TavilyClient,
    synthesis::OpenAiSynthesizer,
    workflow::ResearchWorkflow,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    let output_dir =
        std::env::var("RESEARCH_OUTPUT_DIR").unwrap_or_else(|_| "research_data".to_string());
    let reports_dir = std::env::var("REPORTS_DIR").unwrap_or_else(|_| "reports".to_string());

    let max_concurrent: usize = std::env::var("MAX_CONCURRENT_JOBS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_CONCURRENT_JOBS);

    info!("🚀 Stock Research Orchestrator - API Server");
    info!("📍 Port: {}", api_port);
    info!("📂 Evidence dir: {} | Reports dir: {}", output_dir, reports_dir);
    info!("🧵 Max concurrent jobs: {}", max_concurrent);

    // Create components
    let search = Arc::new(TavilyClient::from_env()?);
    let synthesizer = Arc::new(OpenAiSynthesizer::from_env()?);
    let collector = EvidenceCollector::new(search, &output_dir)
        .with_category_pause(Duration::from_secs(1));
    let workflow = Arc::new(ResearchWorkflow::new(collector, synthesizer, &reports_dir));

    let facts: Arc<dyn FactsProvider> = match std::env::var("COMPANY_FACTS_FILE") {
        Ok(path) => Arc::new(StaticFactsProvider::from_file(&path)?),
        Err(_) => Arc::new(StaticFactsProvider::new()),
    };

    let runner = JobRunner::new(JobRegistry::new(), workflow, max_concurrent);

    info!("✅ Research workflow initialized");
    info!("📡 Starting API server...");

    // Start API server
    start_server(runner, facts, api_port).await?;

    Ok(())
}
