use std::sync::Arc;
use std::time::Duration;
use stock_research_orchestrator::{
    collector::EvidenceCollector,
    facts::{FactsProvider, StaticFactsProvider},
    models::JobStatus,
    registry::JobRegistry,
    runner::JobRunner,
    search::TavilyClient,
    synthesis::OpenAiSynthesizer,
    workflow::ResearchWorkflow,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let company_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Reliance Industries".to_string());

    let output_dir =
        std::env::var("RESEARCH_OUTPUT_DIR").unwrap_or_else(|_| "research_data".to_string());
    let reports_dir = std::env::var("REPORTS_DIR").unwrap_or_else(|_| "reports".to_string());

    info!("Stock Research Orchestrator starting");

    // Create components
    let search = Arc::new(TavilyClient::from_env()?);
    let synthesizer = Arc::new(OpenAiSynthesizer::from_env()?);
    let collector = EvidenceCollector::new(search, &output_dir)
        .with_category_pause(Duration::from_secs(1));
    let workflow = Arc::new(ResearchWorkflow::new(collector, synthesizer, &reports_dir));
    let facts = StaticFactsProvider::new();

    let runner = JobRunner::new(JobRegistry::new(), workflow, 1);

    // Run a single job end to end
    let subject = facts.resolve(&company_name, None).await?;
    info!(company = %subject.name, "Running research job");

    let job_id = runner.registry().create(subject).await;
    runner.spawn(job_id).await?;

    let mut last_message = String::new();
    loop {
        let job = runner.registry().get(job_id).await?;
        if job.progress.message != last_message {
            println!(
                "[{}/{}] {} - {}",
                job.progress.step, job.progress.total, job.progress.stage, job.progress.message
            );
            last_message = job.progress.message.clone();
        }
        if job.is_terminal() {
            match job.status {
                JobStatus::Completed => {
                    let result = job.result.expect("completed job carries a result");
                    println!("\n=== RESEARCH RESULT ===");
                    println!("Recommendation: {}", result.verdict.recommendation);
                    println!("Confidence: {}", result.verdict.confidence);
                    println!("Report: {}", result.report_path);
                    return Ok(());
                }
                JobStatus::Cancelled => {
                    eprintln!("Research cancelled");
                    return Ok(());
                }
                _ => {
                    let message = job
                        .error
                        .map(|e| e.message)
                        .unwrap_or_else(|| "unknown error".into());
                    eprintln!("Research failed: {}", message);
                    std::process::exit(1);
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}
