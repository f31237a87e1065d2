//! End-to-end question answering over a small in-memory corpus
//!
//! Run with: cargo run --example ask_pipeline
//!
//! Requires a running provider backend (Ollama by default, see
//! config.example.toml).

use std::sync::Arc;

use docurag::models::DocumentChunk;
use docurag::pipeline::Orchestrator;
use docurag::providers::provider_from_config;
use docurag::store::InMemoryVectorStore;
use docurag::AppConfig;

const CORPUS: &[(&str, u32, &str)] = &[
    (
        "grant_guide.pdf",
        3,
        "The maximum grant amount is 60000 EUR per project. Personnel costs \
         may not exceed 40 percent of the total budget.",
    ),
    (
        "grant_guide.pdf",
        12,
        "Applications must be submitted through the online portal before \
         March 31st. Late submissions are not evaluated.",
    ),
    (
        "eligibility_rules.pdf",
        2,
        "Applicants must be registered legal entities with at least two \
         years of operating history in a member country.",
    ),
    (
        "eligibility_rules.pdf",
        5,
        "Consortium applications require a designated lead partner who is \
         responsible for reporting and fund distribution.",
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    docurag::logging::init_simple_logging()?;

    let config = AppConfig::load()?;
    let (embedder, completer) = provider_from_config(&config)?;

    println!("📚 Indexing {} demo passages...\n", CORPUS.len());

    // Embed and index the corpus
    let texts: Vec<String> = CORPUS.iter().map(|(_, _, text)| (*text).to_string()).collect();
    let embeddings = embedder.embed_batch(&texts).await?;

    let store = Arc::new(InMemoryVectorStore::new());
    store.add_chunks(CORPUS.iter().zip(embeddings).enumerate().map(
        |(i, ((file, page, text), embedding))| {
            DocumentChunk::new(format!("chunk-{i}"), *file, *page, *text, embedding)
        },
    ));

    let orchestrator = Orchestrator::from_services(embedder, completer, store, &config);

    // A full question, then a terse follow-up in the same session
    for question in [
        "What is the maximum grant amount?",
        "and deadlines?",
        "Hibe başvurusu için hangi belgeler gerekli?",
    ] {
        println!("❓ {question}\n");
        let result = orchestrator.ask("demo-session", question).await;
        println!("{}", result.format());
        println!("{}", "-".repeat(60));
    }

    println!(
        "\n✅ Session recorded {} turns",
        orchestrator.sessions().turn_count("demo-session")
    );

    Ok(())
}
