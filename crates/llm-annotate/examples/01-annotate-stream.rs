use anyhow::Result;
use llm_annotate::utils::init_tracing;
use llm_annotate::{
    Doc, DummyBackend, LlmComponent, MemoryCache, PromptTask, Vocab, WorkItem, ignore_error,
};
use std::sync::{Arc, Mutex};

/// Asks for a one-word sentiment per document.
struct SentimentTask;

impl PromptTask<Doc> for SentimentTask {
    fn generate_prompts(&self, items: &[Doc]) -> Result<Vec<String>> {
        Ok(items
            .iter()
            .map(|doc| format!("Answer `positive` or `negative`.\nText: {}", doc.text()))
            .collect())
    }

    fn parse_responses(&self, items: Vec<Doc>, responses: &[String]) -> Result<Vec<Doc>> {
        Ok(items
            .into_iter()
            .zip(responses)
            .map(|(mut doc, response)| {
                doc.annotate("sentiment", response.trim());
                doc
            })
            .collect())
    }
}

fn main() -> Result<()> {
    init_tracing()?;

    // Stands in for a hosted model: anything mentioning "love" is positive.
    let backend = DummyBackend::new(|prompt| {
        let label = if prompt.contains("love") { "positive" } else { "negative" };
        label.to_string()
    })
    .fail_when(|prompt| prompt.contains("timeout"))
    .with_model("dummy-sentiment");

    let cache = Arc::new(Mutex::new(MemoryCache::<Doc>::new()));
    let mut llm = LlmComponent::<Doc>::builder()
        .name("sentiment")
        .vocab(Vocab::new("en"))
        .task(Box::new(SentimentTask))
        .backend(Box::new(backend.clone()))
        .cache(Box::new(cache.clone()))
        .save_io(true)
        .batch_size(2)
        .build()?;

    let texts = [
        "I love this library",
        "The build broke again",
        "this request will timeout",
        "Another flaky test",
        "I love this library",
    ];
    let batch_size = llm.batch_size();
    for doc in llm.pipe(texts.map(Doc::from), batch_size, ignore_error)? {
        let doc = doc?;
        let cached = doc.exchanges().get("sentiment").is_none();
        println!(
            "{:<28} {:<10} {}",
            doc.text(),
            doc.annotation("sentiment")
                .and_then(|value| value.as_str())
                .unwrap_or("-"),
            if cached { "(cached)" } else { "" }
        );
    }

    println!(
        "backend calls: {}, cached documents: {}",
        backend.calls().len(),
        cache.lock().map(|cache| cache.len()).unwrap_or_default()
    );

    let dir = std::env::temp_dir().join("llm-annotate-sentiment");
    llm.to_disk(&dir, &[])?;
    println!("saved component state to {}", dir.display());
    Ok(())
}
