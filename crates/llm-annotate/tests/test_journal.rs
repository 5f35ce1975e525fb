mod common;

use std::sync::{Arc, Mutex};

use common::*;
use llm_annotate::{
    CacheGateway, Doc, DummyBackend, ExchangeRecord, LlmComponent, MemoryCache, NoCache, Vocab,
    WorkItem,
};

#[test]
fn fresh_items_carry_their_own_exchange() {
    let mut llm = component(LabelTask::new(), upper_backend(), Box::new(NoCache), true);

    let output = llm.process_batch(&docs(&["red", "green"])).unwrap();

    assert_eq!(
        output[0].exchanges().get("llm"),
        Some(&ExchangeRecord {
            prompt: format!("{PROMPT_PREFIX}red"),
            response: "RED".to_string(),
        })
    );
    assert_eq!(
        output[1].exchanges().get("llm").unwrap().response,
        "GREEN"
    );
}

#[test]
fn pairing_survives_interleaved_hits() {
    let cache = Arc::new(Mutex::new(MemoryCache::<Doc>::new()));
    let mut llm = component(
        LabelTask::new(),
        upper_backend(),
        Box::new(cache.clone()),
        true,
    );
    llm.process_batch(&docs(&["b", "d"])).unwrap();

    let output = llm.process_batch(&docs(&["a", "b", "c", "d", "e"])).unwrap();

    assert_eq!(labels(&output), vec!["A", "B", "C", "D", "E"]);
    for doc in [&output[0], &output[2], &output[4]] {
        let record = doc.exchanges().get("llm").unwrap();
        assert_eq!(record.prompt, format!("{PROMPT_PREFIX}{}", doc.text()));
        assert_eq!(record.response, doc.text().to_uppercase());
    }
}

#[test]
fn cache_hits_get_no_new_record() {
    let cache = Arc::new(Mutex::new(MemoryCache::<Doc>::new()));
    let mut llm = component(
        LabelTask::new(),
        upper_backend(),
        Box::new(cache.clone()),
        true,
    );
    llm.process_batch(&docs(&["a"])).unwrap();

    let output = llm.process_batch(&docs(&["a", "b"])).unwrap();

    assert_eq!(exchange_prompts(&output, "llm"), vec![None, Some(format!("{PROMPT_PREFIX}b"))]);
    let stored = cache.lock().unwrap().get(&Doc::new("b")).unwrap();
    assert!(stored.exchanges().is_empty());
}

#[test]
fn save_io_off_records_nothing() {
    let mut llm = component(LabelTask::new(), upper_backend(), Box::new(NoCache), false);

    let output = llm.process_batch(&docs(&["a", "b"])).unwrap();

    assert!(output.iter().all(|doc| doc.exchanges().is_empty()));
}

#[test]
fn records_are_filed_under_the_component_name() {
    let mut tagger = LlmComponent::<Doc>::builder()
        .name("tagger")
        .vocab(Vocab::default())
        .task(Box::new(LabelTask::new()))
        .backend(Box::new(upper_backend()))
        .save_io(true)
        .build()
        .unwrap();
    let mut echo = LlmComponent::<Doc>::builder()
        .name("echo")
        .vocab(Vocab::default())
        .task(Box::new(BareTask))
        .backend(Box::new(DummyBackend::echo()))
        .save_io(true)
        .build()
        .unwrap();

    let tagged = tagger.call(Doc::new("x")).unwrap();
    let echoed = echo.call(tagged).unwrap();

    assert_eq!(
        echoed.exchanges().components().collect::<Vec<_>>(),
        vec!["tagger", "echo"]
    );
    assert_eq!(echoed.exchanges().get("echo").unwrap().prompt, "x");
    assert_eq!(echoed.annotation("echo").unwrap(), "x");
}
