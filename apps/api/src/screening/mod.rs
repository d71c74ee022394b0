// Resume screening: extract → prompt → model judge → verdict → decision.
// All backend calls go through llm_client::EvaluationClient.

pub mod catalog;
pub mod extractor;
pub mod handlers;
pub mod orchestrator;
pub mod prompts;
pub mod session;
pub mod verdict;

#[cfg(test)]
pub mod testing;
