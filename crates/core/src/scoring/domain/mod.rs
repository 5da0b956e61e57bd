pub mod chat_provider;
pub mod rule_scorer;
pub mod score_fusion;
pub mod scores;
pub mod semantic_scorer;
pub mod thumbnail_source;
pub mod visual_scorer;
