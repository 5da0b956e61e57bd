pub mod highlight_plan;
pub mod segment_selector;
