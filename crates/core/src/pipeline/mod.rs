pub mod apply_highlight_cut_use_case;
pub mod generate_plan_use_case;
pub mod highlight_error;
pub mod highlight_tools;
pub mod pipeline_context;
pub mod pipeline_logger;
pub mod score_highlights_use_case;
#[cfg(test)]
mod test_fixtures;
pub mod tool_result;
pub mod trim_transcript_use_case;
pub mod validate_visual_use_case;
