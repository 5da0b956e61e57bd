pub mod json_transcript_source;
pub mod whisper_cli_transcriber;
