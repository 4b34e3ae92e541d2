mod paths;

pub use paths::{chat_transcript_path, explicit_output_path, generate_output_path};
