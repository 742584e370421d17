// Channels, retry policy and serde helpers shared by the stages
pub mod pipeline_utils;

// Research pipeline module
pub mod research;
