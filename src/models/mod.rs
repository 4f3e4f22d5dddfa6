pub mod application;
pub mod candidate;
pub mod job;
pub mod matching;
pub mod resume;
