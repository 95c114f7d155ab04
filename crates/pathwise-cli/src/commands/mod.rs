pub mod complete;
pub mod init;
pub mod lessons;
pub mod paths;
pub mod progress;
pub mod report;
pub mod score_quiz;
pub mod show;
pub mod validate;
