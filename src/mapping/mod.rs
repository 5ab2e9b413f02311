pub mod generator;
pub mod manifest;
pub mod report;
