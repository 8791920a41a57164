pub mod completions;
pub mod report;
pub mod scan;
