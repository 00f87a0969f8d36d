pub mod image;
pub mod report;

pub use image::Image;
pub use report::{AnalysisReport, Report};
