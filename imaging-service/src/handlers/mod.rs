pub mod health;
pub mod images;
pub mod reports;

pub use health::{health_check, metrics_endpoint, readiness_check};
pub use images::{get_image, get_image_file, list_images, upload_image};
pub use reports::{get_report, list_reports};
