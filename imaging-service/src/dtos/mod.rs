pub mod images;
pub mod reports;

pub use images::{ImageListParams, ImageListResponse, ImageResponse, UploadImageResponse};
pub use reports::{ReportListParams, ReportListResponse, ReportResponse};

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
