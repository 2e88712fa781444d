/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// MIME type assumed for media when the remote side does not say.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// MIME type assumed for fetched videos without a `Content-Type` header.
pub const DEFAULT_VIDEO_MIME: &str = "video/mp4";
