pub mod method;
pub mod multipart;
pub mod orderedheaders;
pub mod requestbody;
pub mod response;
pub mod responsebody;

// Re-exports for convenience
pub use method::HttpMethod;
pub use multipart::{Form, Part};
pub use orderedheaders::{canonicalize, HeaderInput, HeaderList};
pub use requestbody::{Blob, FormParams, MaterializedBody, RequestBody};
pub use response::HttpResponse;
pub use responsebody::{DownloadProgress, ProgressTracker, ResponseBody};
