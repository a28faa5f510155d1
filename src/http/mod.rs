pub mod inject;
pub mod mime;
pub mod raw;
pub mod request;
pub mod response;
pub mod server;

pub use inject::{Inject, InjectResponse};
pub use raw::RawResponse;
pub use request::Request;
pub use response::{Response, ResponseBody};
pub use server::Listener;
