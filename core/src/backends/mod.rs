pub mod factory;
pub mod http;
pub mod oneshot;
pub mod protocol;
pub mod serve;
pub mod stub;

pub use factory::create_backend;
pub use http::HttpBackend;
pub use oneshot::OneShotBackend;
pub use serve::ServeBackend;
pub use stub::StubBackend;
