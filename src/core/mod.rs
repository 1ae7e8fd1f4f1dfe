pub mod error;
pub mod message;
pub mod render;
pub mod server;
pub mod subscription;

pub use error::ToolError;
pub use message::InboundMessage;
pub use render::RenderMode;
pub use server::Server;
pub use subscription::Subscription;
