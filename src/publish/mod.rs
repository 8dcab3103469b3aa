//! Publish clients: post one piece of text to a connected resource.

mod facebook;
mod x;

pub use facebook::GraphPublisher;
pub use x::XPublisher;

use crate::credentials::ResourceCredential;
use crate::error::PublishError;
use async_trait::async_trait;

#[async_trait]
pub trait Publisher: Send + Sync {
    /// Post `text` using `credential` and return the provider-assigned id.
    async fn publish(&self, credential: &ResourceCredential, text: &str) -> Result<String, PublishError>;
}
