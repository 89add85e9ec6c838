pub mod dispatcher;
pub mod error;
pub mod rabbitmq;
pub mod webhook;
pub mod websocket;

pub use dispatcher::{DispatcherOutputs, EventDispatcher};
pub use error::EventPipelineError;
pub use rabbitmq::{RabbitMqMessage, RabbitMqPublisher};
pub use webhook::{NoopWebhookTransport, WebhookDispatcher, WebhookTransport};
pub use websocket::WebSocketHub;
