pub mod aggregate;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod schema;
pub mod shopping_data;
pub mod types;

pub use aggregate::ToolCallAggregator;
pub use dispatcher::ToolDispatcher;
pub use error::ToolError;
pub use handler::{ToolHandler, ToolRegistry};
pub use schema::{tool_schemas, ToolSchema};
pub use shopping_data::project;
pub use types::{ToolCall, ToolContext, ToolInvocation, ToolName, ToolOutcome};
