pub mod code;
pub mod executor;
pub mod general;
pub mod registry;
pub mod schema;
pub mod search;

pub use code::{CodeTool, CODE_GENERATION_FAILED, NO_CODE_GENERATED};
pub use executor::{ToolExecutor, ToolInvocation};
pub use general::GeneralTool;
pub use registry::{FailurePolicy, Tool, ToolKind, ToolRegistry};
pub use schema::tool_call_schema_json;
pub use search::{SearchHit, SearchTool};
