pub mod executor;
pub mod product_lookup;
pub mod registry;
pub mod schema;

pub use executor::ToolExecutor;
pub use product_lookup::{ProductLookupArgs, ProductLookupTool, PRODUCT_LOOKUP};
pub use registry::{Tool, ToolDeclaration, ToolSet};
pub use schema::{ToolArgs, ValidatedArgs};
