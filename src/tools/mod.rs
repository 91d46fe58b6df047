//! 操作层：注册表、执行分发器、后端客户端与全部餐厅操作

pub mod args;
pub mod backend;
pub mod catalogue;
pub mod executor;
pub mod extras;
pub mod groups;
pub mod hours;
pub mod menu;
pub mod orders;
pub mod registry;
pub mod reports;
pub mod schema;

pub use backend::{BackendClient, BackendResponse};
pub use catalogue::{build_registry, register_all};
pub use executor::ExecutionDispatcher;
pub use registry::{ExecutionScope, Operation, OperationRegistry, OperationSpec, ParamSpec, ParamType};
pub use schema::oracle_output_schema_json;

/// 餐厅（租户）ID 参数名；会话已知的值总是覆盖 Oracle 给出的值
pub const TENANT_ARGUMENT: &str = "restaurant_id";

pub(crate) fn restaurant_param() -> ParamSpec {
    ParamSpec::required(TENANT_ARGUMENT, ParamType::Integer, "Restaurant ID")
}
