pub mod arguments;
pub mod context;
pub mod detector_invoker;
pub mod function_table;
pub mod request_executor;
