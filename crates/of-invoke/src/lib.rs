//! OrgFleet Paged Invoker
//!
//! Executes "operation X on service Y" calls described by name:
//! - Capability table: each adapter declares its operations and how they paginate
//! - ServiceRegistry: selects an adapter factory by service name
//! - PagedInvoker: follows pagination tokens and merges the pages
//! - AWS adapters for Organizations and STS (feature `aws`)

mod capability;
mod error;
mod invoker;
pub mod params;
mod registry;

#[cfg(feature = "aws")]
pub mod aws;

pub use capability::{
    ClientParams, OperationSpec, Page, PaginationSpec, ServiceClient, ServiceFactory,
};
pub use error::{InvokeError, ServiceError};
pub use invoker::{
    InvokeOutput, PagedCallDescriptor, PagedInvoker, PaginationMetadata, PAGINATION_METADATA_KEY,
};
pub use registry::ServiceRegistry;

pub type Result<T> = std::result::Result<T, InvokeError>;
