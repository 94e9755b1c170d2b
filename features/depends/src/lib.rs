//! Async dependency injection for plain functions.
//!
//! An [Operation] declares its parameters in a [Signature]. Parameters whose default is a
//! [Depends] marker are filled by the marker's [Factory] on every call:
//!
//! - every factory handle runs at most once per call, all dependents share its value
//! - independent providers run concurrently
//! - values passed by the caller are visible to every provider declaring a parameter of the same name
//! - two phase providers ([ResourceFactory]) are released after the call, also when it failed
//!
//! ```rust
//! use depends::{CallArgs, Depends, DynError, Factory, Operation, Signature};
//!
//! let base = Factory::from_fn("base", Signature::new().param_or("offset", 0_i32), |args| async move {
//!     Ok::<_, DynError>(*args.get::<i32>("offset")? + 1)
//! });
//! let double = Factory::from_fn(
//!     "double",
//!     Signature::new().depends("base", Depends::on(&base)),
//!     |args| async move { Ok::<_, DynError>(*args.get::<i32>("base")? * 2) },
//! );
//!
//! let operation = Operation::new(
//!     "sum",
//!     Signature::new()
//!         .param("offset")
//!         .depends("base", Depends::on(&base))
//!         .depends("double", Depends::on(&double)),
//!     |args| async move {
//!         Ok::<_, DynError>(*args.get::<i32>("base")? + *args.get::<i32>("double")?)
//!     },
//! );
//!
//! // `offset` is injected into `base` through the call context
//! let result = futures::executor::block_on(operation.call(CallArgs::new().arg(10_i32)));
//! assert_eq!(result.unwrap(), 11 + 22);
//! ```

mod arguments;
mod cache;
mod config;
mod context;
mod dependency_graph;
mod errors;
mod factories;
mod node;
mod operation;
mod signature;
mod types;

pub use arguments::{Arguments, CallArgs};
pub use cache::{Flight, SingleFlight};
pub use config::{EngineConfig, TeardownPolicy};
pub use context::InjectionContext;
pub use dependency_graph::DependencyGraph;
pub use errors::{ArgumentError, BindError, InjectError, ResolveError, TeardownError};
pub use factories::{
    release_fn, Factory, FactoryId, FnFactory, FnResource, InstanceFactory, Release, ReleaseFn,
    ResourceFactory,
};
pub use node::{DependencyNode, NodeId, NodeState};
pub use operation::Operation;
pub use signature::{Depends, ParamDefault, Parameter, Signature};
pub use types::{DynError, Injectable, TypeInfo, Value};
