//! In-process implementation of the resource-module contract.
//!
//! A static registry of inventory resources, each validating its input and
//! writing to an explicitly injected store. The registry implements
//! [`Transport`](crate::harness::Transport), which lets the harness grade it
//! without a running web server.

pub mod record;
pub mod registry;
pub mod router;
pub mod store;

pub use record::{is_valid_id, FieldError, Item, ItemPatch, NewItem, Validation};
pub use registry::{InventoryResource, ModuleInfo, Registry, RegistryBuilder, ResourceHandler};
pub use store::{InMemoryStore, ItemStore};
