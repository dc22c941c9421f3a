//! Core module containing the order model and the collaborator seams

pub mod catalog;
pub mod error;
pub mod identity;
pub mod mapper;
pub mod order;
pub mod query;
pub mod store;

pub use catalog::{Advisor, AdvisorForm, Client, ClientForm, Product, Profile, Role};
pub use error::{PedidosError, Result};
pub use identity::{IdentityProvider, Principal, PrincipalEvent};
pub use mapper::{Mapper, SearchableSelect, SelectOption};
pub use order::{
    AdvisorRef, Channel, Currency, LineItem, Note, Order, OrderStatus, OrderType, StatusChange,
};
pub use query::{Filter, Sort};
pub use store::{DataStore, Row, Tables, tables};
