//! Domain models for the session and catalog services.
//!
//! These types represent validated domain objects. Row types double as
//! domain types where the columns map one-to-one.

pub mod product;
pub mod session;
pub mod user;

pub use product::{NewProduct, Product, ProductPatch};
pub use session::AuthSession;
pub use user::{NewUser, User, UserRecord};
