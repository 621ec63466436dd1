//! Content catalog loading and lookup.
//!
//! The catalog is described by a single JSON document:
//!
//! ```text
//! topics.json
//! └── Topic (root)
//!     ├── Topic "math"
//!     │   ├── Topic "arithmetic"
//!     │   │   ├── Video "add-sub"        -> /math/arithmetic/v/add-sub/
//!     │   │   └── Exercise "addition_1"  -> /math/arithmetic/e/addition_1/
//!     │   └── ...
//!     └── ...
//! ```

pub mod catalog;
pub mod descriptor;
pub mod index;

pub use catalog::{Catalog, CatalogError};
pub use descriptor::NodeEntry;
pub use index::{NodeAddress, NodeIndex};
