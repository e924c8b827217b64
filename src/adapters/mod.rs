pub mod compound_v2;
pub mod lp;
pub mod registry;
pub mod traits;

pub use compound_v2::{CompoundDeployment, ProtocolExports};
pub use lp::{LpClassifier, LpPosition, LpUnwrapper, UniswapV2Unwrapper};
pub use registry::AdapterRegistry;
pub use traits::*;
