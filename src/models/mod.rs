pub mod balances;
pub mod transform;

pub use balances::*;
pub use transform::AddressTransform;
