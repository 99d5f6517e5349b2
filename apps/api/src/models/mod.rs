pub mod ai;
pub mod bom;
pub mod proposal;
pub mod rfp;
pub mod scope;
pub mod user;
pub mod vendor;
