//! Domain models for CropWatch

mod account;
mod disease;
mod forecast;
mod risk;
mod upload;

pub use account::*;
pub use disease::*;
pub use forecast::*;
pub use risk::*;
pub use upload::*;
