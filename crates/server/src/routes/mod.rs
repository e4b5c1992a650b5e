mod autodial;
mod calls;
mod customers;
mod health;
mod settings;
pub mod sse;
mod telephony;

pub use autodial::*;
pub use calls::*;
pub use customers::*;
pub use health::*;
pub use settings::*;
pub use telephony::*;
