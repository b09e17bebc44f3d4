//! Payment Domain
//!
//! The payment hand-off side of the engine: the [`Payment`] entity built
//! from a subscription and a billing period, the customer and address
//! details it carries, invoice lines, and the gateway status lifecycle.

mod customer;
mod lines;
mod payment;
mod status;

pub use customer::{Address, Customer};
pub use lines::{PaymentLine, PaymentLines};
pub use payment::Payment;
pub use status::PaymentStatus;
