//! Domain layer: value objects and the payment model.

pub mod foundation;
pub mod payment;
