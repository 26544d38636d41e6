//! Capability decorations layered onto a bicycle at runtime.
//!
//! Each decoration wraps a `Box<dyn BicycleOps>` and forwards every
//! operation it does not specialize, including the other capabilities'
//! operations, so stacking order never hides an inner capability and the
//! state-machine invariants survive any chain. Decorations observe or gate
//! lock/unlock/mark_broken, never bypass them.

mod alarm;
mod gps;
mod smart_lock;

pub use alarm::AntiTheftAlarm;
pub use gps::GpsTracking;
pub use smart_lock::SmartLock;
