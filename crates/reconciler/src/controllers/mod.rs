//! The three loops of the airplane control chain.
//!
//! `Airplane` creates and references its `Pedals` and `Rudder`; the pedal
//! linkage turns a press into a linkage position and drives the rudder's
//! target; the rudder moves to its target.

mod airplane;
mod pedal_linkage;
mod rudder;

pub use airplane::AirplaneReconciler;
pub use pedal_linkage::PedalLinkageReconciler;
pub use rudder::RudderReconciler;
