pub mod workflow;

pub use workflow::{new_shipment_id, open_shipment, open_shipment_as, seal_shipment};
