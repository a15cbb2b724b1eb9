pub mod shipping;

pub use shipping::ShippingClient;
