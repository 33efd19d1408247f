pub mod deliveries;
pub mod root;
