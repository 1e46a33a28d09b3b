pub mod captain;
pub mod order;
pub mod ride;
