pub mod orders;
pub mod reservations;
pub mod system;
