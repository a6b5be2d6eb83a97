pub mod domain;
pub mod fleet_seeder;

pub use domain::*;
pub use fleet_seeder::*;
