pub mod audit;
pub mod common;
pub mod imports;
pub mod inventory;
pub mod merchants;
pub mod orders;
pub mod products;
pub mod users;
pub mod wallet;
