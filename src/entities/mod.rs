pub mod audit_event;
pub mod inventory_record;
pub mod merchant;
pub mod order;
pub mod order_item;
pub mod product;
pub mod user;
pub mod wallet;
pub mod wallet_transaction;
