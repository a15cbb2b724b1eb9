pub mod audit;
pub mod catalog;
pub mod inventory;
pub mod merchants;
pub mod orders;
pub mod users;
pub mod wallet;

pub use audit::AuditService;
pub use catalog::CatalogService;
pub use inventory::InventoryService;
pub use merchants::MerchantService;
pub use orders::OrderService;
pub use users::UserService;
pub use wallet::WalletService;
