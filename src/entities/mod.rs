pub mod address;
pub mod admin_user;
pub mod cart_item;
pub mod category;
pub mod customer;
pub mod manufacturer;
pub mod order;
pub mod order_item;
pub mod order_status_history;
pub mod product;
pub mod stock_movement;
pub mod store_settings;

// Re-export entities
pub use address::{Entity as Address, Model as AddressModel};
pub use admin_user::{Entity as AdminUser, Model as AdminUserModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use customer::{CustomerStatus, Entity as Customer, Model as CustomerModel};
pub use manufacturer::{Entity as Manufacturer, Model as ManufacturerModel};
pub use order::{
    DeliveryMethod, Entity as Order, Model as OrderModel, OrderStatus, PaymentMethod, PaymentStatus,
};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use order_status_history::{Entity as OrderStatusHistory, Model as OrderStatusHistoryModel};
pub use product::{Entity as Product, Model as ProductModel, ProductSection};
pub use stock_movement::{Entity as StockMovement, Model as StockMovementModel, StockMovementReason};
pub use store_settings::{Entity as StoreSettings, Model as StoreSettingsModel, SETTINGS_ROW_ID};
