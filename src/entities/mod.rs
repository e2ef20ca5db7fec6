pub mod cart_item;
pub mod category;
pub mod offer;
pub mod offer_product;
pub mod order;
pub mod order_item;
pub mod product;
pub mod review;
pub mod store;
pub mod user;

// Re-export entities under their domain names
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use category::{Entity as Category, Model as CategoryModel};
pub use offer::{Entity as Offer, Model as OfferModel};
pub use offer_product::{Entity as OfferProduct, Model as OfferProductModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use review::{Entity as Review, Model as ReviewModel};
pub use store::{Entity as Store, Model as StoreModel};
pub use user::{Entity as User, Model as UserModel, UserRole};
