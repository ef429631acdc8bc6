pub mod admin;
pub mod buyers;
pub mod categories;
pub mod products;
pub mod reviews;
pub mod sellers;
pub mod vouchers;
