pub mod actor;
pub mod freelancer;
pub mod order;
pub mod product;
pub mod proposal;
pub mod quotation;
pub mod settings;
