pub mod billing;
pub mod contract_text;
pub mod contracts;
pub mod coupons;
pub mod crm;
pub mod esign;
pub mod events;
pub mod forecast;
pub mod installments;
pub mod nutrition;
pub mod payment_gateway;
pub mod storage;
