pub mod announcement;
pub mod child;
pub mod contract;
pub mod coupon;
pub mod daily_record;
pub mod employee_profile;
pub mod feed_post;
pub mod fixed_expense;
pub mod invoice;
pub mod message;
pub mod nutrition;
pub mod subscription;
pub mod validation;
