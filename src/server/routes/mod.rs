// HTTP route handlers, one module per spec §6 endpoint group.
pub mod actions;
pub mod break_resume;
pub mod enqueue;
pub mod health;
pub mod manual_customers;
pub mod projections;
pub mod restructure;
