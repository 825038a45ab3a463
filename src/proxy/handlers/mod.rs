// Handlers module - gateway endpoint handlers
pub mod health;
pub mod proxy;
