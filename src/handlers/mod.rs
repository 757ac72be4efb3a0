// handlers/mod.rs - HTTP endpoint handlers
//
// system: service descriptor, health, HTML pages
// auth:   sign-up / sign-in / sign-out / whoami
// users:  account administration
// data:   generic record CRUD dispatched through the entity registry

pub mod auth;
pub mod data;
pub mod system;
pub mod users;
