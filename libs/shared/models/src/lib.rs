pub mod accounts;
pub mod appointment;
pub mod auth;
pub mod error;
pub mod interval;
pub mod notification;
