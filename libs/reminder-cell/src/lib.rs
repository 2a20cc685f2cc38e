pub mod services;

pub use services::scheduler::ReminderService;
