pub mod todos;
pub mod users;
