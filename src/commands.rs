pub mod courses;
pub mod login;
pub mod pick;
pub mod profile;
