pub mod courses;
pub mod extract;
pub mod session;
pub mod strands;
