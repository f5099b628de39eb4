pub mod precheck;
pub mod search;
pub mod status;
