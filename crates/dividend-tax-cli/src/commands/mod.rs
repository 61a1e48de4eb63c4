pub mod ofx;
pub mod report;
pub mod taxes;
