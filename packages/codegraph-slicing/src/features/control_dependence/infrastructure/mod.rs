pub mod control_dependence;
pub mod post_dominator;
