pub mod best_fit;
pub mod proportional_share;
