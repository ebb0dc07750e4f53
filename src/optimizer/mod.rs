pub mod folding;
pub mod passes;
pub mod registers;
