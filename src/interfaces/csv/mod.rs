pub mod cart_reader;
pub mod plan_writer;
