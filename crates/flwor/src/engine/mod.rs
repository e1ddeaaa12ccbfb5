pub mod casting;
pub mod collation;
pub mod comparison;
pub mod env;
pub mod evaluator;
pub mod functions;
pub mod numeric;
pub mod pipeline;
pub mod runtime;
pub mod switch;
pub mod types;
