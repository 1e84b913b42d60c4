//! Terminal front end

mod command;
mod repl;
mod view;

pub use repl::run;
