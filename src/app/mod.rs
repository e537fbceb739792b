//! Application runtime composition modules.

pub(crate) mod context;
pub(crate) mod runtime;
pub(crate) mod terminal;
