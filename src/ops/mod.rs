pub mod agenda;
pub mod autosave;
pub mod drag;
pub mod search;
pub mod task_ops;
pub mod tree;

#[cfg(test)]
pub(crate) mod test_helpers;
