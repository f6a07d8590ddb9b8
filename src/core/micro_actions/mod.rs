// Micro-actions dataset checks. The dataset ships with the app, so its shape and
// ids must not drift between releases.

pub mod micro_action_lint;

pub use micro_action_lint::*;
