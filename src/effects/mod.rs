//! Node behaviors: multi-pass effects, one-frame feedback and the pressure solver.

pub(crate) mod feedback;
pub(crate) mod multipass;
pub(crate) mod pressure;
