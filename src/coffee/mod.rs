//! Coffee core: the d20 outcome table and the /coffee policy engine.

pub mod outcome;
pub mod policy;

pub use outcome::{OutcomeError, OutcomeTable};
pub use policy::{BlockReason, ChatKind, CoffeePolicy, D20, Decision, Die, PolicyError, Roll};
