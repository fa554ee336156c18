//! Types that are used across multiple components of the backlog.

pub mod validator_set;

pub mod view;

pub use validator_set::{Power, Validator, ValidatorSet};
pub use view::{ConsensusState, ReceivedView, View};
