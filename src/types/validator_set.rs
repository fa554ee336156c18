/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that store information about the validator set whose messages the backlog accepts.

use std::collections::HashMap;

use borsh::{BorshDeserialize, BorshSerialize};

pub use ed25519_dalek::VerifyingKey;

/// Weight of a specific validator's votes in consensus decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshDeserialize, BorshSerialize)]
pub struct Power(u64);

impl Power {
    /// Create a new `Power` wrapping `int`.
    pub fn new(int: u64) -> Self {
        Self(int)
    }
}

/// A member of a [`ValidatorSet`], as returned by [`ValidatorSet::get`].
///
/// Events dispatched out of the backlog carry the `Validator` the message came from, so that the
/// consensus engine does not have to look the sender up a second time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Validator {
    pub address: VerifyingKey,
    pub power: Power,
}

/// Stores the identities of validators and their voting powers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ValidatorSet {
    powers: HashMap<VerifyingKey, Power>,
}

impl ValidatorSet {
    /// Create an empty validator set.
    pub fn new() -> ValidatorSet {
        Self::default()
    }

    /// Put a `validator` with the specified `power` into the validator set.
    ///
    /// If `validator` already exists in the validator set, this function updates its power instead.
    pub fn put(&mut self, validator: &VerifyingKey, power: Power) {
        self.powers.insert(*validator, power);
    }

    /// Remove `validator` from the validator set, if it actually is in the validator set.
    ///
    /// Returns the removed validator with the power it had before the removal.
    pub fn remove(&mut self, validator: &VerifyingKey) -> Option<Validator> {
        self.powers
            .remove_entry(validator)
            .map(|(address, power)| Validator { address, power })
    }

    /// Look up `validator` in the validator set.
    pub fn get(&self, validator: &VerifyingKey) -> Option<Validator> {
        self.powers.get(validator).map(|power| Validator {
            address: *validator,
            power: *power,
        })
    }
}

impl FromIterator<(VerifyingKey, Power)> for ValidatorSet {
    fn from_iter<T: IntoIterator<Item = (VerifyingKey, Power)>>(iter: T) -> Self {
        let mut validator_set = ValidatorSet::new();
        for (validator, power) in iter {
            validator_set.put(&validator, power);
        }
        validator_set
    }
}
