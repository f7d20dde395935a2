use std::collections::HashSet;

use alloy_primitives::Address;
use shadowvote_ballot::{Nullifier, OptionIndex, VoterIdentity, WitnessBuilder};

fn identity(seed: u32) -> VoterIdentity {
    let mut bytes = [0u8; 20];
    bytes[16..].copy_from_slice(&seed.to_be_bytes());
    VoterIdentity::new(Address::from(bytes))
}

#[test]
fn distinct_identities_never_collide() {
    let mut seen = HashSet::new();
    for seed in 0..2_000 {
        let nullifier = Nullifier::derive(&identity(seed));
        assert!(seen.insert(nullifier), "collision at seed {seed}");
    }
}

#[test]
fn nullifier_is_stable_across_calls() {
    let id = identity(42);
    let first = Nullifier::derive(&id);
    for _ in 0..10 {
        assert_eq!(Nullifier::derive(&id), first);
    }
}

#[test]
fn nullifier_ignores_the_chosen_option() {
    let builder = WitnessBuilder::new(3).unwrap();
    let id = identity(7);

    let nullifiers: HashSet<_> = (0..3)
        .map(|i| *builder.build(&id, OptionIndex(i)).unwrap().nullifier())
        .collect();

    assert_eq!(nullifiers.len(), 1);
}

#[test]
fn out_of_range_options_fail() {
    let builder = WitnessBuilder::new(3).unwrap();
    for index in [3usize, 4, 255, usize::MAX] {
        assert!(builder.build(&identity(1), OptionIndex(index)).is_err());
    }
}
