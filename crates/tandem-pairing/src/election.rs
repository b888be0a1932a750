//! Deterministic agreements both devices reach without talking.
//!
//! Each function is pure and symmetric: the two devices evaluate it with
//! their arguments swapped and still agree on the outcome.

use tandem_common::{ParticipantId, RoomKey};

use crate::pairing::Role;

/// Elect the host between two distinct participants.
///
/// The participant whose id sorts first is the host.
pub fn elect_host(local: &ParticipantId, remote: &ParticipantId) -> Role {
    if local < remote {
        Role::Host
    } else {
        Role::Partner
    }
}

/// Decide whether to abandon the local room for one announced by a peer.
///
/// A device with no room always joins. Otherwise it joins only when the
/// announced key sorts strictly before its own, so exactly one of two
/// devices holding different rooms moves.
pub fn should_join_room(local: Option<&RoomKey>, announced: &RoomKey) -> bool {
    match local {
        None => true,
        Some(local) => local > announced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_one_host_and_both_agree() {
        let pairs = [("alice", "bob"), ("b", "a"), ("u-1", "u-10"), ("Z", "a")];
        for (a, b) in pairs {
            let a = ParticipantId::from(a);
            let b = ParticipantId::from(b);
            let role_a = elect_host(&a, &b);
            let role_b = elect_host(&b, &a);
            assert_ne!(role_a, role_b, "{a} vs {b}");
            assert!(role_a == Role::Host || role_b == Role::Host);
        }
    }

    #[test]
    fn smaller_id_hosts() {
        let a = ParticipantId::from("alice");
        let b = ParticipantId::from("bob");
        assert_eq!(elect_host(&a, &b), Role::Host);
        assert_eq!(elect_host(&b, &a), Role::Partner);
    }

    #[test]
    fn no_local_room_always_joins() {
        assert!(should_join_room(None, &RoomKey::from("r9")));
    }

    #[test]
    fn earlier_announced_room_wins() {
        let r1 = RoomKey::from("r1");
        let r2 = RoomKey::from("r2");
        assert!(should_join_room(Some(&r2), &r1));
        assert!(!should_join_room(Some(&r1), &r2));
    }

    #[test]
    fn same_room_is_not_rejoined() {
        let r1 = RoomKey::from("r1");
        assert!(!should_join_room(Some(&r1), &r1));
    }
}
