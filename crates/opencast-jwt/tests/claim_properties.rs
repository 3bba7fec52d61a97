//! Property-based tests for the Opencast claim model
//!
//! Uses proptest to verify:
//! - wire map round-trips back into an equal claim set
//! - composite keys partition back into the right ACL buckets
//! - wire maps only ever contain Opencast claims, in a stable order
//! - tokens issued by the handler extract to the same claim set

mod common;

use chrono::{DateTime, Utc};
use common::handler_at_epoch;
use opencast_jwt::types::domain;
use opencast_jwt::{ClaimSet, JwtAlgorithm, ResourceKind};
use proptest::prelude::*;

type Acls = Vec<(String, Vec<String>)>;

fn acl_strategy() -> impl Strategy<Value = Acls> {
    prop::collection::btree_map(
        "[a-z0-9:-]{1,12}",
        prop::collection::vec("(read|write|annotate)", 0..3),
        0..4,
    )
    .prop_map(|map| map.into_iter().collect())
}

/// Strategy for claim sets that satisfy both serialization invariants
fn claim_set_strategy() -> impl Strategy<Value = ClaimSet> {
    (
        1_600_000_000i64..2_000_000_000,
        prop::option::of(1_500_000_000i64..1_600_000_000),
        prop::option::of(("[a-z]{1,10}", prop::option::of("[A-Za-z ]{1,16}"))),
        prop::collection::vec("ROLE_[A-Z_]{1,10}", 0..4),
        acl_strategy(),
        acl_strategy(),
        acl_strategy(),
    )
        .prop_filter(
            "roles or acls required",
            |(_, _, _, roles, events, series, playlists)| {
                !(roles.is_empty() && events.is_empty() && series.is_empty() && playlists.is_empty())
            },
        )
        .prop_map(|(exp, nbf, identity, roles, events, series, playlists)| {
            let mut claims = ClaimSet::new();
            claims
                .set_expiry(at(exp))
                .set_roles(roles)
                .set_event_acls(events)
                .set_series_acls(series)
                .set_playlist_acls(playlists);
            if let Some(nbf) = nbf {
                claims.set_not_before(at(nbf));
            }
            if let Some((subject, name)) = identity {
                claims.set_identity(subject, name.as_deref(), None);
            }
            claims
        })
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("valid timestamp")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: from_parsed_claims(to_wire_map(c)) == c
    #[test]
    fn prop_wire_map_round_trip(claims in claim_set_strategy()) {
        let wire = claims.to_wire_map().unwrap();
        let parsed = ClaimSet::from_parsed_claims(&wire).unwrap();
        prop_assert_eq!(parsed, claims);
    }

    /// Property: every oc key carries its bucket's prefix
    #[test]
    fn prop_oc_keys_match_buckets(claims in claim_set_strategy()) {
        let oc = claims.acl_claims();
        let bucket_total: usize = ResourceKind::ALL
            .into_iter()
            .map(|kind| claims.acls(kind).len())
            .sum();
        prop_assert_eq!(oc.len(), bucket_total);

        for kind in ResourceKind::ALL {
            for entry in claims.acls(kind) {
                prop_assert!(oc.contains_key(&kind.composite_key(&entry.identifier)));
            }
        }
        for key in oc.keys() {
            prop_assert!(ResourceKind::split_composite_key(key).is_some());
        }
    }

    /// Property: wire maps only hold Opencast claims, in canonical order
    #[test]
    fn prop_wire_map_keys_are_ordered(claims in claim_set_strategy()) {
        let wire = claims.to_wire_map().unwrap();
        let positions: Vec<usize> = wire
            .keys()
            .map(|key| {
                [domain::EXP, domain::SUB, domain::NAME, domain::EMAIL, domain::ROLES, domain::OC, domain::NBF]
                    .iter()
                    .position(|claim| *claim == key.as_str())
                    .expect("only Opencast claims")
            })
            .collect();

        prop_assert_eq!(positions.first().copied(), Some(0));
        prop_assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Property: issue then extract yields the issued claim set
    #[test]
    fn prop_issue_extract_round_trip(claims in claim_set_strategy()) {
        let (handler, _clock) = handler_at_epoch(JwtAlgorithm::ES256, 60);
        let token = handler.issue_token(&claims).unwrap();
        let extracted = handler.extract_claims(&token).unwrap();
        prop_assert_eq!(extracted, claims);
    }
}
