//! Dependent records created alongside generated ones.
//!
//! When records are generated with dependencies, some collections need
//! companion records the simulator expects to exist:
//!
//! - every (user, application) edge gets a
//!   `CircularDurationAndIntervalAccessPattern`;
//! - every new `NetworkSwitch` gets a `NetworkLink` to an existing switch.
//!
//! Companion records take sequential ids after the largest id already in
//! their collection, and are wired in both directions. Running out of ids is
//! a validation error; the document may then be partially updated and should
//! be discarded.

use indexmap::IndexMap;
use log::info;
use rand::{Rng, RngCore};

use crate::app_response::AppResponse;
use crate::record_factory::{access_pattern_record, network_link_record, ACCESS_PATTERN, NETWORK_LINK};
use crate::reference_resolver::{find_by_id_mut, id_at, next_id};
use crate::relationship_schema::RelationshipSchema;
use crate::relationship_sync::{append_back_reference, synchronize_in_place};
use crate::scenario_model::{FieldValue, Record, RecordId, Reference, ReferenceEntry, ScenarioDocument};

/// Which side of the user/application edge the new records are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeOwner {
    User,
    Application,
}

impl EdgeOwner {
    fn collection(self) -> &'static str {
        match self {
            EdgeOwner::User => "User",
            EdgeOwner::Application => "Application",
        }
    }

    fn edge_field(self) -> &'static str {
        match self {
            EdgeOwner::User => "applications",
            EdgeOwner::Application => "users",
        }
    }
}

/// Creates one access pattern per application listed by each new user.
///
/// Each user's `access_patterns` is replaced by its new patterns, in the
/// order of its `applications`. Returns the number of patterns created.
pub fn link_user_access_patterns(
    new_users: &[Record],
    document: &mut ScenarioDocument,
    schema: &RelationshipSchema,
) -> Result<usize, AppResponse> {
    link_access_patterns(EdgeOwner::User, new_users, document, schema)
}

/// Creates one access pattern per user listed by each new application.
pub fn link_application_access_patterns(
    new_applications: &[Record],
    document: &mut ScenarioDocument,
    schema: &RelationshipSchema,
) -> Result<usize, AppResponse> {
    link_access_patterns(EdgeOwner::Application, new_applications, document, schema)
}

fn link_access_patterns(
    owner: EdgeOwner,
    new_records: &[Record],
    document: &mut ScenarioDocument,
    schema: &RelationshipSchema,
) -> Result<usize, AppResponse> {
    let first_pattern_id = next_id(document, ACCESS_PATTERN)?;
    let mut created: Vec<Record> = Vec::new();

    for record in new_records {
        let Some(owner_id) = record.resolved_id() else {
            continue;
        };
        let peer_ids = record
            .relationship(owner.edge_field())
            .map(FieldValue::reference_ids)
            .unwrap_or_default();

        let mut own_patterns = Vec::with_capacity(peer_ids.len());
        for peer_id in peer_ids {
            let (user_id, app_id) = match owner {
                EdgeOwner::User => (owner_id, peer_id),
                EdgeOwner::Application => (peer_id, owner_id),
            };
            let pattern_id = id_at(ACCESS_PATTERN, first_pattern_id, created.len())?;
            let Some(pattern) = access_pattern_record(pattern_id, user_id, app_id) else {
                continue;
            };
            own_patterns.push(ReferenceEntry::Reference(Reference::new(ACCESS_PATTERN, pattern_id)));
            created.push(pattern);
        }

        if let Some(stored) = find_by_id_mut(document, owner.collection(), owner_id) {
            stored.set_relationship("access_patterns", FieldValue::ReferenceArray(own_patterns));
        }
    }

    if created.is_empty() {
        return Ok(0);
    }

    let count = created.len();
    document.extend(ACCESS_PATTERN, created.iter().cloned());
    let new_patterns = IndexMap::from([(ACCESS_PATTERN.to_string(), created)]);
    synchronize_in_place(&new_patterns, document, schema);

    info!("Created {count} access patterns for new {} records", owner.collection());
    Ok(count)
}

/// Links every new switch to the first pre-existing switch, if there is one.
///
/// New switches are expected at the end of the `NetworkSwitch` collection.
/// Each link is appended to `NetworkLink` and listed in the `links` of both
/// switches. Returns the number of links created.
pub fn link_new_switches(
    new_switches: &[Record],
    document: &mut ScenarioDocument,
    rng: &mut dyn RngCore,
) -> Result<usize, AppResponse> {
    let switches = document.collection("NetworkSwitch");
    let pre_existing: Vec<RecordId> = switches[..switches.len().saturating_sub(new_switches.len())]
        .iter()
        .filter_map(Record::resolved_id)
        .collect();
    if pre_existing.is_empty() {
        return Ok(0);
    }

    let first_link_id = next_id(document, NETWORK_LINK)?;
    let mut created: Vec<(RecordId, [RecordId; 2])> = Vec::new();
    let mut links: Vec<Record> = Vec::new();

    for new_switch in new_switches {
        let Some(switch_id) = new_switch.resolved_id() else {
            continue;
        };
        let Some(anchor_id) = pre_existing.iter().copied().find(|id| *id != switch_id) else {
            continue;
        };

        let link_id = id_at(NETWORK_LINK, first_link_id, links.len())?;

        let long_distance = rng.gen_bool(0.2);
        let nodes = [switch_id, anchor_id];
        let Some(link) = network_link_record(link_id, nodes, long_distance) else {
            continue;
        };
        links.push(link);
        created.push((link_id, nodes));
    }

    if links.is_empty() {
        return Ok(0);
    }

    document.extend(NETWORK_LINK, links);
    for (link_id, nodes) in &created {
        for node_id in nodes {
            if let Some(switch) = find_by_id_mut(document, "NetworkSwitch", *node_id) {
                append_back_reference(switch, "links", Reference::new(NETWORK_LINK, *link_id));
            }
        }
    }

    info!("Created {} network links for new switches", created.len());
    Ok(created.len())
}
