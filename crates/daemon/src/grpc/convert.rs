// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record ⇄ wire conversions.

use chall_core::{Challenge, Instance};
use chall_wire::{to_timestamp, v1};

pub(crate) fn challenge_to_wire(challenge: &Challenge) -> v1::Challenge {
    v1::Challenge {
        id: challenge.id.clone(),
        scenario: challenge.scenario.clone(),
        hash: challenge.hash.clone(),
        until: challenge.until.map(to_timestamp),
        timeout: challenge.timeout,
        min: challenge.min,
        max: challenge.max,
        additional: challenge.additional.clone().into_iter().collect(),
        image_pull_secrets: challenge.image_pull_secrets.clone(),
        created_at: Some(to_timestamp(challenge.created_at)),
        updated_at: Some(to_timestamp(challenge.updated_at)),
    }
}

pub(crate) fn instance_to_wire(instance: &Instance) -> v1::Instance {
    v1::Instance {
        identity: instance.identity.clone(),
        challenge_id: instance.challenge_id.clone(),
        source_id: instance.source_id.clone(),
        since: Some(to_timestamp(instance.since)),
        last_renew: Some(to_timestamp(instance.last_renew)),
        until: instance.until.map(to_timestamp),
        connection_info: instance.connection_info.clone(),
        flags: instance.flags.clone(),
        additional: instance.additional.clone().into_iter().collect(),
    }
}
